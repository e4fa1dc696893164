use super::Command;
use crate::db::subscribers;
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/language";

#[derive(TypedBuilder)]
pub struct SetLanguage {
    message: Message,
    args: String,
}

impl SetLanguage {
    pub fn command() -> &'static str {
        COMMAND
    }

    fn validate_language(&self) -> Result<&str, &'static str> {
        let language = self.args.trim();

        if language.len() < 2
            || language.len() > 5
            || !language.chars().all(|character| character.is_ascii_lowercase())
        {
            return Err("The language must be a lowercase code like en, es or uk");
        }

        Ok(language)
    }
}

impl Command for SetLanguage {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        let language = match self.validate_language() {
            Ok(language) => language,
            Err(error_message) => return error_message.to_string(),
        };

        match subscribers::set_language(connection, self.message.chat.id, language) {
            Ok(subscriber) => format!("Your language was set to {}", subscriber.language),
            Err(error) => {
                log::error!(
                    "Failed to set the language for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to set your language".to_string()
            }
        }
    }
}
