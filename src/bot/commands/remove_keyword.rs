use super::Command;
use crate::db::subscribers;
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/remove_keyword";

#[derive(TypedBuilder)]
pub struct RemoveKeyword {
    message: Message,
    args: String,
}

impl RemoveKeyword {
    pub fn command() -> &'static str {
        COMMAND
    }
}

impl Command for RemoveKeyword {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        let keyword = self.args.trim();

        if keyword.is_empty() {
            return "Provide a keyword: /remove_keyword word".to_string();
        }

        match subscribers::remove_keyword(connection, self.message.chat.id, keyword) {
            Ok(true) => format!("{} was removed from your keywords", keyword.to_lowercase()),
            Ok(false) => format!("{} is not in your keywords", keyword.to_lowercase()),
            Err(error) => {
                log::error!(
                    "Failed to remove a keyword for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to update your keywords".to_string()
            }
        }
    }
}
