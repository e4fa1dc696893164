use super::Command;
use crate::db::subscribers;
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/remove_ignore_keyword";

#[derive(TypedBuilder)]
pub struct RemoveIgnoreKeyword {
    message: Message,
    args: String,
}

impl RemoveIgnoreKeyword {
    pub fn command() -> &'static str {
        COMMAND
    }
}

impl Command for RemoveIgnoreKeyword {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        let keyword = self.args.trim();

        if keyword.is_empty() {
            return "Provide a pattern: /remove_ignore_keyword word".to_string();
        }

        match subscribers::remove_ignore_keyword(connection, self.message.chat.id, keyword) {
            Ok(true) => format!(
                "{} was removed from your ignore patterns",
                keyword.to_lowercase()
            ),
            Ok(false) => format!("{} is not in your ignore patterns", keyword.to_lowercase()),
            Err(error) => {
                log::error!(
                    "Failed to remove an ignore pattern for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to update your ignore patterns".to_string()
            }
        }
    }
}
