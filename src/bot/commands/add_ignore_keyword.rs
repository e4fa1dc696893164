use super::Command;
use crate::db::{subscribers, StoreError};
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/add_ignore_keyword";

#[derive(TypedBuilder)]
pub struct AddIgnoreKeyword {
    message: Message,
    args: String,
}

impl AddIgnoreKeyword {
    pub fn command() -> &'static str {
        COMMAND
    }
}

impl Command for AddIgnoreKeyword {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        let keyword = self.args.trim();

        if keyword.is_empty() {
            return "Provide a pattern: /add_ignore_keyword word".to_string();
        }

        match subscribers::add_ignore_keyword(connection, self.message.chat.id, keyword) {
            Ok(true) => format!("{} was added to your ignore patterns", keyword.to_lowercase()),
            Ok(false) => format!(
                "{} is already in your ignore patterns",
                keyword.to_lowercase()
            ),
            Err(error @ StoreError::TooManyKeywords { .. })
            | Err(error @ StoreError::KeywordTooLong { .. }) => error.to_string(),
            Err(error) => {
                log::error!(
                    "Failed to add an ignore pattern for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to update your ignore patterns".to_string()
            }
        }
    }
}
