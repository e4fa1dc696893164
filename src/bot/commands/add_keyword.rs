use super::Command;
use crate::db::{subscribers, StoreError};
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/add_keyword";

#[derive(TypedBuilder)]
pub struct AddKeyword {
    message: Message,
    args: String,
}

impl AddKeyword {
    pub fn command() -> &'static str {
        COMMAND
    }
}

impl Command for AddKeyword {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        let keyword = self.args.trim();

        if keyword.is_empty() {
            return "Provide a keyword: /add_keyword word".to_string();
        }

        match subscribers::add_keyword(connection, self.message.chat.id, keyword) {
            Ok(true) => format!("{} was added to your keywords", keyword.to_lowercase()),
            Ok(false) => format!("{} is already in your keywords", keyword.to_lowercase()),
            Err(error @ StoreError::TooManyKeywords { .. })
            | Err(error @ StoreError::KeywordTooLong { .. }) => error.to_string(),
            Err(error) => {
                log::error!(
                    "Failed to add a keyword for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to update your keywords".to_string()
            }
        }
    }
}
