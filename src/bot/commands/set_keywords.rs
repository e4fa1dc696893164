use super::Command;
use crate::db::{subscribers, StoreError};
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/keywords";

#[derive(TypedBuilder)]
pub struct SetKeywords {
    message: Message,
    args: String,
}

impl SetKeywords {
    pub fn command() -> &'static str {
        COMMAND
    }

    fn show_keywords(&self, connection: &mut SqliteConnection) -> String {
        match subscribers::get_keywords(connection, self.message.chat.id) {
            Ok(keywords) if keywords.is_empty() => {
                "You don't have any keywords yet. Set them with /keywords word1, word2".to_string()
            }
            Ok(keywords) => format!("Your keywords: {}", keywords.join(", ")),
            Err(error) => {
                log::error!(
                    "Failed to fetch keywords for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to fetch your keywords".to_string()
            }
        }
    }

    fn update_keywords(&self, connection: &mut SqliteConnection) -> String {
        let keywords = self.parse_keyword_list(&self.args);

        match subscribers::set_keywords(connection, self.message.chat.id, keywords) {
            Ok(stored) => format!("Your keywords were updated: {}", stored.join(", ")),
            Err(error @ StoreError::TooManyKeywords { .. })
            | Err(error @ StoreError::KeywordTooLong { .. }) => error.to_string(),
            Err(error) => {
                log::error!(
                    "Failed to update keywords for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to update your keywords".to_string()
            }
        }
    }
}

impl Command for SetKeywords {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        if self.args.trim().is_empty() {
            self.show_keywords(connection)
        } else {
            self.update_keywords(connection)
        }
    }
}
