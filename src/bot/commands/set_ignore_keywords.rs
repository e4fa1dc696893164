use super::Command;
use crate::db::{subscribers, StoreError};
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/ignore_keywords";

#[derive(TypedBuilder)]
pub struct SetIgnoreKeywords {
    message: Message,
    args: String,
}

impl SetIgnoreKeywords {
    pub fn command() -> &'static str {
        COMMAND
    }

    fn show_ignore_keywords(&self, connection: &mut SqliteConnection) -> String {
        match subscribers::get_ignore_keywords(connection, self.message.chat.id) {
            Ok(keywords) if keywords.is_empty() => {
                "You don't have any ignore patterns. Set them with /ignore_keywords word1, word2"
                    .to_string()
            }
            Ok(keywords) => format!("Your ignore patterns: {}", keywords.join(", ")),
            Err(error) => {
                log::error!(
                    "Failed to fetch ignore keywords for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to fetch your ignore patterns".to_string()
            }
        }
    }

    fn clear_ignore_keywords(&self, connection: &mut SqliteConnection) -> String {
        match subscribers::purge_ignore_keywords(connection, self.message.chat.id) {
            Ok(_) => "Your ignore patterns were removed".to_string(),
            Err(error) => {
                log::error!(
                    "Failed to purge ignore keywords for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to remove your ignore patterns".to_string()
            }
        }
    }

    fn update_ignore_keywords(&self, connection: &mut SqliteConnection) -> String {
        let keywords = self.parse_keyword_list(&self.args);

        match subscribers::set_ignore_keywords(connection, self.message.chat.id, keywords) {
            Ok(stored) => format!("Your ignore patterns were updated: {}", stored.join(", ")),
            Err(error @ StoreError::TooManyKeywords { .. })
            | Err(error @ StoreError::KeywordTooLong { .. }) => error.to_string(),
            Err(error) => {
                log::error!(
                    "Failed to update ignore keywords for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to update your ignore patterns".to_string()
            }
        }
    }
}

impl Command for SetIgnoreKeywords {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        let args = self.args.trim();

        if args.is_empty() {
            self.show_ignore_keywords(connection)
        } else if args == "clear" {
            self.clear_ignore_keywords(connection)
        } else {
            self.update_ignore_keywords(connection)
        }
    }
}
