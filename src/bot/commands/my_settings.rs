use super::Command;
use crate::db::subscribers;
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static COMMAND: &str = "/my_settings";

#[derive(TypedBuilder)]
pub struct MySettings {
    message: Message,
}

impl MySettings {
    pub fn command() -> &'static str {
        COMMAND
    }

    fn settings(&self, connection: &mut SqliteConnection) -> Result<String, diesel::result::Error> {
        let subscriber = subscribers::ensure_subscriber(connection, self.message.chat.id)?;
        let keywords = subscribers::get_keywords(connection, self.message.chat.id)?;
        let ignore_keywords = subscribers::get_ignore_keywords(connection, self.message.chat.id)?;

        let keywords = if keywords.is_empty() {
            "not set".to_string()
        } else {
            keywords.join(", ")
        };
        let ignore_keywords = if ignore_keywords.is_empty() {
            "not set".to_string()
        } else {
            ignore_keywords.join(", ")
        };

        Ok(format!(
            "Keywords: {}\nIgnore patterns: {}\nLanguage: {}\nForwards today: {}\nForwards in total: {}",
            keywords,
            ignore_keywords,
            subscriber.language,
            subscriber.daily_forwards,
            subscriber.total_forwards
        ))
    }
}

impl Command for MySettings {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        match self.settings(connection) {
            Ok(settings) => settings,
            Err(error) => {
                log::error!(
                    "Failed to fetch settings for {}: {}",
                    self.message.chat.id,
                    error
                );

                "Failed to fetch your settings".to_string()
            }
        }
    }
}
