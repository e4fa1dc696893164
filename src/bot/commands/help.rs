use super::Command;
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static HELP: &str = "Available commands:\n\n\
     /keywords word1, word2 - set the keywords you want to be notified about. \
     Wrap a keyword in square brackets to make it required ([rust]), \
     use | for alternatives (rust|golang), + to require several words (python+django) \
     and a trailing * for prefixes (develop*).\n\
     /keywords - show your current keywords.\n\
     /add_keyword word - add a single keyword.\n\
     /remove_keyword word - remove a single keyword.\n\
     /ignore_keywords word1, word2 - skip messages that match any of these patterns.\n\
     /ignore_keywords clear - remove all ignore patterns.\n\
     /add_ignore_keyword word - add a single ignore pattern.\n\
     /remove_ignore_keyword word - remove a single ignore pattern.\n\
     /my_settings - show your keywords, ignore patterns and forward counters.\n\
     /language code - set your interface language.\n\
     /help - this message.";

static COMMAND: &str = "/help";

#[derive(TypedBuilder)]
pub struct Help {
    message: Message,
}

impl Help {
    pub fn command() -> &'static str {
        COMMAND
    }
}

impl Command for Help {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, _connection: &mut SqliteConnection) -> String {
        HELP.to_string()
    }
}
