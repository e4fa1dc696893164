use super::Command;
use crate::db::subscribers;
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

static START: &str = "Reenvio forwards messages from monitored channels straight to you.\n\n\
     Set your keywords with /keywords and every matching channel post will land in this chat.\n\
     Use /help to see all available commands.";

static COMMAND: &str = "/start";

#[derive(TypedBuilder)]
pub struct Start {
    message: Message,
}

impl Start {
    pub fn command() -> &'static str {
        COMMAND
    }
}

impl Command for Start {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, connection: &mut SqliteConnection) -> String {
        if let Err(error) = subscribers::ensure_subscriber(connection, self.message.chat.id) {
            log::error!("Failed to register {}: {}", self.message.chat.id, error);

            return "Failed to process your command. Please try again later.".to_string();
        }

        START.to_string()
    }
}
