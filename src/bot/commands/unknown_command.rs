use super::Command;
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use typed_builder::TypedBuilder;

#[derive(TypedBuilder)]
pub struct UnknownCommand {
    message: Message,
    args: String,
}

impl Command for UnknownCommand {
    fn message(&self) -> &Message {
        &self.message
    }

    fn response(&self, _connection: &mut SqliteConnection) -> String {
        log::warn!("{} sent an unknown command: {}", self.message.chat.id, self.args);

        "Unknown command. Use /help to see available commands.".to_string()
    }
}
