use crate::bot::telegram_client::{Api, SimpleMessageParams};
use crate::db::{self, SqlitePool};
use diesel::sqlite::SqliteConnection;
use frankenstein::Message;
use std::str::FromStr;

pub mod add_ignore_keyword;
pub mod add_keyword;
pub mod help;
pub mod my_settings;
pub mod remove_ignore_keyword;
pub mod remove_keyword;
pub mod set_ignore_keywords;
pub mod set_keywords;
pub mod set_language;
pub mod start;
pub mod unknown_command;

#[derive(Debug, PartialEq, Eq)]
pub enum BotCommand {
    AddIgnoreKeyword(String),
    AddKeyword(String),
    Help,
    MySettings,
    RemoveIgnoreKeyword(String),
    RemoveKeyword(String),
    SetIgnoreKeywords(String),
    SetKeywords(String),
    SetLanguage(String),
    Start,
    UnknownCommand(String),
}

impl FromStr for BotCommand {
    type Err = ();

    fn from_str(command: &str) -> Result<Self, Self::Err> {
        let trimmed = command.trim();
        let (name, args) = match trimmed.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (trimmed, ""),
        };

        // In group chats commands arrive as /command@bot_name.
        let name = name.split('@').next().unwrap_or(name);

        let result = match name {
            "/start" => BotCommand::Start,
            "/help" => BotCommand::Help,
            "/keywords" => BotCommand::SetKeywords(args.to_string()),
            "/add_keyword" => BotCommand::AddKeyword(args.to_string()),
            "/remove_keyword" => BotCommand::RemoveKeyword(args.to_string()),
            "/ignore_keywords" => BotCommand::SetIgnoreKeywords(args.to_string()),
            "/add_ignore_keyword" => BotCommand::AddIgnoreKeyword(args.to_string()),
            "/remove_ignore_keyword" => BotCommand::RemoveIgnoreKeyword(args.to_string()),
            "/my_settings" => BotCommand::MySettings,
            "/language" => BotCommand::SetLanguage(args.to_string()),
            _ => BotCommand::UnknownCommand(trimmed.to_string()),
        };

        Ok(result)
    }
}

pub trait Command {
    fn response(&self, connection: &mut SqliteConnection) -> String;

    fn message(&self) -> &Message;

    fn execute(&self, db_pool: &SqlitePool, api: &Api) {
        log::info!(
            "{:?} wrote: {}",
            self.message().chat.id,
            self.message().text.as_deref().unwrap_or("")
        );

        let response = match self.fetch_db_connection(db_pool) {
            Ok(mut connection) => self.response(&mut connection),
            Err(error_message) => error_message,
        };

        self.reply_to_message(api, response);
    }

    fn reply_to_message(&self, api: &Api, text: String) {
        let params = SimpleMessageParams::builder()
            .chat_id(self.message().chat.id)
            .message(text)
            .reply_message_id(self.message().message_id)
            .build();

        if let Err(error) = api.reply_with_text_message(&params) {
            log::error!("Failed to reply to update {:?}", error);
        }
    }

    fn fetch_db_connection(
        &self,
        db_pool: &SqlitePool,
    ) -> Result<db::SqlitePooledConnection, String> {
        db::fetch_connection(db_pool)
            .map_err(|_| "Failed to process your command. Please try again later.".to_string())
    }

    fn parse_keyword_list(&self, args: &str) -> Vec<String> {
        args.split(',')
            .map(|keyword| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty())
            .collect()
    }
}
