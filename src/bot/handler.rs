use super::commands::add_ignore_keyword::AddIgnoreKeyword;
use super::commands::add_keyword::AddKeyword;
use super::commands::help::Help;
use super::commands::my_settings::MySettings;
use super::commands::remove_ignore_keyword::RemoveIgnoreKeyword;
use super::commands::remove_keyword::RemoveKeyword;
use super::commands::set_ignore_keywords::SetIgnoreKeywords;
use super::commands::set_keywords::SetKeywords;
use super::commands::set_language::SetLanguage;
use super::commands::start::Start;
use super::commands::unknown_command::UnknownCommand;
use super::commands::{BotCommand, Command};
use crate::bot::telegram_client::Api;
use crate::config::Config;
use crate::db::SqlitePool;
use crate::deliver::{ForwardJob, InboundMessage};
use frankenstein::{ChatType, Message, Update, UpdateContent};
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use tokio::runtime::Handle;

pub struct Handler {}

impl Handler {
    /// Blocking long-polling loop. Commands and channel posts are
    /// handed off to a worker pool so a slow subscriber batch does not
    /// delay update fetching.
    pub fn start(mut api: Api, db_pool: SqlitePool, forward_job: Arc<ForwardJob<Api>>) {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(Config::database_pool_size() as usize)
            .build()
            .unwrap();

        log::info!("Starting the Reenvio bot");

        let runtime_handle = Handle::current();
        let interval = std::time::Duration::from_secs(1);

        loop {
            while let Some(update) = api.next_update() {
                let db_pool = db_pool.clone();
                let tg_api = api.clone();
                let forward_job = forward_job.clone();
                let runtime_handle = runtime_handle.clone();

                thread_pool.spawn(move || {
                    Self::process_update(db_pool, tg_api, forward_job, runtime_handle, update)
                });
            }

            thread::sleep(interval);
        }
    }

    fn process_update(
        db_pool: SqlitePool,
        api: Api,
        forward_job: Arc<ForwardJob<Api>>,
        runtime_handle: Handle,
        update: Update,
    ) {
        match update.content {
            UpdateContent::Message(message) => Self::process_command(db_pool, api, message),
            UpdateContent::ChannelPost(channel_post) => {
                Self::process_channel_post(forward_job, runtime_handle, channel_post)
            }
            _ => (),
        }
    }

    fn process_command(db_pool: SqlitePool, api: Api, message: Message) {
        if !matches!(message.chat.type_field, ChatType::Private) {
            return;
        }

        let text = match &message.text {
            Some(text) => text.clone(),
            None => return,
        };

        let command = BotCommand::from_str(&text).unwrap();

        match command {
            BotCommand::Start => Start::builder()
                .message(message)
                .build()
                .execute(&db_pool, &api),

            BotCommand::Help => Help::builder()
                .message(message)
                .build()
                .execute(&db_pool, &api),

            BotCommand::SetKeywords(args) => SetKeywords::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),

            BotCommand::AddKeyword(args) => AddKeyword::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),

            BotCommand::RemoveKeyword(args) => RemoveKeyword::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),

            BotCommand::AddIgnoreKeyword(args) => AddIgnoreKeyword::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),

            BotCommand::RemoveIgnoreKeyword(args) => RemoveIgnoreKeyword::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),

            BotCommand::SetIgnoreKeywords(args) => SetIgnoreKeywords::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),

            BotCommand::MySettings => MySettings::builder()
                .message(message)
                .build()
                .execute(&db_pool, &api),

            BotCommand::SetLanguage(args) => SetLanguage::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),

            BotCommand::UnknownCommand(args) => UnknownCommand::builder()
                .message(message)
                .args(args)
                .build()
                .execute(&db_pool, &api),
        };
    }

    fn process_channel_post(
        forward_job: Arc<ForwardJob<Api>>,
        runtime_handle: Handle,
        channel_post: Message,
    ) {
        let text = match channel_post.text.as_ref().or(channel_post.caption.as_ref()) {
            Some(text) => text.clone(),
            None => return,
        };

        let inbound = InboundMessage {
            feed_chat_id: channel_post.chat.id,
            message_id: channel_post.message_id as i64,
            text,
        };

        if let Err(error) = runtime_handle.block_on(forward_job.process_message(&inbound)) {
            log::error!(
                "Failed to process message {} from {}: {}",
                inbound.message_id,
                inbound.feed_chat_id,
                error
            );
        }
    }
}
