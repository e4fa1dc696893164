use crate::config::Config;
use crate::db::{self, feeds, forwards, subscribers, SqlitePool, StoreError};
use crate::deliver::MessageRelay;
use crate::events::{Event, EventBus};
use crate::matcher;
use std::sync::Arc;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// A message as it arrives from a monitored chat, stripped down to what
/// matching and forwarding need.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub feed_chat_id: i64,
    pub message_id: i64,
    pub text: String,
}

/// Fans one inbound message out to every subscriber whose keyword
/// profile matches it.
///
/// Per-subscriber failures are logged and skipped so one broken chat
/// cannot stall the rest of the batch. Database handles are checked out
/// around each storage step and never held across a relay call.
#[derive(TypedBuilder)]
pub struct ForwardJob<R: MessageRelay> {
    db_pool: SqlitePool,
    relay: R,
    events: Arc<EventBus>,
    #[builder(default = Config::daily_forward_cap())]
    daily_forward_cap: i32,
    #[builder(default = Config::dispatch_delay_milliseconds())]
    dispatch_delay_milliseconds: u64,
}

impl<R: MessageRelay> ForwardJob<R> {
    /// Runs the full pipeline for one message and returns how many
    /// subscribers it was forwarded to.
    ///
    /// Messages from unregistered or inactive chats are dropped. A
    /// `StoreError` from the shared steps (snapshot, per-subscriber
    /// checkout) aborts the batch; the caller may retry the whole
    /// message later since logged forwards are deduplicated.
    pub async fn process_message(&self, message: &InboundMessage) -> Result<usize, StoreError> {
        let snapshot = {
            let mut connection = db::fetch_connection(&self.db_pool)?;

            if feeds::find_active_by_chat_id(&mut connection, message.feed_chat_id).is_none() {
                log::debug!(
                    "Dropping message {} from unmonitored chat {}",
                    message.message_id,
                    message.feed_chat_id
                );

                return Ok(0);
            }

            subscribers::all_with_keywords(&mut connection)?
        };

        self.events.publish(Event::MessageReceived {
            feed_id: message.feed_chat_id,
            message_id: message.message_id,
        });

        let mut delivered = 0;

        for (subscriber_id, keywords) in snapshot {
            // Channels and groups appear in the subscriber table only
            // by misconfiguration; the feed itself never gets its own
            // messages back.
            if subscriber_id <= 0 || subscriber_id == message.feed_chat_id {
                continue;
            }

            if self.forward_to_subscriber(message, subscriber_id, &keywords)? {
                delivered += 1;

                if self.dispatch_delay_milliseconds > 0 {
                    tokio::time::sleep(Duration::from_millis(self.dispatch_delay_milliseconds))
                        .await;
                }
            }
        }

        Ok(delivered)
    }

    fn forward_to_subscriber(
        &self,
        message: &InboundMessage,
        subscriber_id: i64,
        keywords: &[String],
    ) -> Result<bool, StoreError> {
        let (allowed, ignore_keywords) = {
            let mut connection = db::fetch_connection(&self.db_pool)?;

            // Upstream chats redeliver on edits and restarts; anything
            // already logged for this subscriber is done.
            if forwards::find(
                &mut connection,
                subscriber_id,
                message.feed_chat_id,
                message.message_id,
            )
            .is_some()
            {
                return Ok(false);
            }

            let allowed =
                subscribers::check_daily_limit(&mut connection, subscriber_id, self.daily_forward_cap);
            let ignore_keywords = subscribers::get_ignore_keywords(&mut connection, subscriber_id)
                .unwrap_or_else(|error| {
                    log::error!(
                        "Failed to load ignore keywords for {}: {}",
                        subscriber_id,
                        error
                    );

                    Vec::new()
                });

            (allowed, ignore_keywords)
        };

        if !allowed {
            self.events
                .publish(Event::DailyLimitReached { subscriber_id });

            return Ok(false);
        }

        let matched = match matcher::matching_keywords(&message.text, keywords) {
            Some(matched) => matched,
            None => return Ok(false),
        };

        if matcher::matches_ignore_keywords(&message.text, &ignore_keywords) {
            return Ok(false);
        }

        if let Err(error) =
            self.relay
                .forward_message(subscriber_id, message.feed_chat_id, message.message_id)
        {
            // Not logged: a later redelivery may still reach this
            // subscriber.
            log::error!(
                "Failed to forward message {} to {}: {}",
                message.message_id,
                subscriber_id,
                error
            );

            self.events.publish(Event::ForwardFailed {
                subscriber_id,
                feed_id: message.feed_chat_id,
                message_id: message.message_id,
            });

            return Ok(false);
        }

        {
            let mut connection = db::fetch_connection(&self.db_pool)?;

            if let Err(error) = forwards::log_forward(
                &mut connection,
                subscriber_id,
                message.feed_chat_id,
                message.message_id,
                &matched,
            ) {
                log::error!(
                    "Failed to log the forward of {} to {}: {}",
                    message.message_id,
                    subscriber_id,
                    error
                );
            }
        }

        self.events.publish(Event::MessageForwarded {
            subscriber_id,
            feed_id: message.feed_chat_id,
            message_id: message.message_id,
        });

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::feeds::FeedKind;
    use crate::deliver::MockMessageRelay;
    use crate::models::Subscriber;
    use crate::schema::subscribers as subscribers_schema;
    use diesel::prelude::*;

    const FEED_CHAT_ID: i64 = -100123;

    fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("reenvio.db");
        let pool = db::create_pool(path.to_str().unwrap(), 5, Duration::from_secs(1));

        {
            let mut connection = pool.get().unwrap();
            db::run_migrations(&mut connection);
            feeds::add(&mut connection, FEED_CHAT_ID, Some("@jobs"), FeedKind::Bot).unwrap();
        }

        (directory, pool)
    }

    fn set_keywords(pool: &SqlitePool, subscriber_id: i64, keywords: &[&str]) {
        let mut connection = pool.get().unwrap();

        subscribers::set_keywords(
            &mut connection,
            subscriber_id,
            keywords.iter().map(|keyword| keyword.to_string()).collect(),
        )
        .unwrap();
    }

    fn find_subscriber(pool: &SqlitePool, subscriber_id: i64) -> Subscriber {
        let mut connection = pool.get().unwrap();

        subscribers::find(&mut connection, subscriber_id).unwrap()
    }

    fn job(pool: &SqlitePool, relay: MockMessageRelay) -> ForwardJob<MockMessageRelay> {
        ForwardJob::builder()
            .db_pool(pool.clone())
            .relay(relay)
            .events(EventBus::new(16))
            .daily_forward_cap(50)
            .dispatch_delay_milliseconds(0)
            .build()
    }

    fn message(message_id: i64, text: &str) -> InboundMessage {
        InboundMessage {
            feed_chat_id: FEED_CHAT_ID,
            message_id,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn it_forwards_to_matching_subscribers_only() {
        let (_directory, pool) = test_pool();

        set_keywords(&pool, 1, &["rust"]);
        set_keywords(&pool, 2, &["python"]);

        let mut relay = MockMessageRelay::new();
        relay
            .expect_forward_message()
            .withf(|subscriber_id, from_chat_id, message_id| {
                *subscriber_id == 1 && *from_chat_id == FEED_CHAT_ID && *message_id == 777
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let delivered = job(&pool, relay)
            .process_message(&message(777, "A new Rust position"))
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(find_subscriber(&pool, 1).total_forwards, 1);
        assert_eq!(find_subscriber(&pool, 2).total_forwards, 0);
    }

    #[tokio::test]
    async fn it_drops_messages_from_unmonitored_chats() {
        let (_directory, pool) = test_pool();

        set_keywords(&pool, 1, &["rust"]);

        let mut relay = MockMessageRelay::new();
        relay.expect_forward_message().times(0);

        let job = job(&pool, relay);
        let unknown = InboundMessage {
            feed_chat_id: -100999,
            message_id: 777,
            text: "A new Rust position".to_string(),
        };

        assert_eq!(job.process_message(&unknown).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ignore_keywords_veto_a_matching_message() {
        let (_directory, pool) = test_pool();

        set_keywords(&pool, 1, &["developer"]);

        {
            let mut connection = pool.get().unwrap();
            subscribers::set_ignore_keywords(&mut connection, 1, vec!["senior*".to_string()])
                .unwrap();
        }

        let mut relay = MockMessageRelay::new();
        relay.expect_forward_message().times(0);

        let delivered = job(&pool, relay)
            .process_message(&message(777, "Senior developer wanted"))
            .await
            .unwrap();

        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn a_redelivered_message_is_not_forwarded_twice() {
        let (_directory, pool) = test_pool();

        set_keywords(&pool, 1, &["rust"]);

        {
            let mut connection = pool.get().unwrap();
            forwards::log_forward(&mut connection, 1, FEED_CHAT_ID, 777, &[]).unwrap();
        }

        let mut relay = MockMessageRelay::new();
        relay.expect_forward_message().times(0);

        let delivered = job(&pool, relay)
            .process_message(&message(777, "A new Rust position"))
            .await
            .unwrap();

        assert_eq!(delivered, 0);
        assert_eq!(find_subscriber(&pool, 1).total_forwards, 1);
    }

    #[tokio::test]
    async fn a_failing_subscriber_does_not_stall_the_batch() {
        let (_directory, pool) = test_pool();

        set_keywords(&pool, 1, &["rust"]);
        set_keywords(&pool, 2, &["rust"]);

        let mut relay = MockMessageRelay::new();
        relay
            .expect_forward_message()
            .withf(|subscriber_id, _, _| *subscriber_id == 1)
            .times(1)
            .returning(|_, _, _| {
                Err(crate::deliver::RelayError {
                    message: "blocked by the user".to_string(),
                })
            });
        relay
            .expect_forward_message()
            .withf(|subscriber_id, _, _| *subscriber_id == 2)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let delivered = job(&pool, relay)
            .process_message(&message(777, "A new Rust position"))
            .await
            .unwrap();

        assert_eq!(delivered, 1);
        assert_eq!(find_subscriber(&pool, 1).total_forwards, 0);
        assert_eq!(find_subscriber(&pool, 2).total_forwards, 1);
    }

    #[tokio::test]
    async fn the_daily_cap_stops_forwards_for_the_day() {
        let (_directory, pool) = test_pool();

        set_keywords(&pool, 1, &["rust"]);

        {
            let mut connection = pool.get().unwrap();

            diesel::update(subscribers_schema::table.filter(subscribers_schema::id.eq(1)))
                .set((
                    subscribers_schema::daily_forwards.eq(2),
                    subscribers_schema::last_forward_date.eq(db::current_date()),
                ))
                .execute(&mut connection)
                .unwrap();
        }

        let mut relay = MockMessageRelay::new();
        relay.expect_forward_message().times(0);

        let events = EventBus::new(16);
        let mut receiver = events.subscribe();

        let job = ForwardJob::builder()
            .db_pool(pool.clone())
            .relay(relay)
            .events(events)
            .daily_forward_cap(2)
            .dispatch_delay_milliseconds(0)
            .build();

        assert_eq!(
            job.process_message(&message(777, "A new Rust position"))
                .await
                .unwrap(),
            0
        );

        let mut limit_reached = false;

        while let Ok(event) = receiver.try_recv() {
            if matches!(event, Event::DailyLimitReached { subscriber_id: 1 }) {
                limit_reached = true;
            }
        }

        assert!(limit_reached);
    }

    #[tokio::test]
    async fn the_feed_chat_never_receives_its_own_messages() {
        let (_directory, pool) = test_pool();

        // A misconfigured profile on the feed chat id itself.
        {
            let mut connection = pool.get().unwrap();
            subscribers::ensure_subscriber(&mut connection, FEED_CHAT_ID).unwrap();

            diesel::insert_into(crate::schema::subscriber_keywords::table)
                .values((
                    crate::schema::subscriber_keywords::subscriber_id.eq(FEED_CHAT_ID),
                    crate::schema::subscriber_keywords::keyword.eq("rust"),
                    crate::schema::subscriber_keywords::created_at.eq(db::current_time()),
                ))
                .execute(&mut connection)
                .unwrap();
        }

        let mut relay = MockMessageRelay::new();
        relay.expect_forward_message().times(0);

        let delivered = job(&pool, relay)
            .process_message(&message(777, "A new Rust position"))
            .await
            .unwrap();

        assert_eq!(delivered, 0);
    }
}
