use crate::config::Config;
use crate::db::{self, forwards, SqlitePool};
use crate::events::{Event, EventBus};
use std::sync::Arc;
use std::time::Duration;

/// Periodic retention sweep over the forward log. De-dup history older
/// than the retention window is no longer needed once the upstream chat
/// can no longer redeliver those messages.
pub struct CleanJob {
    retention_days: i64,
}

impl Default for CleanJob {
    fn default() -> Self {
        Self::new()
    }
}

impl CleanJob {
    pub fn new() -> Self {
        Self {
            retention_days: Config::forward_log_retention_days(),
        }
    }

    pub fn execute(&self, db_pool: &SqlitePool, events: &EventBus) {
        let mut connection = match db::fetch_connection(db_pool) {
            Ok(connection) => connection,
            Err(error) => {
                log::error!("Failed to clean the forward log: {}", error);

                return;
            }
        };

        match forwards::delete_older_than(&mut connection, self.retention_days) {
            Ok(removed) => {
                log::info!("Removed {} expired forward log records", removed);

                events.publish(Event::ForwardLogCleaned { removed });
            }
            Err(error) => log::error!("Failed to clean the forward log: {}", error),
        }
    }
}

pub async fn run_cleaner(db_pool: SqlitePool, events: Arc<EventBus>) {
    let job = CleanJob::new();
    let mut interval =
        tokio::time::interval(Duration::from_secs(Config::cleanup_interval_seconds()));

    loop {
        interval.tick().await;

        job.execute(&db_pool, &events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{forwards, subscribers};
    use crate::schema::forward_log;
    use diesel::prelude::*;

    #[test]
    fn execute_removes_expired_rows_and_publishes_the_count() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("reenvio.db");
        let pool = db::create_pool(path.to_str().unwrap(), 2, Duration::from_secs(1));
        let events = EventBus::new(16);
        let mut receiver = events.subscribe();

        {
            let mut connection = pool.get().unwrap();
            db::run_migrations(&mut connection);

            subscribers::ensure_subscriber(&mut connection, 1).unwrap();
            forwards::log_forward(&mut connection, 1, -100123, 1, &[]).unwrap();
            forwards::log_forward(&mut connection, 1, -100123, 2, &[]).unwrap();

            let expired = db::current_time() - chrono::Duration::days(45);

            diesel::update(forward_log::table.filter(forward_log::message_id.eq(1)))
                .set(forward_log::forwarded_at.eq(expired))
                .execute(&mut connection)
                .unwrap();
        }

        CleanJob::new().execute(&pool, &events);

        match receiver.try_recv().unwrap() {
            Event::ForwardLogCleaned { removed } => assert_eq!(removed, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
