use crate::db;
use crate::models::MonitoredFeed;
use crate::schema::monitored_feeds;
use diesel::prelude::*;
use diesel::result::Error;
use std::fmt;

pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_INACTIVE: &str = "inactive";

/// How messages arrive from a feed. The same chat can be monitored
/// through the bot and through a user account at the same time; the
/// two registrations are distinct rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Bot,
    UserAccount,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Bot => "bot",
            FeedKind::UserAccount => "user",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registers a feed. A second registration for the same `(chat_id, kind)`
/// pair surfaces as a unique violation from diesel.
pub fn add(
    conn: &mut SqliteConnection,
    chat_id: i64,
    handle: Option<&str>,
    kind: FeedKind,
) -> Result<MonitoredFeed, Error> {
    diesel::insert_into(monitored_feeds::table)
        .values((
            monitored_feeds::chat_id.eq(chat_id),
            monitored_feeds::handle.eq(handle),
            monitored_feeds::kind.eq(kind.as_str()),
            monitored_feeds::status.eq(STATUS_ACTIVE),
            monitored_feeds::added_at.eq(db::current_time()),
            monitored_feeds::last_updated.eq(db::current_time()),
        ))
        .get_result::<MonitoredFeed>(conn)
}

pub fn remove(conn: &mut SqliteConnection, chat_id: i64, kind: FeedKind) -> Result<usize, Error> {
    diesel::delete(
        monitored_feeds::table
            .filter(monitored_feeds::chat_id.eq(chat_id))
            .filter(monitored_feeds::kind.eq(kind.as_str())),
    )
    .execute(conn)
}

pub fn list(conn: &mut SqliteConnection) -> Result<Vec<MonitoredFeed>, Error> {
    monitored_feeds::table
        .order(monitored_feeds::id.asc())
        .load::<MonitoredFeed>(conn)
}

/// Looks the feed up by the chat id messages arrive with. Inactive
/// feeds are invisible to the pipeline.
pub fn find_active_by_chat_id(conn: &mut SqliteConnection, chat_id: i64) -> Option<MonitoredFeed> {
    monitored_feeds::table
        .filter(monitored_feeds::chat_id.eq(chat_id))
        .filter(monitored_feeds::status.eq(STATUS_ACTIVE))
        .first::<MonitoredFeed>(conn)
        .ok()
}

pub fn set_status(
    conn: &mut SqliteConnection,
    chat_id: i64,
    kind: FeedKind,
    status: &str,
) -> Result<usize, Error> {
    diesel::update(
        monitored_feeds::table
            .filter(monitored_feeds::chat_id.eq(chat_id))
            .filter(monitored_feeds::kind.eq(kind.as_str())),
    )
    .set((
        monitored_feeds::status.eq(status),
        monitored_feeds::last_updated.eq(db::current_time()),
    ))
    .execute(conn)
}

/// Chats get renamed; keep the stored handle in sync with what
/// Telegram reports.
pub fn update_handle(
    conn: &mut SqliteConnection,
    chat_id: i64,
    handle: Option<&str>,
) -> Result<usize, Error> {
    diesel::update(monitored_feeds::table.filter(monitored_feeds::chat_id.eq(chat_id)))
        .set((
            monitored_feeds::handle.eq(handle),
            monitored_feeds::last_updated.eq(db::current_time()),
        ))
        .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use diesel::result::{DatabaseErrorKind, Error};

    #[test]
    fn add_registers_an_active_feed() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            let feed = super::add(connection, -100123, Some("@jobs"), FeedKind::Bot)?;

            assert_eq!(feed.chat_id, -100123);
            assert_eq!(feed.kind, "bot");
            assert_eq!(feed.status, STATUS_ACTIVE);
            assert_eq!(feed.display_name(), "@jobs");

            Ok(())
        });
    }

    #[test]
    fn add_rejects_a_duplicate_registration() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::add(connection, -100123, None, FeedKind::Bot)?;

            let result = super::add(connection, -100123, None, FeedKind::Bot);

            assert!(matches!(
                result,
                Err(Error::DatabaseError(
                    DatabaseErrorKind::UniqueViolation,
                    _
                ))
            ));

            Ok(())
        });
    }

    #[test]
    fn the_same_chat_can_be_monitored_through_both_kinds() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::add(connection, -100123, None, FeedKind::Bot)?;
            super::add(connection, -100123, None, FeedKind::UserAccount)?;

            assert_eq!(super::list(connection)?.len(), 2);

            Ok(())
        });
    }

    #[test]
    fn find_active_by_chat_id_ignores_inactive_feeds() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::add(connection, -100123, None, FeedKind::Bot)?;

            assert!(super::find_active_by_chat_id(connection, -100123).is_some());

            super::set_status(connection, -100123, FeedKind::Bot, STATUS_INACTIVE)?;

            assert!(super::find_active_by_chat_id(connection, -100123).is_none());

            Ok(())
        });
    }

    #[test]
    fn remove_deletes_only_the_requested_kind() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::add(connection, -100123, None, FeedKind::Bot)?;
            super::add(connection, -100123, None, FeedKind::UserAccount)?;

            assert_eq!(super::remove(connection, -100123, FeedKind::Bot)?, 1);
            assert_eq!(super::list(connection)?.len(), 1);

            Ok(())
        });
    }

    #[test]
    fn update_handle_touches_last_updated() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            let feed = super::add(connection, -100123, None, FeedKind::Bot)?;

            assert_eq!(feed.display_name(), "-100123");

            super::update_handle(connection, -100123, Some("@renamed"))?;

            let feed = super::find_active_by_chat_id(connection, -100123).unwrap();

            assert_eq!(feed.handle.as_deref(), Some("@renamed"));

            Ok(())
        });
    }
}
