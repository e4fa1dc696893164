use crate::db;
use crate::models::ForwardRecord;
use crate::schema::{forward_log, subscribers};
use diesel::prelude::*;
use diesel::result::Error;

/// Records a delivered forward and bumps the subscriber's counters, all
/// in one transaction.
///
/// The log has a unique constraint on `(subscriber_id, feed_id,
/// message_id)`; a duplicate insert is swallowed and reported as
/// `Ok(false)` with the counters untouched, which is what makes
/// redelivered upstream messages at-most-once per subscriber.
pub fn log_forward(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    feed_id: i64,
    message_id: i64,
    keywords_matched: &[String],
) -> Result<bool, Error> {
    conn.transaction::<bool, Error, _>(|conn| {
        let keywords = if keywords_matched.is_empty() {
            None
        } else {
            Some(keywords_matched.join(", "))
        };

        let inserted = diesel::insert_into(forward_log::table)
            .values((
                forward_log::subscriber_id.eq(subscriber_id),
                forward_log::feed_id.eq(feed_id),
                forward_log::message_id.eq(message_id),
                forward_log::keywords_matched.eq(keywords),
                forward_log::forwarded_at.eq(db::current_time()),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?;

        if inserted == 0 {
            return Ok(false);
        }

        let (daily_forwards, last_forward_date) = subscribers::table
            .filter(subscribers::id.eq(subscriber_id))
            .select((subscribers::daily_forwards, subscribers::last_forward_date))
            .first::<(i32, Option<chrono::NaiveDate>)>(conn)?;

        let today = db::current_date();
        let daily_forwards = if last_forward_date == Some(today) {
            daily_forwards + 1
        } else {
            1
        };

        diesel::update(subscribers::table.filter(subscribers::id.eq(subscriber_id)))
            .set((
                subscribers::total_forwards.eq(subscribers::total_forwards + 1),
                subscribers::daily_forwards.eq(daily_forwards),
                subscribers::last_forward_date.eq(today),
                subscribers::last_active.eq(db::current_time()),
            ))
            .execute(conn)?;

        Ok(true)
    })
}

pub fn find(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    feed_id: i64,
    message_id: i64,
) -> Option<ForwardRecord> {
    forward_log::table
        .filter(forward_log::subscriber_id.eq(subscriber_id))
        .filter(forward_log::feed_id.eq(feed_id))
        .filter(forward_log::message_id.eq(message_id))
        .first::<ForwardRecord>(conn)
        .ok()
}

/// Drops log rows older than the retention window. Counters on the
/// subscriber rows are kept; only the de-dup history is trimmed.
pub fn delete_older_than(conn: &mut SqliteConnection, retention_days: i64) -> Result<usize, Error> {
    let cutoff = db::current_time() - chrono::Duration::days(retention_days);

    diesel::delete(forward_log::table.filter(forward_log::forwarded_at.lt(cutoff)))
        .execute(conn)
}
