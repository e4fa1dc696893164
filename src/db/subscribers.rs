use crate::config::Config;
use crate::db::{self, StoreError};
use crate::models::Subscriber;
use crate::schema::{subscriber_ignore_keywords, subscriber_keywords, subscribers};
use diesel::prelude::*;
use diesel::result::Error;
use std::collections::BTreeMap;

/// Creates the subscriber row if it does not exist yet and touches
/// `last_active`. Safe to call on every interaction.
pub fn ensure_subscriber(conn: &mut SqliteConnection, id: i64) -> Result<Subscriber, Error> {
    diesel::insert_into(subscribers::table)
        .values((
            subscribers::id.eq(id),
            subscribers::created_at.eq(db::current_time()),
            subscribers::last_active.eq(db::current_time()),
        ))
        .on_conflict(subscribers::id)
        .do_nothing()
        .execute(conn)?;

    diesel::update(subscribers::table.filter(subscribers::id.eq(id)))
        .set(subscribers::last_active.eq(db::current_time()))
        .get_result::<Subscriber>(conn)
}

pub fn find(conn: &mut SqliteConnection, id: i64) -> Option<Subscriber> {
    subscribers::table
        .filter(subscribers::id.eq(id))
        .first::<Subscriber>(conn)
        .ok()
}

/// Replaces the subscriber's keyword list in one transaction. The list
/// is normalized first; validation failures leave the stored list
/// untouched. Returns the list as stored.
pub fn set_keywords(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keywords: Vec<String>,
) -> Result<Vec<String>, StoreError> {
    let keywords = validate_keywords(keywords, Config::max_keywords_per_subscriber())?;

    ensure_subscriber(conn, subscriber_id)?;

    conn.transaction::<_, Error, _>(|conn| {
        diesel::delete(
            subscriber_keywords::table.filter(subscriber_keywords::subscriber_id.eq(subscriber_id)),
        )
        .execute(conn)?;

        insert_keyword_rows(conn, subscriber_id, &keywords)?;

        Ok(())
    })?;

    Ok(keywords)
}

/// Same as `set_keywords`, for the ignore list.
pub fn set_ignore_keywords(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keywords: Vec<String>,
) -> Result<Vec<String>, StoreError> {
    let keywords = validate_keywords(
        keywords,
        Config::max_ignore_keywords_per_subscriber(),
    )?;

    ensure_subscriber(conn, subscriber_id)?;

    conn.transaction::<_, Error, _>(|conn| {
        diesel::delete(
            subscriber_ignore_keywords::table
                .filter(subscriber_ignore_keywords::subscriber_id.eq(subscriber_id)),
        )
        .execute(conn)?;

        insert_ignore_keyword_rows(conn, subscriber_id, &keywords)?;

        Ok(())
    })?;

    Ok(keywords)
}

/// Adds a single keyword. Returns `false` when the keyword was already
/// in the list.
pub fn add_keyword(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keyword: &str,
) -> Result<bool, StoreError> {
    let max_count = Config::max_keywords_per_subscriber();
    let keyword = match normalize_keyword(keyword) {
        Some(keyword) => validate_keyword_length(keyword)?,
        None => return Ok(false),
    };

    ensure_subscriber(conn, subscriber_id)?;

    conn.transaction::<_, StoreError, _>(|conn| {
        let count: i64 = subscriber_keywords::table
            .filter(subscriber_keywords::subscriber_id.eq(subscriber_id))
            .count()
            .get_result(conn)?;

        if count as usize >= max_count {
            return Err(StoreError::TooManyKeywords { max: max_count });
        }

        let inserted = diesel::insert_into(subscriber_keywords::table)
            .values((
                subscriber_keywords::subscriber_id.eq(subscriber_id),
                subscriber_keywords::keyword.eq(&keyword),
                subscriber_keywords::created_at.eq(db::current_time()),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?;

        Ok(inserted > 0)
    })
}

pub fn remove_keyword(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keyword: &str,
) -> Result<bool, Error> {
    let keyword = match normalize_keyword(keyword) {
        Some(keyword) => keyword,
        None => return Ok(false),
    };

    let removed = diesel::delete(
        subscriber_keywords::table
            .filter(subscriber_keywords::subscriber_id.eq(subscriber_id))
            .filter(subscriber_keywords::keyword.eq(keyword)),
    )
    .execute(conn)?;

    Ok(removed > 0)
}

pub fn add_ignore_keyword(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keyword: &str,
) -> Result<bool, StoreError> {
    let max_count = Config::max_ignore_keywords_per_subscriber();
    let keyword = match normalize_keyword(keyword) {
        Some(keyword) => validate_keyword_length(keyword)?,
        None => return Ok(false),
    };

    ensure_subscriber(conn, subscriber_id)?;

    conn.transaction::<_, StoreError, _>(|conn| {
        let count: i64 = subscriber_ignore_keywords::table
            .filter(subscriber_ignore_keywords::subscriber_id.eq(subscriber_id))
            .count()
            .get_result(conn)?;

        if count as usize >= max_count {
            return Err(StoreError::TooManyKeywords { max: max_count });
        }

        let inserted = diesel::insert_into(subscriber_ignore_keywords::table)
            .values((
                subscriber_ignore_keywords::subscriber_id.eq(subscriber_id),
                subscriber_ignore_keywords::keyword.eq(&keyword),
                subscriber_ignore_keywords::created_at.eq(db::current_time()),
            ))
            .on_conflict_do_nothing()
            .execute(conn)?;

        Ok(inserted > 0)
    })
}

pub fn remove_ignore_keyword(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keyword: &str,
) -> Result<bool, Error> {
    let keyword = match normalize_keyword(keyword) {
        Some(keyword) => keyword,
        None => return Ok(false),
    };

    let removed = diesel::delete(
        subscriber_ignore_keywords::table
            .filter(subscriber_ignore_keywords::subscriber_id.eq(subscriber_id))
            .filter(subscriber_ignore_keywords::keyword.eq(keyword)),
    )
    .execute(conn)?;

    Ok(removed > 0)
}

pub fn purge_ignore_keywords(conn: &mut SqliteConnection, subscriber_id: i64) -> Result<usize, Error> {
    diesel::delete(
        subscriber_ignore_keywords::table
            .filter(subscriber_ignore_keywords::subscriber_id.eq(subscriber_id)),
    )
    .execute(conn)
}

pub fn get_keywords(conn: &mut SqliteConnection, subscriber_id: i64) -> Result<Vec<String>, Error> {
    subscriber_keywords::table
        .filter(subscriber_keywords::subscriber_id.eq(subscriber_id))
        .order(subscriber_keywords::id.asc())
        .select(subscriber_keywords::keyword)
        .load::<String>(conn)
}

pub fn get_ignore_keywords(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
) -> Result<Vec<String>, Error> {
    subscriber_ignore_keywords::table
        .filter(subscriber_ignore_keywords::subscriber_id.eq(subscriber_id))
        .order(subscriber_ignore_keywords::id.asc())
        .select(subscriber_ignore_keywords::keyword)
        .load::<String>(conn)
}

/// Snapshot of every subscriber that has at least one keyword, read in
/// a single transaction so a message is matched against a consistent
/// view. Keyed by subscriber id, keywords in insertion order.
pub fn all_with_keywords(conn: &mut SqliteConnection) -> Result<BTreeMap<i64, Vec<String>>, Error> {
    conn.transaction::<_, Error, _>(|conn| {
        let rows = subscriber_keywords::table
            .order((
                subscriber_keywords::subscriber_id.asc(),
                subscriber_keywords::id.asc(),
            ))
            .select((
                subscriber_keywords::subscriber_id,
                subscriber_keywords::keyword,
            ))
            .load::<(i64, String)>(conn)?;

        let mut snapshot: BTreeMap<i64, Vec<String>> = BTreeMap::new();

        for (subscriber_id, keyword) in rows {
            snapshot.entry(subscriber_id).or_default().push(keyword);
        }

        Ok(snapshot)
    })
}

/// Returns `true` when the subscriber may still be forwarded to today.
///
/// The check is read-mostly: when the stored `last_forward_date` is not
/// today the daily counter is stale and gets reset in the same
/// transaction. The counter itself is only incremented when a forward
/// is logged. Storage failures fail open so a degraded database slows
/// the bot down instead of silencing it.
pub fn check_daily_limit(conn: &mut SqliteConnection, subscriber_id: i64, cap: i32) -> bool {
    let result = conn.transaction::<bool, Error, _>(|conn| {
        let subscriber = match subscribers::table
            .filter(subscribers::id.eq(subscriber_id))
            .first::<Subscriber>(conn)
            .optional()?
        {
            Some(subscriber) => subscriber,
            None => return Ok(true),
        };

        let today = db::current_date();

        if subscriber.last_forward_date != Some(today) {
            diesel::update(&subscriber)
                .set((
                    subscribers::daily_forwards.eq(0),
                    subscribers::last_forward_date.eq(today),
                ))
                .execute(conn)?;

            return Ok(cap > 0);
        }

        Ok(subscriber.daily_forwards < cap)
    });

    match result {
        Ok(allowed) => allowed,
        Err(error) => {
            log::error!(
                "Failed to check the daily limit for {}: {}",
                subscriber_id,
                error
            );

            true
        }
    }
}

pub fn get_language(conn: &mut SqliteConnection, subscriber_id: i64) -> Result<String, Error> {
    subscribers::table
        .filter(subscribers::id.eq(subscriber_id))
        .select(subscribers::language)
        .first::<String>(conn)
}

pub fn set_language(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    language: &str,
) -> Result<Subscriber, Error> {
    ensure_subscriber(conn, subscriber_id)?;

    diesel::update(subscribers::table.filter(subscribers::id.eq(subscriber_id)))
        .set(subscribers::language.eq(language))
        .get_result::<Subscriber>(conn)
}

fn insert_keyword_rows(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keywords: &[String],
) -> Result<(), Error> {
    let now = db::current_time();
    let rows: Vec<_> = keywords
        .iter()
        .map(|keyword| {
            (
                subscriber_keywords::subscriber_id.eq(subscriber_id),
                subscriber_keywords::keyword.eq(keyword),
                subscriber_keywords::created_at.eq(now),
            )
        })
        .collect();

    diesel::insert_into(subscriber_keywords::table)
        .values(rows)
        .execute(conn)?;

    Ok(())
}

fn insert_ignore_keyword_rows(
    conn: &mut SqliteConnection,
    subscriber_id: i64,
    keywords: &[String],
) -> Result<(), Error> {
    let now = db::current_time();
    let rows: Vec<_> = keywords
        .iter()
        .map(|keyword| {
            (
                subscriber_ignore_keywords::subscriber_id.eq(subscriber_id),
                subscriber_ignore_keywords::keyword.eq(keyword),
                subscriber_ignore_keywords::created_at.eq(now),
            )
        })
        .collect();

    diesel::insert_into(subscriber_ignore_keywords::table)
        .values(rows)
        .execute(conn)?;

    Ok(())
}

fn normalize_keyword(raw: &str) -> Option<String> {
    let mut keyword = raw.trim();

    // Quoted phrases are accepted on input; the stored form is bare.
    if keyword.len() >= 2 && keyword.starts_with('"') && keyword.ends_with('"') {
        keyword = keyword[1..keyword.len() - 1].trim();
    }

    if keyword.is_empty() {
        return None;
    }

    Some(keyword.to_lowercase())
}

fn validate_keyword_length(keyword: String) -> Result<String, StoreError> {
    let max = Config::max_keyword_length();

    if keyword.chars().count() > max {
        return Err(StoreError::KeywordTooLong { max });
    }

    Ok(keyword)
}

fn validate_keywords(raw: Vec<String>, max_count: usize) -> Result<Vec<String>, StoreError> {
    let mut keywords: Vec<String> = Vec::new();

    for keyword in raw {
        if let Some(keyword) = normalize_keyword(&keyword) {
            if !keywords.contains(&keyword) {
                keywords.push(keyword);
            }
        }
    }

    if keywords.len() > max_count {
        return Err(StoreError::TooManyKeywords { max: max_count });
    }

    for keyword in &keywords {
        validate_keyword_length(keyword.clone())?;
    }

    Ok(keywords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use diesel::connection::Connection;
    use diesel::result::Error;

    #[test]
    fn ensure_subscriber_is_idempotent() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            let created = super::ensure_subscriber(connection, 42)?;
            let again = super::ensure_subscriber(connection, 42)?;

            assert_eq!(created.id, again.id);
            assert_eq!(created.created_at, again.created_at);
            assert_eq!(created.total_forwards, 0);
            assert_eq!(created.language, "en");

            Ok(())
        });
    }

    #[test]
    fn set_keywords_replaces_the_whole_list() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::set_keywords(connection, 1, vec!["rust".to_string(), "tokio".to_string()])
                .unwrap();
            super::set_keywords(connection, 1, vec!["python".to_string()]).unwrap();

            let keywords = super::get_keywords(connection, 1)?;

            assert_eq!(keywords, vec!["python".to_string()]);

            Ok(())
        });
    }

    #[test]
    fn set_keywords_normalizes_and_deduplicates() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            let stored = super::set_keywords(
                connection,
                1,
                vec![
                    "  Rust ".to_string(),
                    "\"machine learning\"".to_string(),
                    "rust".to_string(),
                    "   ".to_string(),
                ],
            )
            .unwrap();

            assert_eq!(
                stored,
                vec!["rust".to_string(), "machine learning".to_string()]
            );
            assert_eq!(super::get_keywords(connection, 1)?, stored);

            Ok(())
        });
    }

    #[test]
    fn set_keywords_rejects_oversized_lists_without_touching_storage() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::set_keywords(connection, 1, vec!["rust".to_string()]).unwrap();

            let too_many: Vec<String> = (0..200).map(|i| format!("keyword{}", i)).collect();
            let result = super::set_keywords(connection, 1, too_many);

            assert_eq!(result, Err(StoreError::TooManyKeywords { max: 50 }));
            assert_eq!(super::get_keywords(connection, 1)?, vec!["rust".to_string()]);

            Ok(())
        });
    }

    #[test]
    fn set_keywords_rejects_an_overlong_keyword() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            let result = super::set_keywords(connection, 1, vec!["x".repeat(101)]);

            assert_eq!(result, Err(StoreError::KeywordTooLong { max: 100 }));

            Ok(())
        });
    }

    #[test]
    fn add_and_remove_a_single_keyword() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            assert!(super::add_keyword(connection, 1, "Rust").unwrap());
            assert!(!super::add_keyword(connection, 1, "rust").unwrap());

            assert!(super::remove_keyword(connection, 1, "RUST")?);
            assert!(!super::remove_keyword(connection, 1, "rust")?);

            Ok(())
        });
    }

    #[test]
    fn ignore_keywords_are_stored_separately() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::set_keywords(connection, 1, vec!["rust".to_string()]).unwrap();
            super::set_ignore_keywords(connection, 1, vec!["senior*".to_string()]).unwrap();

            assert_eq!(super::get_keywords(connection, 1)?, vec!["rust".to_string()]);
            assert_eq!(
                super::get_ignore_keywords(connection, 1)?,
                vec!["senior*".to_string()]
            );

            assert_eq!(super::purge_ignore_keywords(connection, 1)?, 1);
            assert!(super::get_ignore_keywords(connection, 1)?.is_empty());

            Ok(())
        });
    }

    #[test]
    fn all_with_keywords_skips_subscribers_without_keywords() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::set_keywords(connection, 1, vec!["rust".to_string()]).unwrap();
            super::set_keywords(connection, 2, vec!["go".to_string(), "zig".to_string()])
                .unwrap();
            super::ensure_subscriber(connection, 3)?;

            let snapshot = super::all_with_keywords(connection)?;

            assert_eq!(snapshot.len(), 2);
            assert_eq!(snapshot[&1], vec!["rust".to_string()]);
            assert_eq!(snapshot[&2], vec!["go".to_string(), "zig".to_string()]);

            Ok(())
        });
    }

    #[test]
    fn check_daily_limit_allows_under_the_cap() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::ensure_subscriber(connection, 1)?;

            assert!(super::check_daily_limit(connection, 1, 50));

            Ok(())
        });
    }

    #[test]
    fn check_daily_limit_blocks_at_the_cap() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::ensure_subscriber(connection, 1)?;

            diesel::update(subscribers::table.filter(subscribers::id.eq(1)))
                .set((
                    subscribers::daily_forwards.eq(50),
                    subscribers::last_forward_date.eq(db::current_date()),
                ))
                .execute(connection)?;

            assert!(!super::check_daily_limit(connection, 1, 50));

            Ok(())
        });
    }

    #[test]
    fn check_daily_limit_resets_the_counter_on_a_new_day() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            super::ensure_subscriber(connection, 1)?;

            let yesterday = db::current_date().pred_opt().unwrap();

            diesel::update(subscribers::table.filter(subscribers::id.eq(1)))
                .set((
                    subscribers::daily_forwards.eq(50),
                    subscribers::last_forward_date.eq(yesterday),
                ))
                .execute(connection)?;

            assert!(super::check_daily_limit(connection, 1, 50));

            let subscriber = super::find(connection, 1).unwrap();

            assert_eq!(subscriber.daily_forwards, 0);
            assert_eq!(subscriber.last_forward_date, Some(db::current_date()));

            Ok(())
        });
    }

    #[test]
    fn check_daily_limit_fails_open_on_a_storage_error() {
        // No migrations: the subscribers table does not exist, so the
        // select inside the check fails.
        let mut connection = SqliteConnection::establish(":memory:").unwrap();

        assert!(super::check_daily_limit(&mut connection, 1, 50));
    }

    #[test]
    fn check_daily_limit_allows_unknown_subscribers() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            assert!(super::check_daily_limit(connection, 99, 50));

            Ok(())
        });
    }

    #[test]
    fn set_language_updates_the_subscriber() {
        let mut connection = db::establish_test_connection();

        connection.test_transaction::<_, Error, _>(|connection| {
            let subscriber = super::set_language(connection, 1, "es")?;

            assert_eq!(subscriber.language, "es");
            assert_eq!(super::get_language(connection, 1)?, "es");

            Ok(())
        });
    }
}
