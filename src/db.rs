use crate::config::Config;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::fmt;
use std::time::Duration;

#[cfg(test)]
use diesel::connection::Connection;

pub mod feeds;
pub mod forwards;
pub mod subscribers;

pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;
pub type SqlitePooledConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors surfaced by the routing store.
///
/// Duplicate forwards and duplicate feed registrations are not listed
/// here: unique-constraint violations on those paths are expected
/// steady-state behavior and are handled where they occur.
#[derive(Debug, PartialEq)]
pub enum StoreError {
    TooManyKeywords { max: usize },
    KeywordTooLong { max: usize },
    PoolTimeout,
    Database(diesel::result::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::TooManyKeywords { max } => {
                write!(f, "the number of keywords is limited by {}", max)
            }
            StoreError::KeywordTooLong { max } => {
                write!(f, "a keyword can not be longer than {} characters", max)
            }
            StoreError::PoolTimeout => write!(f, "timed out waiting for a database connection"),
            StoreError::Database(error) => write!(f, "database error: {}", error),
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(error: diesel::result::Error) -> Self {
        StoreError::Database(error)
    }
}

#[derive(Debug, Clone, Copy)]
struct ConnectionPragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionPragmas {
    // Runs once per opened handle, not per checkout.
    fn on_acquire(&self, connection: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        connection
            .batch_execute(
                "PRAGMA journal_mode = WAL; \
                 PRAGMA synchronous = NORMAL; \
                 PRAGMA busy_timeout = 5000; \
                 PRAGMA foreign_keys = ON;",
            )
            .map_err(r2d2::Error::QueryError)
    }
}

pub fn create_connection_pool() -> SqlitePool {
    create_pool(
        &Config::database_url(),
        Config::database_pool_size(),
        Duration::from_secs(Config::pool_acquire_timeout_seconds()),
    )
}

pub fn create_pool(database_url: &str, max_size: u32, acquire_timeout: Duration) -> SqlitePool {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);

    Pool::builder()
        .max_size(max_size)
        .connection_timeout(acquire_timeout)
        .connection_customizer(Box::new(ConnectionPragmas))
        .build(manager)
        .expect("Failed to create a connection pool")
}

/// Checks out a handle, waiting at most the pool's configured acquire
/// timeout. Exhaustion surfaces as `StoreError::PoolTimeout` instead of
/// blocking the caller forever.
pub fn fetch_connection(pool: &SqlitePool) -> Result<SqlitePooledConnection, StoreError> {
    pool.get().map_err(|error| {
        log::error!("Failed to fetch a connection from the pool: {}", error);

        StoreError::PoolTimeout
    })
}

pub fn run_migrations(connection: &mut SqliteConnection) {
    connection
        .run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");
}

pub fn current_time() -> NaiveDateTime {
    Utc::now().naive_utc()
}

pub fn current_date() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
pub fn establish_test_connection() -> SqliteConnection {
    let mut connection = SqliteConnection::establish(":memory:").unwrap();

    connection.batch_execute("PRAGMA foreign_keys = ON;").unwrap();
    run_migrations(&mut connection);

    connection
}
