use crate::schema::monitored_feeds;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Identifiable, Debug, Clone)]
#[diesel(table_name = monitored_feeds)]
#[diesel(primary_key(id))]
pub struct MonitoredFeed {
    pub id: i64,
    pub chat_id: i64,
    pub handle: Option<String>,
    pub kind: String,
    pub status: String,
    pub added_at: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

impl MonitoredFeed {
    /// Name shown to users: the `@handle` when the feed has one, the
    /// numeric chat id otherwise.
    pub fn display_name(&self) -> String {
        match &self.handle {
            Some(handle) => handle.clone(),
            None => format!("{}", self.chat_id),
        }
    }
}
