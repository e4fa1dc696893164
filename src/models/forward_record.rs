use crate::schema::forward_log;
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Identifiable, Debug, Clone)]
#[diesel(table_name = forward_log)]
#[diesel(primary_key(id))]
pub struct ForwardRecord {
    pub id: i64,
    pub subscriber_id: i64,
    pub feed_id: i64,
    pub message_id: i64,
    pub keywords_matched: Option<String>,
    pub forwarded_at: NaiveDateTime,
}
