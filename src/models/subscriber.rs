use crate::schema::subscribers;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

#[derive(Queryable, Identifiable, Debug, Clone)]
#[diesel(table_name = subscribers)]
#[diesel(primary_key(id))]
pub struct Subscriber {
    pub id: i64,
    pub created_at: NaiveDateTime,
    pub last_active: NaiveDateTime,
    pub total_forwards: i64,
    pub daily_forwards: i32,
    pub last_forward_date: Option<NaiveDate>,
    pub language: String,
}
