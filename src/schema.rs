diesel::table! {
    subscribers (id) {
        id -> BigInt,
        created_at -> Timestamp,
        last_active -> Timestamp,
        total_forwards -> BigInt,
        daily_forwards -> Integer,
        last_forward_date -> Nullable<Date>,
        language -> Text,
    }
}

diesel::table! {
    subscriber_keywords (id) {
        id -> BigInt,
        subscriber_id -> BigInt,
        keyword -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    subscriber_ignore_keywords (id) {
        id -> BigInt,
        subscriber_id -> BigInt,
        keyword -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    monitored_feeds (id) {
        id -> BigInt,
        chat_id -> BigInt,
        handle -> Nullable<Text>,
        kind -> Text,
        status -> Text,
        added_at -> Timestamp,
        last_updated -> Timestamp,
    }
}

diesel::table! {
    forward_log (id) {
        id -> BigInt,
        subscriber_id -> BigInt,
        feed_id -> BigInt,
        message_id -> BigInt,
        keywords_matched -> Nullable<Text>,
        forwarded_at -> Timestamp,
    }
}

diesel::joinable!(subscriber_keywords -> subscribers (subscriber_id));
diesel::joinable!(subscriber_ignore_keywords -> subscribers (subscriber_id));
diesel::joinable!(forward_log -> subscribers (subscriber_id));

diesel::allow_tables_to_appear_in_same_query!(
    subscribers,
    subscriber_keywords,
    subscriber_ignore_keywords,
    monitored_feeds,
    forward_log,
);
