use std::env;

pub struct Config {}

impl Config {
    pub fn database_url() -> String {
        Self::read_var("DATABASE_URL")
    }

    pub fn database_pool_size() -> u32 {
        Self::read_var_with_default("DATABASE_POOL_SIZE", "5")
            .parse()
            .unwrap()
    }

    pub fn pool_acquire_timeout_seconds() -> u64 {
        Self::read_var_with_default("POOL_ACQUIRE_TIMEOUT_SECONDS", "5")
            .parse()
            .unwrap()
    }

    pub fn max_keywords_per_subscriber() -> usize {
        Self::read_var_with_default("MAX_KEYWORDS_PER_SUBSCRIBER", "50")
            .parse()
            .unwrap()
    }

    pub fn max_ignore_keywords_per_subscriber() -> usize {
        Self::read_var_with_default("MAX_IGNORE_KEYWORDS_PER_SUBSCRIBER", "50")
            .parse()
            .unwrap()
    }

    pub fn max_keyword_length() -> usize {
        Self::read_var_with_default("MAX_KEYWORD_LENGTH", "100")
            .parse()
            .unwrap()
    }

    pub fn daily_forward_cap() -> i32 {
        Self::read_var_with_default("DAILY_FORWARD_CAP", "50")
            .parse()
            .unwrap()
    }

    pub fn dispatch_delay_milliseconds() -> u64 {
        Self::read_var_with_default("DISPATCH_DELAY_MILLISECONDS", "500")
            .parse()
            .unwrap()
    }

    pub fn forward_log_retention_days() -> i64 {
        Self::read_var_with_default("FORWARD_LOG_RETENTION_DAYS", "30")
            .parse()
            .unwrap()
    }

    pub fn cleanup_interval_seconds() -> u64 {
        Self::read_var_with_default("CLEANUP_INTERVAL_SECONDS", "3600")
            .parse()
            .unwrap()
    }

    pub fn telegram_bot_token() -> String {
        Self::read_var("TELEGRAM_BOT_TOKEN")
    }

    pub fn telegram_base_url() -> String {
        Self::read_var_with_default("TELEGRAM_BASE_URL", "https://api.telegram.org/bot")
    }

    pub fn request_timeout_in_seconds() -> u64 {
        Self::read_var_with_default("REQUEST_TIMEOUT", "30").parse().unwrap()
    }

    fn read_var_with_default(name: &str, default_value: &str) -> String {
        env::var(name).unwrap_or_else(|_| default_value.to_string())
    }

    fn read_var(name: &str) -> String {
        env::var(name).unwrap_or_else(|_| panic!("{} must be set", name))
    }
}
