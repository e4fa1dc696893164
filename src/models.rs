pub mod forward_record;
pub mod monitored_feed;
pub mod subscriber;

pub use forward_record::ForwardRecord;
pub use monitored_feed::MonitoredFeed;
pub use subscriber::Subscriber;
