use std::fmt;

pub mod forward_job;

pub use forward_job::{ForwardJob, InboundMessage};

/// Seam between the pipeline and the messaging backend. The production
/// implementation lives on the Telegram client; tests mock it.
#[cfg_attr(test, mockall::automock)]
pub trait MessageRelay {
    /// Forwards `message_id` from the feed chat to the subscriber chat,
    /// preserving the original attribution.
    fn forward_message(
        &self,
        subscriber_id: i64,
        from_chat_id: i64,
        message_id: i64,
    ) -> Result<(), RelayError>;
}

#[derive(Debug)]
pub struct RelayError {
    pub message: String,
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RelayError {}
