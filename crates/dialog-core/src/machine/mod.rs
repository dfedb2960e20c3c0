//! The dialog state machine
//!
//! Pure transition functions: each handler takes a [`Dialog`] by value,
//! returns the advanced record plus the event to publish, and never touches
//! the store. The store commits the result only on success, which is what
//! makes request rejection atomic.
//!
//! [`Dialog`]: crate::dialog::Dialog

pub mod request;
pub mod response;

use rand::Rng;

use ferrosip_sip_core::SipError;

use crate::config::DialogConfig;

/// The 500 + Retry-After rejection used when a transaction on the usage is
/// still in progress (RFC 3261 §14.1 wire format).
pub(crate) fn retry_busy(config: &DialogConfig) -> SipError {
    SipError::Retry {
        after: rand::thread_rng().gen_range(0..=config.retry_after_max),
        reason: "Processing Previous INVITE".to_string(),
    }
}
