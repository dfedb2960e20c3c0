//! Configuration for dialog processing
//!
//! One small struct; the interesting knobs are the Retry-After ceiling used
//! for glare rejections and the stable Contact advertised for dialogs this
//! side terminates.

use ferrosip_sip_core::Uri;

/// Configuration for the dialog engine
#[derive(Debug, Clone)]
pub struct DialogConfig {
    /// Upper bound (inclusive, seconds) for the randomized `Retry-After`
    /// carried on 500 glare rejections. RFC 3261 §14.1 suggests 0–10.
    pub retry_after_max: u32,

    /// Stable Contact URI used as `local_target` for dialogs created on
    /// this side. Falls back to the request URI when unset.
    pub local_contact: Option<Uri>,
}

impl Default for DialogConfig {
    fn default() -> Self {
        DialogConfig {
            retry_after_max: 10,
            local_contact: None,
        }
    }
}

impl DialogConfig {
    pub fn with_local_contact(mut self, contact: Uri) -> Self {
        self.local_contact = Some(contact);
        self
    }

    pub fn with_retry_after_max(mut self, max: u32) -> Self {
        self.retry_after_max = max;
        self
    }
}
