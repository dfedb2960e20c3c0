//! Registrar configuration

use std::time::Duration;

/// Configuration for one registrar application
#[derive(Debug, Clone)]
pub struct RegistrarConfig {
    /// Application identity; part of every store key so several registrar
    /// instances can share one backend.
    pub app_id: String,

    /// Expiry applied when neither the request nor the contact names one.
    pub default_expires: u32,

    /// Registrations in (0, 3600) below this are rejected with 423.
    pub min_expires: u32,

    /// Registrations above this are clamped down, never rejected.
    pub max_expires: u32,

    /// Option tags this application supports; `outbound` and `gruu`
    /// processing only engage when both sides advertise them.
    pub supported: Vec<String>,

    /// Hard deadline for a store callback; elapse is a callback error.
    pub store_timeout: Duration,

    /// Floor for the per-AOR TTL hint handed to the store.
    pub min_ttl: u64,
}

impl Default for RegistrarConfig {
    fn default() -> Self {
        RegistrarConfig {
            app_id: "registrar".to_string(),
            default_expires: 3600,
            min_expires: 60,
            max_expires: 86400,
            supported: vec![
                "path".to_string(),
                "outbound".to_string(),
                "gruu".to_string(),
            ],
            store_timeout: Duration::from_secs(15),
            min_ttl: 5,
        }
    }
}

impl RegistrarConfig {
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn with_expires(mut self, default: u32, min: u32, max: u32) -> Self {
        self.default_expires = default;
        self.min_expires = min;
        self.max_expires = max;
        self
    }

    pub fn with_supported(mut self, tags: &[&str]) -> Self {
        self.supported = tags.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Whether this application advertises the given option tag.
    pub fn supports(&self, option: &str) -> bool {
        self.supported.iter().any(|s| s.eq_ignore_ascii_case(option))
    }
}
