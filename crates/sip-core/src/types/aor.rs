//! # Address of Record
//!
//! The `(scheme, user, domain)` triple identifying a registered user
//! (RFC 3261 §10). Port, parameters and display name are deliberately not
//! part of the identity: two URIs differing only in those bind to the same
//! record.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SipError;
use crate::types::uri::{Scheme, Uri};

/// Address-of-Record: the canonical identity a registration binds contacts to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aor {
    pub scheme: Scheme,
    pub user: String,
    pub domain: String,
}

impl Aor {
    pub fn new(scheme: Scheme, user: impl Into<String>, domain: impl Into<String>) -> Self {
        Aor { scheme, user: user.into(), domain: domain.into() }
    }

    /// Derive the AOR from a URI, dropping port and parameters.
    ///
    /// The user part may be empty (some deployments register bare domains);
    /// the scheme is preserved as-is so callers can apply their own scheme
    /// policy.
    pub fn from_uri(uri: &Uri) -> Self {
        Aor {
            scheme: uri.scheme.clone(),
            user: uri.user.clone().unwrap_or_default(),
            domain: uri.host.clone(),
        }
    }

    /// Reject AORs whose scheme is not `sip`/`sips` (RFC 3261 §10.3 step 5).
    pub fn check_scheme(&self) -> Result<(), SipError> {
        if self.scheme.is_sip() {
            Ok(())
        } else {
            Err(SipError::UnsupportedUriScheme)
        }
    }

    /// The plain URI form of this AOR.
    pub fn to_uri(&self) -> Uri {
        let mut uri = Uri::sip(self.domain.clone());
        uri.scheme = self.scheme.clone();
        if !self.user.is_empty() {
            uri.user = Some(self.user.clone());
        }
        uri
    }
}

impl fmt::Display for Aor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.user.is_empty() {
            write!(f, "{}:{}", self.scheme, self.domain)
        } else {
            write!(f, "{}:{}@{}", self.scheme, self.user, self.domain)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_aor_ignores_port_and_params() {
        let a = Aor::from_uri(&Uri::from_str("sip:alice@example.com:5060;transport=udp").unwrap());
        let b = Aor::from_uri(&Uri::from_str("sip:alice@example.com").unwrap());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "sip:alice@example.com");
    }

    #[test]
    fn test_scheme_check() {
        let sip = Aor::new(Scheme::Sip, "a", "x.org");
        let tel = Aor::new(Scheme::Tel, "a", "x.org");
        assert!(sip.check_scheme().is_ok());
        assert_eq!(tel.check_scheme(), Err(SipError::UnsupportedUriScheme));
    }
}
