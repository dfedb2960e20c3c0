//! Error taxonomy shared by the dialog and registrar engines
//!
//! Every rejection either engine produces is one of the [`SipError`] kinds
//! below, each with a fixed mapping to a SIP status line. The transaction
//! layer turns them into replies via [`SipError::to_response`].
//!
//! The dialog-ending status codes of RFC 5057 §5.2 live here as well: they
//! terminate the whole dialog no matter which method carried them.

use thiserror::Error;

use crate::types::message::{Request, Response};

/// A type alias for handling `Result`s with [`SipError`]
pub type SipResult<T> = std::result::Result<T, SipError>;

/// Status codes that destroy the dialog they arrive on (RFC 5057 §5.2).
pub const DIALOG_ENDING_CODES: [u16; 9] = [404, 410, 416, 482, 483, 484, 485, 502, 604];

/// Rejections surfaced as SIP replies or control-flow faults
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SipError {
    /// Request has no matching dialog or ACK target (481)
    #[error("no matching dialog or transaction")]
    NoTransaction,

    /// Offer/answer glare: an SDP exchange is already pending (491)
    #[error("request pending: offer/answer exchange in progress")]
    RequestPending,

    /// Transient busy; the peer should retry after the given delay (500)
    #[error("retry after {after}s: {reason}")]
    Retry {
        /// Seconds the peer should wait before retrying
        after: u32,
        /// Reason phrase carried on the 500 reply
        reason: String,
    },

    /// CSeq regression, store failure or other internal fault (500)
    #[error("internal error: {0}")]
    Internal(String),

    /// Malformed REGISTER: multiple reg-ids, bad path, replayed CSeq (400)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Registration expiry below the configured minimum (423)
    #[error("registration interval too brief, minimum {0}s")]
    IntervalTooBrief(u32),

    /// REGISTER To-URI is neither sip nor sips (416)
    #[error("unsupported URI scheme")]
    UnsupportedUriScheme,

    /// reg-id present but the first hop did not negotiate outbound (439)
    #[error("first hop lacks outbound support")]
    FirstHopLacksOutbound,

    /// Self-looping Contact or invalid GRUU (403)
    #[error("forbidden: {0}")]
    Forbidden(String),
}

impl SipError {
    /// The SIP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            SipError::NoTransaction => 481,
            SipError::RequestPending => 491,
            SipError::Retry { .. } => 500,
            SipError::Internal(_) => 500,
            SipError::InvalidRequest(_) => 400,
            SipError::IntervalTooBrief(_) => 423,
            SipError::UnsupportedUriScheme => 416,
            SipError::FirstHopLacksOutbound => 439,
            SipError::Forbidden(_) => 403,
        }
    }

    /// Reason phrase for the reply status line.
    ///
    /// `Retry` carries its own phrase (e.g. "Processing Previous INVITE");
    /// everything else uses the conventional RFC 3261/5626 wording.
    pub fn reason_phrase(&self) -> String {
        match self {
            SipError::NoTransaction => "Call/Transaction Does Not Exist".into(),
            SipError::RequestPending => "Request Pending".into(),
            SipError::Retry { reason, .. } => reason.clone(),
            SipError::Internal(_) => "Internal Server Error".into(),
            SipError::InvalidRequest(msg) => msg.clone(),
            SipError::IntervalTooBrief(_) => "Interval Too Brief".into(),
            SipError::UnsupportedUriScheme => "Unsupported URI Scheme".into(),
            SipError::FirstHopLacksOutbound => "First Hop Lacks Outbound Support".into(),
            SipError::Forbidden(msg) => msg.clone(),
        }
    }

    /// Build the wire reply for this error in answer to `req`.
    ///
    /// `Retry` sets `Retry-After`, `IntervalTooBrief` sets `Min-Expires`;
    /// the body is always empty.
    pub fn to_response(&self, req: &Request) -> Response {
        let mut resp = Response::new(self.status_code(), req);
        resp.reason = Some(self.reason_phrase());
        match self {
            SipError::Retry { after, .. } => resp.retry_after = Some(*after),
            SipError::IntervalTooBrief(min) => resp.min_expires = Some(*min),
            _ => {}
        }
        resp
    }
}

/// Whether `code` terminates the dialog it arrives on (RFC 5057 §5.2).
pub fn is_dialog_ending(code: u16) -> bool {
    DIALOG_ENDING_CODES.contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(SipError::NoTransaction.status_code(), 481);
        assert_eq!(SipError::RequestPending.status_code(), 491);
        assert_eq!(
            SipError::Retry { after: 7, reason: "Processing Previous INVITE".into() }
                .status_code(),
            500
        );
        assert_eq!(SipError::IntervalTooBrief(120).status_code(), 423);
        assert_eq!(SipError::FirstHopLacksOutbound.status_code(), 439);
        assert_eq!(SipError::UnsupportedUriScheme.status_code(), 416);
    }

    #[test]
    fn test_dialog_ending_codes() {
        for code in DIALOG_ENDING_CODES {
            assert!(is_dialog_ending(code));
        }
        assert!(!is_dialog_ending(481));
        assert!(!is_dialog_ending(500));
        assert!(!is_dialog_ending(200));
    }
}
