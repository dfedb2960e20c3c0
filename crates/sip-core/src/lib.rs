//! # ferrosip-sip-core
//!
//! Shared SIP data model for the ferrosip stack.
//!
//! This crate holds the typed surface the dialog and registrar engines
//! consume: URIs, addresses-of-record, the request/response records handed
//! over by the transport and transaction layers, dialog identifiers, and the
//! common error taxonomy mapped to SIP status codes.
//!
//! Full message parsing and serialization live outside this workspace; the
//! types here are populated by those collaborators and treated as ground
//! truth. SDP bodies are opaque blobs carrying only identity; RFC 3264
//! negotiation state is tracked per dialog by `ferrosip-dialog-core`, never
//! per media line.
//!
//! ## Structure
//!
//! - [`types::uri`]: [`Uri`], [`Scheme`] and [`Param`] with a nom-based
//!   grammar for the subset of RFC 3261 URI syntax the stack manipulates
//! - [`types::aor`]: [`Aor`], the `(scheme, user, domain)` registration key
//! - [`types::message`]: [`Request`], [`Response`], [`Contact`] and the
//!   transport coordinates attached to inbound messages
//! - [`types::dialog_id`]: [`DialogId`] derived from Call-ID plus tags
//! - [`error`]: [`SipError`] and its mapping to SIP reply status lines

pub mod error;
pub mod types;

pub use error::{SipError, SipResult, DIALOG_ENDING_CODES};
pub use types::aor::Aor;
pub use types::dialog_id::DialogId;
pub use types::message::{Contact, Request, Response, Sdp, TransportInfo, TransportKind};
pub use types::method::Method;
pub use types::uri::{Param, Scheme, Uri};

/// Commonly used imports for downstream crates.
pub mod prelude {
    pub use crate::error::{SipError, SipResult, DIALOG_ENDING_CODES};
    pub use crate::types::aor::Aor;
    pub use crate::types::dialog_id::DialogId;
    pub use crate::types::message::{
        Contact, Request, Response, Sdp, TransportInfo, TransportKind,
    };
    pub use crate::types::method::Method;
    pub use crate::types::uri::{Param, Scheme, Uri};
}
