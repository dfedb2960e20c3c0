//! Core SIP types shared across the ferrosip workspace

pub mod aor;
pub mod dialog_id;
pub mod message;
pub mod method;
pub mod uri;

pub use aor::Aor;
pub use dialog_id::DialogId;
pub use message::{Contact, Request, Response, Sdp, TransportInfo, TransportKind};
pub use method::Method;
pub use uri::{Param, Scheme, Uri};
