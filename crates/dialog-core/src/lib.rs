//! # ferrosip-dialog-core
//!
//! Server-side (UAS) dialog state machine for the ferrosip stack.
//!
//! This crate advances per-dialog state records in response to SIP requests
//! and responses for INVITE, ACK, BYE, PRACK, UPDATE, SUBSCRIBE, NOTIFY and
//! REFER, maintains the RFC 3264 offer/answer sub-state, and enforces CSeq
//! ordering and glare rules.
//!
//! ## Structure
//!
//! - [`dialog`]: the [`Dialog`] record, its [`InviteState`] sub-record and
//!   lifecycle enums
//! - [`sdp`]: the offer/answer slot model (`{origin, carrier, body}`)
//! - [`machine`]: the per-method request and response handlers
//! - [`store`]: the in-process dialog map with the single `update` write
//!   path and per-call serialization
//! - [`events`]: collaborator seams (event packages, session timers) and the
//!   [`DialogEvent`] stream
//! - [`decorator`]: outgoing-response decoration (dialog id, Contact,
//!   session timer)
//!
//! ## Dialog lifecycle (UAS)
//!
//! ```text
//! INVITE recv'd          2xx sent             ACK recv'd
//!   confirmed* ──────► proceeding_uas ──► accepted_uas ──► confirmed
//!                                                            │ BYE
//!                                                            ▼
//!                                                           bye
//! ```
//!
//! `confirmed*` is the synthetic neutral state a fresh invite record starts
//! in; the first INVITE immediately drives it to `proceeding_uas`.
//!
//! State transitions never mutate on failure: a rejected request leaves the
//! stored dialog exactly as it was.

pub mod config;
pub mod decorator;
pub mod dialog;
pub mod events;
pub mod machine;
pub mod sdp;
pub mod store;

pub use config::DialogConfig;
pub use decorator::{decorate_uas_response, ResponseOptions};
pub use dialog::{Dialog, InviteState, InviteStatus, Role, StopReason};
pub use events::{
    DialogEvent, DialogEvents, DialogSink, NoEvents, NoSessionTimers, NullSink, SessionTimers,
};
pub use sdp::{SdpCarrier, SdpOrigin, SdpSlot};
pub use store::DialogStore;
