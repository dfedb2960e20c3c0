//! Core dialog types
//!
//! - [`Dialog`]: the per-dialog record (RFC 3261 §12 state plus the invite
//!   usage)
//! - [`InviteState`]: the invite sub-record with its offer/answer slots
//! - [`InviteStatus`], [`Role`], [`StopReason`]: lifecycle enums
//!
//! Dialogs are created and advanced through the [`DialogStore`](crate::store::DialogStore);
//! nothing here performs I/O.

pub mod record;
pub mod state;

pub use record::Dialog;
pub use state::{InviteState, InviteStatus, Role, StopReason};
