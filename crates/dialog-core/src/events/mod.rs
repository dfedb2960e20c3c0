//! Dialog events and collaborator seams
//!
//! The store publishes a [`DialogEvent`] for every notable transition
//! through a [`DialogSink`]. Event-package processing (RFC 6665) and
//! session timers (RFC 4028) are outside this crate; they plug in through
//! [`DialogEvents`] and [`SessionTimers`], with no-op defaults for
//! applications that use neither.

use serde::{Deserialize, Serialize};

use ferrosip_sip_core::{Request, Response, SipResult};

use crate::dialog::{Dialog, Role, StopReason};

/// Notable dialog transitions, published through [`DialogSink`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DialogEvent {
    /// Dialog record created
    Created,
    /// A 2xx was sent for the invite usage; waiting for ACK
    Accepted,
    /// ACK received; the invite usage is established
    Confirmed,
    /// A PRACK carried or answered an offer
    Prack,
    /// An UPDATE exchange completed
    Update { class: Role },
    /// A subscription usage advanced
    Subscribe,
    /// A notification advanced a subscription usage
    Notify,
    /// BYE received; teardown pending
    Bye,
    /// The invite usage was destroyed but the dialog survives on its
    /// remaining subscription usages
    InviteStopped { code: u16 },
    /// Terminal: the dialog is removed from the store
    Stop(StopReason),
}

impl DialogEvent {
    pub fn is_stop(&self) -> bool {
        matches!(self, DialogEvent::Stop(_))
    }
}

/// Receiver for dialog events
///
/// Fired synchronously from the store's single `update` write path, after
/// the dialog has been persisted (or removed, for stops).
pub trait DialogSink: Send + Sync {
    fn on_event(&self, dialog: &Dialog, event: &DialogEvent);
}

/// Sink that drops every event.
pub struct NullSink;

impl DialogSink for NullSink {
    fn on_event(&self, _dialog: &Dialog, _event: &DialogEvent) {}
}

/// Event-package collaborator (RFC 6665)
///
/// SUBSCRIBE, NOTIFY and REFER processing is delegated here; the
/// collaborator owns the subscription records and reports how many usages
/// keep the dialog alive via `Dialog::event_usages`.
pub trait DialogEvents: Send + Sync {
    /// Process a subscription-related request inside a dialog.
    fn uas_request(&self, req: &Request, dialog: Dialog) -> SipResult<Dialog>;

    /// Process the response sent for a subscription-related request.
    fn uas_response(&self, req: &Request, resp: &Response, dialog: Dialog) -> Dialog;

    /// Whether an out-of-dialog NOTIFY matches a subscription known to the
    /// collaborator (forked-subscription case).
    fn matches_subscription(&self, _req: &Request) -> bool {
        false
    }
}

/// Collaborator that accepts subscription traffic without tracking it.
pub struct NoEvents;

impl DialogEvents for NoEvents {
    fn uas_request(&self, _req: &Request, dialog: Dialog) -> SipResult<Dialog> {
        Ok(dialog)
    }

    fn uas_response(&self, _req: &Request, _resp: &Response, dialog: Dialog) -> Dialog {
        dialog
    }
}

/// Session-timer collaborator (RFC 4028)
///
/// Invoked by the response decorator for 2xx INVITE/UPDATE responses to
/// attach `Session-Expires`/`Min-SE`.
pub trait SessionTimers: Send + Sync {
    fn uas_update_timer(&self, req: &Request, resp: Response) -> Response;
}

/// Timer collaborator that returns the response unchanged.
pub struct NoSessionTimers;

impl SessionTimers for NoSessionTimers {
    fn uas_update_timer(&self, _req: &Request, resp: Response) -> Response {
        resp
    }
}
