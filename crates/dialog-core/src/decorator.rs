//! Outgoing UAS response decoration
//!
//! Runs just before a UAS response leaves the stack: stamps the dialog id,
//! synthesizes a Contact from the dialog's stable local target when the
//! application supplied none, and gives the session-timer collaborator its
//! chance to attach `Session-Expires`/`Min-SE` on 2xx INVITE/UPDATE.

use tracing::debug;

use ferrosip_sip_core::{Contact, DialogId, Method, Request, Response};

use crate::events::SessionTimers;
use crate::store::DialogStore;

/// Knobs the transaction layer passes alongside a response
#[derive(Debug, Clone)]
pub struct ResponseOptions {
    /// Whether the sender wants a Contact synthesized downstream. Cleared
    /// here when the dialog's local target is attached, so the contact is
    /// not minted twice.
    pub make_contact: bool,
}

impl Default for ResponseOptions {
    fn default() -> Self {
        ResponseOptions { make_contact: true }
    }
}

/// Decorate an outgoing UAS response in place.
///
/// `req` is the request being answered; it is absent when a 2xx is being
/// retransmitted standalone, in which case the session-timer step is
/// skipped.
pub fn decorate_uas_response(
    store: &DialogStore,
    timers: &dyn SessionTimers,
    req: Option<&Request>,
    resp: &mut Response,
    options: &mut ResponseOptions,
) {
    let dialog_id = DialogId::uas_from_response(resp);
    resp.dialog_id = Some(dialog_id.clone());

    if resp.contacts.is_empty() {
        if let Some(dialog) = store.find(&dialog_id) {
            resp.contacts = vec![Contact::new(dialog.local_target.clone())];
            options.make_contact = false;
        }
    }

    match req {
        Some(req)
            if resp.is_success()
                && matches!(resp.method, Method::Invite | Method::Update) =>
        {
            *resp = timers.uas_update_timer(req, resp.clone());
        }
        Some(_) => {}
        None => {
            debug!(dialog_id = %dialog_id, "no request for response, skipping session timer");
        }
    }
}
