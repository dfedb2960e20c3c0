//! In-process dialog store
//!
//! Owns the `DialogId → Dialog` map and the two entry points the
//! transaction layer calls: [`DialogStore::process_request`] and
//! [`DialogStore::process_response`]. All writes funnel through
//! [`DialogStore::update`], which persists the record, fires the event
//! sink, and removes the dialog on terminal events.
//!
//! Handlers for the same call never run concurrently: each entry point
//! holds a per-call async mutex for the duration of the transition
//! (different calls proceed in parallel).

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use ferrosip_sip_core::{DialogId, Method, Request, Response, SipError, SipResult};

use crate::config::DialogConfig;
use crate::dialog::{Dialog, InviteState, InviteStatus, Role, StopReason};
use crate::events::{DialogEvent, DialogEvents, DialogSink, NoEvents, NullSink};
use crate::machine;
use crate::sdp::{SdpCarrier, SdpSlot};

/// The dialog store and state-machine driver
pub struct DialogStore {
    dialogs: DashMap<DialogId, Dialog>,
    call_guards: DashMap<String, Arc<Mutex<()>>>,
    config: DialogConfig,
    events: Arc<dyn DialogEvents>,
    sink: Arc<dyn DialogSink>,
}

impl DialogStore {
    pub fn new(config: DialogConfig) -> Self {
        DialogStore {
            dialogs: DashMap::new(),
            call_guards: DashMap::new(),
            config,
            events: Arc::new(NoEvents),
            sink: Arc::new(NullSink),
        }
    }

    /// Plug in the event-package collaborator.
    pub fn with_events(mut self, events: Arc<dyn DialogEvents>) -> Self {
        self.events = events;
        self
    }

    /// Plug in an event sink.
    pub fn with_sink(mut self, sink: Arc<dyn DialogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Snapshot of a stored dialog.
    pub fn find(&self, id: &DialogId) -> Option<Dialog> {
        self.dialogs.get(id).map(|d| d.clone())
    }

    pub fn len(&self) -> usize {
        self.dialogs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dialogs.is_empty()
    }

    /// The single write path: persist the dialog (or remove it on a stop
    /// event), then fire the sink.
    pub fn update(&self, event: Option<DialogEvent>, dialog: Dialog) -> Dialog {
        match &event {
            Some(e) if e.is_stop() => {
                self.dialogs.remove(&dialog.id);
                debug!(dialog_id = %dialog.id, event = ?e, "dialog stopped and removed");
            }
            _ => {
                self.dialogs.insert(dialog.id.clone(), dialog.clone());
            }
        }
        if let Some(e) = &event {
            self.sink.on_event(&dialog, e);
        }
        dialog
    }

    /// Terminal update with an RFC 5057 dialog-ending code.
    pub fn stop(&self, code: u16, dialog: Dialog) -> Dialog {
        self.update(Some(DialogEvent::Stop(StopReason::Code(code))), dialog)
    }

    /// Drive the state machine for an inbound request.
    ///
    /// Returns the committed dialog snapshot, or `None` when the request
    /// was absorbed without one (ACK retransmissions after teardown,
    /// forked-subscription NOTIFYs). Failures leave the store untouched.
    pub async fn process_request(&self, req: &Request) -> SipResult<Option<Dialog>> {
        let _guard = self.call_guard(&req.call_id).await;
        let id = DialogId::uas_from_request(req);

        if let Some(dialog) = self.find(&id) {
            let (dialog, event) =
                machine::request::uas_request(req, dialog, self.events.as_ref(), &self.config)?;
            return Ok(Some(self.update(event, dialog)));
        }

        match req.method {
            // A stopped (or never known) dialog absorbs ACK retransmissions.
            Method::Ack => {
                debug!(call_id = %req.call_id, "absorbing ACK without dialog");
                Ok(None)
            }
            Method::Invite if req.to_tag.is_none() => {
                let dialog = Dialog::new_uas(req, &self.config);
                debug!(dialog_id = %dialog.id, "creating dialog from initial INVITE");
                let (dialog, event) =
                    machine::request::uas_request(req, dialog, self.events.as_ref(), &self.config)?;
                let event = event.or(Some(DialogEvent::Created));
                Ok(Some(self.update(event, dialog)))
            }
            Method::Notify if self.events.matches_subscription(req) => {
                debug!(call_id = %req.call_id, "NOTIFY matches known subscription, delegating");
                Ok(None)
            }
            _ => Err(SipError::NoTransaction),
        }
    }

    /// Drive the state machine for an outgoing UAS response.
    ///
    /// A response for a dialog the store has never seen creates one when
    /// the method/status combination forms a dialog (INVITE 101–299,
    /// SUBSCRIBE/NOTIFY/REFER 2xx); anything else is passed through
    /// untouched.
    pub async fn process_response(
        &self,
        req: &Request,
        resp: &Response,
    ) -> SipResult<Option<Dialog>> {
        let _guard = self.call_guard(&resp.call_id).await;
        let id = DialogId::uas_from_response(resp);

        let (dialog, created) = match self.find(&id) {
            Some(dialog) => (dialog, false),
            None => match self.dialog_from_response(req, resp) {
                Some(dialog) => {
                    debug!(dialog_id = %dialog.id, code = resp.status, "creating dialog from response");
                    (dialog, true)
                }
                None => {
                    debug!(call_id = %resp.call_id, code = resp.status, "response without dialog, ignoring");
                    return Ok(None);
                }
            },
        };

        let (dialog, event) =
            machine::response::uas_response(req, resp, dialog, self.events.as_ref())?;
        let event = if created { event.or(Some(DialogEvent::Created)) } else { event };
        Ok(Some(self.update(event, dialog)))
    }

    /// A fresh dialog seeded from a dialog-forming response, with the
    /// invite usage primed so the response handler can re-enter.
    fn dialog_from_response(&self, req: &Request, resp: &Response) -> Option<Dialog> {
        let creating = match resp.method {
            Method::Invite => (101..300).contains(&resp.status),
            Method::Subscribe | Method::Notify | Method::Refer => resp.is_success(),
            _ => false,
        };
        if !creating || resp.to_tag.as_deref().unwrap_or("").is_empty() {
            return None;
        }

        let mut dialog = Dialog::new_uas_from_response(req, resp, &self.config);
        dialog.remote_seq = req.cseq;
        if resp.method == Method::Invite {
            let mut inv = InviteState::new(Role::Uas);
            inv.status = InviteStatus::ProceedingUas;
            inv.request = Some(req.clone());
            inv.sdp_offer = req
                .body
                .clone()
                .map(|b| SdpSlot::remote(SdpCarrier::Invite, b));
            dialog.invite = Some(inv);
        }
        Some(dialog)
    }

    async fn call_guard(&self, call_id: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .call_guards
            .entry(call_id.to_string())
            .or_default()
            .clone();
        mutex.lock_owned().await
    }
}
