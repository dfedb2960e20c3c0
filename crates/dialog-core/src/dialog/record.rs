//! The per-dialog record
//!
//! One [`Dialog`] per RFC 3261 dialog, keyed by [`DialogId`]. The record is
//! a plain value: the machine works on a clone and the store commits it only
//! when processing succeeds, so a rejected request never leaves partial
//! state behind.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ferrosip_sip_core::{Aor, DialogId, Request, Response, Uri};

use crate::config::DialogConfig;
use crate::dialog::state::InviteState;

/// A SIP dialog as seen from this side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: DialogId,
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: String,
    pub aor_local: Aor,
    pub aor_remote: Aor,
    /// CSeq of the last request this side sent; 0 = none yet.
    pub local_seq: u32,
    /// CSeq of the last non-ACK request accepted from the peer; 0 = none.
    pub remote_seq: u32,
    /// This side's stable Contact.
    pub local_target: Uri,
    /// From-tag of the party that initiated the dialog; distinguishes
    /// caller-BYE from callee-BYE at teardown.
    pub caller_tag: String,
    pub route_set: Vec<Uri>,
    /// The invite usage, when one exists.
    pub invite: Option<InviteState>,
    /// Number of live subscription usages owned by the event collaborator.
    /// The dialog outlives its invite usage while this is nonzero.
    pub event_usages: usize,
}

impl Dialog {
    /// Create a UAS dialog from an initial request, minting the local tag.
    ///
    /// The request has no To tag yet; the generated tag must be carried on
    /// every response the application sends for this dialog.
    pub fn new_uas(req: &Request, config: &DialogConfig) -> Self {
        let local_tag = Uuid::new_v4().simple().to_string();
        Dialog::build_uas(req, local_tag, config)
    }

    /// Create a UAS dialog from a request/response pair, e.g. when the first
    /// thing the store observes for this dialog is the response being sent.
    pub fn new_uas_from_response(req: &Request, resp: &Response, config: &DialogConfig) -> Self {
        let local_tag = resp.to_tag.clone().unwrap_or_default();
        Dialog::build_uas(req, local_tag, config)
    }

    fn build_uas(req: &Request, local_tag: String, config: &DialogConfig) -> Self {
        let local_target = config
            .local_contact
            .clone()
            .unwrap_or_else(|| req.uri.clone());
        Dialog {
            id: DialogId::new(req.call_id.clone(), local_tag.clone(), req.from_tag.clone()),
            call_id: req.call_id.clone(),
            local_tag,
            remote_tag: req.from_tag.clone(),
            aor_local: Aor::from_uri(&req.to_uri),
            aor_remote: Aor::from_uri(&req.from_uri),
            local_seq: 0,
            remote_seq: 0,
            local_target,
            // The peer sent the dialog-forming request, so the peer is the caller.
            caller_tag: req.from_tag.clone(),
            // RFC 3261 §12.1.1: the UAS route set is the Record-Route list in order.
            route_set: req.record_route.clone(),
            invite: None,
            event_usages: 0,
        }
    }

    /// Whether the From tag of a message identifies the dialog's initiator.
    pub fn is_caller(&self, from_tag: &str) -> bool {
        !self.caller_tag.is_empty() && self.caller_tag == from_tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrosip_sip_core::{Method, Uri};
    use std::str::FromStr;

    fn invite_req() -> Request {
        Request::new(Method::Invite, Uri::from_str("sip:bob@ua.example.net").unwrap())
            .with_call_id("call-1")
            .with_from(Uri::from_str("sip:alice@example.com").unwrap(), "tag-a")
            .with_to(Uri::from_str("sip:bob@example.com").unwrap(), None)
            .with_cseq(1)
    }

    #[test]
    fn test_new_uas_mints_local_tag() {
        let dialog = Dialog::new_uas(&invite_req(), &DialogConfig::default());
        assert!(!dialog.local_tag.is_empty());
        assert_eq!(dialog.remote_tag, "tag-a");
        assert_eq!(dialog.caller_tag, "tag-a");
        assert_eq!(dialog.id.call_id, "call-1");
        assert_eq!(dialog.aor_remote.user, "alice");
        assert_eq!(dialog.aor_local.user, "bob");
        assert!(dialog.invite.is_none());
    }

    #[test]
    fn test_local_target_prefers_configured_contact() {
        let contact = Uri::from_str("sip:uas@10.0.0.1:5060").unwrap();
        let config = DialogConfig::default().with_local_contact(contact.clone());
        let dialog = Dialog::new_uas(&invite_req(), &config);
        assert_eq!(dialog.local_target, contact);

        let dialog = Dialog::new_uas(&invite_req(), &DialogConfig::default());
        assert_eq!(dialog.local_target.host, "ua.example.net");
    }

    #[test]
    fn test_caller_tag_match() {
        let dialog = Dialog::new_uas(&invite_req(), &DialogConfig::default());
        assert!(dialog.is_caller("tag-a"));
        assert!(!dialog.is_caller("tag-b"));
        assert!(!dialog.is_caller(""));
    }
}
