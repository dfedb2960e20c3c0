//! Dialog termination tests
//!
//! BYE teardown with caller/callee attribution, RFC 5057 dialog-ending
//! codes, 481 against the invite usage, and the terminal nature of a stop.

use std::str::FromStr;
use std::sync::{Arc, Mutex};

use ferrosip_dialog_core::{
    Dialog, DialogConfig, DialogEvent, DialogSink, DialogStore, InviteStatus, StopReason,
};
use ferrosip_sip_core::{Method, Request, Response, Sdp, SipError, Uri};

const SDP_A: &str = "v=0\r\no=alice 1 1 IN IP4 10.0.0.1\r\ns=-\r\n";

/// Sink recording every published event.
struct RecordingSink {
    events: Mutex<Vec<DialogEvent>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(RecordingSink { events: Mutex::new(Vec::new()) })
    }

    fn events(&self) -> Vec<DialogEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl DialogSink for RecordingSink {
    fn on_event(&self, _dialog: &Dialog, event: &DialogEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn request(method: Method, cseq: u32, to_tag: Option<&str>, from_tag: &str) -> Request {
    Request::new(method, Uri::from_str("sip:bob@ua.example.net").unwrap())
        .with_call_id("bye-call-1")
        .with_from(Uri::from_str("sip:alice@example.com").unwrap(), from_tag)
        .with_to(Uri::from_str("sip:bob@example.com").unwrap(), to_tag)
        .with_cseq(cseq)
}

async fn confirmed_dialog(store: &DialogStore) -> Dialog {
    let req = request(Method::Invite, 1, None, "tag-alice").with_body(Sdp::from(SDP_A));
    let dialog = store.process_request(&req).await.unwrap().unwrap();
    let resp = Response::new(200, &req).with_to_tag(dialog.local_tag.clone());
    store.process_response(&req, &resp).await.unwrap();
    store
        .process_request(&request(Method::Ack, 1, Some(&dialog.local_tag), "tag-alice"))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn test_caller_bye_stops_dialog() {
    let sink = RecordingSink::new();
    let store = DialogStore::new(DialogConfig::default()).with_sink(sink.clone());
    let dialog = confirmed_dialog(&store).await;

    let bye = request(Method::Bye, 2, Some(&dialog.local_tag), "tag-alice");
    let dialog = store.process_request(&bye).await.unwrap().unwrap();
    assert_eq!(dialog.invite.as_ref().unwrap().status, InviteStatus::Bye);

    let resp = Response::new(200, &bye).with_to_tag(dialog.local_tag.clone());
    store.process_response(&bye, &resp).await.unwrap();

    assert!(store.is_empty());
    assert!(sink
        .events()
        .contains(&DialogEvent::Stop(StopReason::CallerBye)));
}

#[tokio::test]
async fn test_callee_bye_reported_as_callee() {
    let sink = RecordingSink::new();
    let store = DialogStore::new(DialogConfig::default()).with_sink(sink.clone());
    let mut dialog = confirmed_dialog(&store).await;

    // Make this side the initiator; the peer's BYE is then a callee BYE.
    dialog.caller_tag = dialog.local_tag.clone();
    store.update(None, dialog.clone());

    let bye = request(Method::Bye, 2, Some(&dialog.local_tag), "tag-alice");
    store.process_request(&bye).await.unwrap();
    let resp = Response::new(200, &bye).with_to_tag(dialog.local_tag.clone());
    store.process_response(&bye, &resp).await.unwrap();

    assert!(store.is_empty());
    assert!(sink
        .events()
        .contains(&DialogEvent::Stop(StopReason::CalleeBye)));
}

#[tokio::test]
async fn test_dialog_ending_code_stops_dialog() {
    for code in [404u16, 410, 416, 482, 483, 484, 485, 502, 604] {
        let sink = RecordingSink::new();
        let store = DialogStore::new(DialogConfig::default()).with_sink(sink.clone());
        let dialog = confirmed_dialog(&store).await;

        // Any method: an in-dialog UPDATE answered with a killer code.
        let update = request(Method::Update, 2, Some(&dialog.local_tag), "tag-alice");
        store.process_request(&update).await.unwrap();
        let resp = Response::new(code, &update).with_to_tag(dialog.local_tag.clone());
        store.process_response(&update, &resp).await.unwrap();

        assert!(store.is_empty(), "code {code} did not stop the dialog");
        assert!(sink
            .events()
            .contains(&DialogEvent::Stop(StopReason::Code(code))));
    }
}

#[tokio::test]
async fn test_481_stops_invite_usage() {
    let sink = RecordingSink::new();
    let store = DialogStore::new(DialogConfig::default()).with_sink(sink.clone());
    let dialog = confirmed_dialog(&store).await;

    let update = request(Method::Update, 2, Some(&dialog.local_tag), "tag-alice");
    store.process_request(&update).await.unwrap();
    let resp = Response::new(481, &update).with_to_tag(dialog.local_tag.clone());
    store.process_response(&update, &resp).await.unwrap();

    // No subscription usages were holding the dialog up, so it is gone.
    assert!(store.is_empty());
    assert!(sink
        .events()
        .contains(&DialogEvent::Stop(StopReason::Code(481))));
}

#[tokio::test]
async fn test_481_spares_dialog_with_subscriptions() {
    let store = DialogStore::new(DialogConfig::default());
    let mut dialog = confirmed_dialog(&store).await;
    dialog.event_usages = 1;
    store.update(None, dialog.clone());

    let update = request(Method::Update, 2, Some(&dialog.local_tag), "tag-alice");
    store.process_request(&update).await.unwrap();
    let resp = Response::new(481, &update).with_to_tag(dialog.local_tag.clone());
    store.process_response(&update, &resp).await.unwrap();

    let stored = store.find(&dialog.id).unwrap();
    assert!(stored.invite.is_none());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_stop_is_terminal() {
    let store = DialogStore::new(DialogConfig::default());
    let dialog = confirmed_dialog(&store).await;

    let bye = request(Method::Bye, 2, Some(&dialog.local_tag), "tag-alice");
    store.process_request(&bye).await.unwrap();
    let resp = Response::new(200, &bye).with_to_tag(dialog.local_tag.clone());
    store.process_response(&bye, &resp).await.unwrap();
    assert!(store.find(&dialog.id).is_none());

    // Non-ACK requests for the stopped dialog fail; ACKs are absorbed.
    let update = request(Method::Update, 3, Some(&dialog.local_tag), "tag-alice");
    assert_eq!(
        store.process_request(&update).await.unwrap_err(),
        SipError::NoTransaction
    );
    let ack = request(Method::Ack, 1, Some(&dialog.local_tag), "tag-alice");
    assert!(store.process_request(&ack).await.unwrap().is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_final_before_answer_stops_dialog() {
    let store = DialogStore::new(DialogConfig::default());
    let req = request(Method::Invite, 1, None, "tag-alice").with_body(Sdp::from(SDP_A));
    let dialog = store.process_request(&req).await.unwrap().unwrap();

    let resp = Response::new(486, &req).with_to_tag(dialog.local_tag.clone());
    store.process_response(&req, &resp).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_failed_reinvite_after_answer_keeps_dialog() {
    let store = DialogStore::new(DialogConfig::default());
    let dialog = confirmed_dialog(&store).await;

    let reinvite = request(Method::Invite, 2, Some(&dialog.local_tag), "tag-alice")
        .with_body(Sdp::from(SDP_A));
    let dialog = store.process_request(&reinvite).await.unwrap().unwrap();
    let resp = Response::new(488, &reinvite).with_to_tag(dialog.local_tag.clone());
    let dialog = store.process_response(&reinvite, &resp).await.unwrap().unwrap();

    // The dialog survives in confirmed with the failed exchange cleared.
    let inv = dialog.invite.as_ref().unwrap();
    assert_eq!(inv.status, InviteStatus::Confirmed);
    assert!(inv.sdp_offer.is_none());
    assert!(inv.sdp_answer.is_none());
    assert_eq!(store.len(), 1);
}
