//! Response decorator tests
//!
//! Dialog-id stamping, Contact synthesis from the dialog's local target,
//! and the session-timer hook for 2xx INVITE/UPDATE.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use ferrosip_dialog_core::{
    decorate_uas_response, DialogConfig, DialogStore, NoSessionTimers, ResponseOptions,
    SessionTimers,
};
use ferrosip_sip_core::{Contact, DialogId, Method, Request, Response, Sdp, Uri};

struct CountingTimers {
    calls: AtomicUsize,
}

impl SessionTimers for CountingTimers {
    fn uas_update_timer(&self, _req: &Request, mut resp: Response) -> Response {
        self.calls.fetch_add(1, Ordering::SeqCst);
        resp.require.push("timer".to_string());
        resp
    }
}

fn invite() -> Request {
    Request::new(Method::Invite, Uri::from_str("sip:bob@ua.example.net").unwrap())
        .with_call_id("deco-call-1")
        .with_from(Uri::from_str("sip:alice@example.com").unwrap(), "tag-alice")
        .with_to(Uri::from_str("sip:bob@example.com").unwrap(), None)
        .with_cseq(1)
        .with_body(Sdp::from("v=0\r\n"))
}

#[tokio::test]
async fn test_dialog_id_and_contact_attached() {
    let contact = Uri::from_str("sip:bob@10.0.0.2:5060").unwrap();
    let config = DialogConfig::default().with_local_contact(contact.clone());
    let store = DialogStore::new(config);

    let req = invite();
    let dialog = store.process_request(&req).await.unwrap().unwrap();

    let mut resp = Response::new(200, &req).with_to_tag(dialog.local_tag.clone());
    let mut options = ResponseOptions::default();
    decorate_uas_response(&store, &NoSessionTimers, Some(&req), &mut resp, &mut options);

    assert_eq!(
        resp.dialog_id,
        Some(DialogId::new("deco-call-1", dialog.local_tag.clone(), "tag-alice"))
    );
    assert_eq!(resp.contacts, vec![Contact::new(contact)]);
    assert!(!options.make_contact);
}

#[tokio::test]
async fn test_existing_contact_kept() {
    let store = DialogStore::new(DialogConfig::default());
    let req = invite();
    let dialog = store.process_request(&req).await.unwrap().unwrap();

    let supplied = Contact::new(Uri::from_str("sip:custom@198.51.100.7").unwrap());
    let mut resp = Response::new(200, &req)
        .with_to_tag(dialog.local_tag.clone())
        .with_contact(supplied.clone());
    let mut options = ResponseOptions::default();
    decorate_uas_response(&store, &NoSessionTimers, Some(&req), &mut resp, &mut options);

    assert_eq!(resp.contacts, vec![supplied]);
    assert!(options.make_contact);
}

#[tokio::test]
async fn test_session_timer_invoked_for_2xx_invite() {
    let store = DialogStore::new(DialogConfig::default());
    let req = invite();
    let dialog = store.process_request(&req).await.unwrap().unwrap();
    let timers = CountingTimers { calls: AtomicUsize::new(0) };

    let mut resp = Response::new(200, &req).with_to_tag(dialog.local_tag.clone());
    decorate_uas_response(&store, &timers, Some(&req), &mut resp, &mut ResponseOptions::default());
    assert_eq!(timers.calls.load(Ordering::SeqCst), 1);
    assert!(resp.require.contains(&"timer".to_string()));

    // Provisional responses do not hit the timer.
    let mut resp = Response::new(180, &req).with_to_tag(dialog.local_tag.clone());
    decorate_uas_response(&store, &timers, Some(&req), &mut resp, &mut ResponseOptions::default());
    assert_eq!(timers.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timer_skipped_without_request() {
    let store = DialogStore::new(DialogConfig::default());
    let req = invite();
    let dialog = store.process_request(&req).await.unwrap().unwrap();
    let timers = CountingTimers { calls: AtomicUsize::new(0) };

    // Multi-2xx replay path: no request available, timer step skipped.
    let mut resp = Response::new(200, &req).with_to_tag(dialog.local_tag.clone());
    decorate_uas_response(&store, &timers, None, &mut resp, &mut ResponseOptions::default());
    assert_eq!(timers.calls.load(Ordering::SeqCst), 0);
    assert!(resp.dialog_id.is_some());
}
