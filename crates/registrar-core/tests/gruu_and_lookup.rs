//! GRUU minting/resolution and lookup tests
//!
//! Public and temporary GRUU lifecycle including invalidation on Call-ID
//! change, plus the qfind priority grouping and expiry filtering.

use std::str::FromStr;

use ferrosip_registrar_core::{Registrar, RegistrarConfig};
use ferrosip_sip_core::{Aor, Contact, Method, Request, Scheme, SipError, Uri};

const GLOBAL_ID: &[u8] = b"global-id-0123456789abcdef";

fn registrar() -> Registrar {
    Registrar::new(RegistrarConfig::default(), GLOBAL_ID).unwrap()
}

fn aor() -> Aor {
    Aor::new(Scheme::Sip, "alice", "example.com")
}

fn register(call_id: &str, cseq: u32, contacts: Vec<Contact>) -> Request {
    let mut req = Request::new(Method::Register, Uri::from_str("sip:example.com").unwrap())
        .with_call_id(call_id)
        .with_from(Uri::from_str("sip:alice@example.com").unwrap(), "tag-a")
        .with_to(Uri::from_str("sip:alice@example.com").unwrap(), None)
        .with_cseq(cseq)
        .with_supported(&["gruu", "outbound", "path"]);
    req.contacts = contacts;
    req
}

fn instanced_contact(uri: &str) -> Contact {
    Contact::new(Uri::from_str(uri).unwrap())
        .with_param("+sip.instance", Some("\"<urn:uuid:aaaa-bbbb>\""))
}

/// Extract the URI between the angle brackets of a stored gruu parameter.
fn gruu_uri(contact: &Contact, name: &str) -> Uri {
    let raw = contact.param_value(name).unwrap();
    let inner = raw.trim_matches('"');
    let inner = inner.strip_prefix('<').unwrap().strip_suffix('>').unwrap();
    Uri::from_str(inner).unwrap()
}

#[tokio::test]
async fn test_gruus_minted_for_instanced_contact() {
    let reg = registrar();
    let resp = reg
        .request(&register("gruu-call", 1, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();

    let stored = &resp.contacts[0];
    let pub_gruu = gruu_uri(stored, "pub-gruu");
    assert_eq!(pub_gruu.user.as_deref(), Some("alice"));
    assert_eq!(pub_gruu.host, "example.com");
    assert!(pub_gruu.param_value("gr").is_some());

    let temp_gruu = gruu_uri(stored, "temp-gruu");
    assert_eq!(temp_gruu.host, "example.com");
    assert!(temp_gruu.has_param("gr"));
    assert_eq!(temp_gruu.param_value("gr"), None);
    assert!(temp_gruu.user.is_some());
}

#[tokio::test]
async fn test_no_gruu_without_negotiation_or_instance() {
    let reg = registrar();

    // No +sip.instance: nothing to mint.
    let plain = Contact::new(Uri::from_str("sip:alice@10.0.0.1").unwrap());
    let resp = reg.request(&register("gruu-call", 1, vec![plain])).await.unwrap();
    assert!(resp.contacts[0].param_value("pub-gruu").is_none());

    // Instance present but the request does not advertise gruu support.
    let mut req = register("gruu-call", 2, vec![instanced_contact("sip:alice@10.0.0.2")]);
    req.supported = vec!["path".to_string()];
    let resp = reg.request(&req).await.unwrap();
    let stored = resp
        .contacts
        .iter()
        .find(|c| c.uri.host == "10.0.0.2")
        .unwrap();
    assert!(stored.param_value("pub-gruu").is_none());
    assert!(stored.param_value("temp-gruu").is_none());
}

#[tokio::test]
async fn test_sips_contact_cannot_take_gruu() {
    let reg = registrar();
    let secure = instanced_contact("sips:alice@10.0.0.1");
    let err = reg.request(&register("gruu-call", 1, vec![secure])).await.unwrap_err();
    assert_eq!(err, SipError::Forbidden("Invalid Contact".to_string()));
}

#[tokio::test]
async fn test_pub_gruu_resolves_to_instance_bindings() {
    let reg = registrar();
    let resp = reg
        .request(&register("gruu-call", 1, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();
    // A second binding without an instance should not appear in the fan-out.
    reg.request(&register(
        "gruu-call",
        2,
        vec![Contact::new(Uri::from_str("sip:alice@10.0.0.9").unwrap())],
    ))
    .await
    .unwrap();

    let pub_gruu = gruu_uri(&resp.contacts[0], "pub-gruu");
    let found = reg.find_uri(&pub_gruu).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].host, "10.0.0.1");
}

#[tokio::test]
async fn test_temp_gruu_resolves_and_dies_on_call_id_change() {
    let reg = registrar();
    let resp = reg
        .request(&register("gruu-call", 1, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();
    let old_temp = gruu_uri(&resp.contacts[0], "temp-gruu");

    // Resolves while the registration that minted it is current.
    let found = reg.find_uri(&old_temp).await.unwrap();
    assert_eq!(found.len(), 1);

    // Re-registration under the same Call-ID keeps it valid.
    let resp = reg
        .request(&register("gruu-call", 2, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();
    assert_eq!(reg.find_uri(&old_temp).await.unwrap().len(), 1);
    let newer_temp = gruu_uri(&resp.contacts[0], "temp-gruu");

    // A new Call-ID raises the invalidation floor: everything minted
    // before it stops resolving, the post-change mint still works.
    let resp = reg
        .request(&register("fresh-call", 1, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();
    assert!(reg.find_uri(&old_temp).await.unwrap().is_empty());
    assert!(reg.find_uri(&newer_temp).await.unwrap().is_empty());
    let current_temp = gruu_uri(&resp.contacts[0], "temp-gruu");
    assert_eq!(reg.find_uri(&current_temp).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_undecryptable_gruu_falls_back_to_aor() {
    let reg = registrar();
    reg.request(&register("gruu-call", 1, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();

    // "alice" is not valid ciphertext; the lookup falls back to treating
    // the URI as a plain AOR, which does resolve.
    let bogus = Uri::from_str("sip:alice@example.com;gr").unwrap();
    let found = reg.find_uri(&bogus).await.unwrap();
    assert_eq!(found.len(), 1, "fallback should reach the plain AOR search");
}

#[tokio::test]
async fn test_qfind_orders_by_q_then_age() {
    let reg = registrar();
    let c = |uri: &str, q: &str| {
        Contact::new(Uri::from_str(uri).unwrap()).with_param("q", Some(q))
    };
    // Bind in interleaved q order so age within a bucket matters.
    reg.request(&register("q-call", 1, vec![c("sip:alice@10.0.0.1", "0.5")])).await.unwrap();
    reg.request(&register("q-call", 2, vec![c("sip:alice@10.0.0.2", "1.0")])).await.unwrap();
    reg.request(&register("q-call", 3, vec![c("sip:alice@10.0.0.3", "0.5")])).await.unwrap();

    let groups = reg.qfind(&aor()).await.unwrap();
    assert_eq!(groups.len(), 2);
    // Highest preference first.
    assert_eq!(groups[0].len(), 1);
    assert_eq!(groups[0][0].host, "10.0.0.2");
    // Same q: the older binding leads.
    assert_eq!(groups[1].len(), 2);
    assert_eq!(groups[1][0].host, "10.0.0.1");
    assert_eq!(groups[1][1].host, "10.0.0.3");
}

#[tokio::test]
async fn test_expired_bindings_invisible() {
    let config = RegistrarConfig::default().with_expires(3600, 0, 86400);
    let reg = Registrar::new(config, GLOBAL_ID).unwrap();

    // An immediately-stale binding: expires=1 is legal with min_expires=0,
    // then we wait out the second.
    let brief = Contact::new(Uri::from_str("sip:alice@10.0.0.1").unwrap())
        .with_param("expires", Some("1"));
    reg.request(&register("ttl-call", 1, vec![brief])).await.unwrap();
    let lasting = Contact::new(Uri::from_str("sip:alice@10.0.0.2").unwrap());
    reg.request(&register("ttl-call", 2, vec![lasting])).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let found = reg.find(&aor()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].host, "10.0.0.2");
    let groups = reg.qfind(&aor()).await.unwrap();
    assert_eq!(groups.iter().map(Vec::len).sum::<usize>(), 1);
}

#[tokio::test]
async fn test_is_registered_matches_flow_and_uri() {
    use ferrosip_sip_core::{TransportInfo, TransportKind};

    let reg = registrar();
    // The REGISTER arrived over an ephemeral source port; the contact URI
    // advertises the well-known one.
    let reg_transport = TransportInfo::new(
        TransportKind::Udp,
        "203.0.113.9".parse().unwrap(),
        43210,
        "198.51.100.1".parse().unwrap(),
        5060,
    );
    let bound = Contact::new(Uri::from_str("sip:alice@203.0.113.9").unwrap());
    reg.request(&register("flow-call", 1, vec![bound]).with_transport(reg_transport))
        .await
        .unwrap();

    let probe = Request::new(Method::Invite, Uri::from_str("sip:bob@example.com").unwrap())
        .with_call_id("probe-1")
        .with_from(Uri::from_str("sip:alice@example.com").unwrap(), "tag-a")
        .with_to(Uri::from_str("sip:bob@example.com").unwrap(), None);

    // Same flow coordinates as the REGISTER: matched directly.
    assert!(reg.is_registered(&probe.clone().with_transport(reg_transport)).await);

    // New flow, but source coordinates equal the stored contact URI's
    // IP-literal coordinates: matched by the fallback.
    let from_contact_addr = TransportInfo::new(
        TransportKind::Udp,
        "203.0.113.9".parse().unwrap(),
        5060,
        "198.51.100.1".parse().unwrap(),
        5060,
    );
    assert!(reg.is_registered(&probe.clone().with_transport(from_contact_addr)).await);

    // Unrelated source: not registered.
    let stranger = TransportInfo::new(
        TransportKind::Udp,
        "203.0.113.77".parse().unwrap(),
        5060,
        "198.51.100.1".parse().unwrap(),
        5060,
    );
    assert!(!reg.is_registered(&probe.clone().with_transport(stranger)).await);
}

#[tokio::test]
async fn test_delete_and_clear() {
    use ferrosip_registrar_core::DelOutcome;

    let reg = registrar();
    reg.request(&register("admin-call", 1, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();

    assert_eq!(reg.delete(&aor()).await.unwrap(), DelOutcome::Deleted);
    assert_eq!(reg.delete(&aor()).await.unwrap(), DelOutcome::NotFound);

    reg.request(&register("admin-call", 2, vec![instanced_contact("sip:alice@10.0.0.1")]))
        .await
        .unwrap();
    reg.clear().await.unwrap();
    assert!(reg.find(&aor()).await.unwrap().is_empty());
}
