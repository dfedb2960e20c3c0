//! # Request and response records
//!
//! The typed view of a SIP message the engines operate on. Parsing and
//! serialization belong to the transport/transaction collaborators; by the
//! time a [`Request`] or [`Response`] reaches this workspace every field
//! below is already populated.
//!
//! Bodies are opaque: an [`Sdp`] value carries bytes and identity, nothing
//! else. The offer/answer machine only ever asks "is there a body, and is it
//! the same one I saw before".

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::dialog_id::DialogId;
use crate::types::method::Method;
use crate::types::uri::{Param, Uri};

/// Opaque SDP body (RFC 3264 payload treated as a blob)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sdp(pub Bytes);

impl Sdp {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Sdp(body.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Sdp {
    fn from(s: &str) -> Self {
        Sdp(Bytes::copy_from_slice(s.as_bytes()))
    }
}

/// Transport protocol of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Udp,
    Tcp,
    Tls,
    Ws,
    Wss,
}

impl TransportKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransportKind::Udp => "udp",
            TransportKind::Tcp => "tcp",
            TransportKind::Tls => "tls",
            TransportKind::Ws => "ws",
            TransportKind::Wss => "wss",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coordinates of the flow a message arrived on
///
/// `remote_*` is the peer; `listen_*` is the local socket that accepted the
/// message. Outbound flow tokens and `is_registered` matching key off these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportInfo {
    pub proto: TransportKind,
    pub remote_ip: IpAddr,
    pub remote_port: u16,
    pub listen_ip: IpAddr,
    pub listen_port: u16,
}

impl TransportInfo {
    pub fn new(
        proto: TransportKind,
        remote_ip: IpAddr,
        remote_port: u16,
        listen_ip: IpAddr,
        listen_port: u16,
    ) -> Self {
        TransportInfo { proto, remote_ip, remote_port, listen_ip, listen_port }
    }
}

impl Default for TransportInfo {
    fn default() -> Self {
        TransportInfo {
            proto: TransportKind::Udp,
            remote_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            remote_port: 5060,
            listen_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            listen_port: 5060,
        }
    }
}

/// A Contact header entry: URI plus header parameters
///
/// Header parameters (`expires`, `q`, `reg-id`, `+sip.instance`, the minted
/// `pub-gruu`/`temp-gruu`) live on the contact, not inside its URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub uri: Uri,
    pub params: Vec<Param>,
}

impl Contact {
    pub fn new(uri: Uri) -> Self {
        Contact { uri, params: Vec::new() }
    }

    /// The wildcard contact `*` used for delete-all registrations.
    pub fn wildcard() -> Self {
        Contact::new(Uri::sip("*"))
    }

    pub fn is_wildcard(&self) -> bool {
        self.uri.host == "*"
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.is(name))
    }

    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(|p| p.value.as_deref())
    }

    /// Set or replace a header parameter.
    pub fn set_param(&mut self, name: &str, value: Option<&str>) {
        self.params.retain(|p| !p.is(name));
        self.params.push(Param::new(name, value));
    }

    pub fn with_param(mut self, name: &str, value: Option<&str>) -> Self {
        self.set_param(name, value);
        self
    }

    /// Per-contact `expires` parameter, when it parses as a decimal.
    pub fn expires(&self) -> Option<u32> {
        self.param_value("expires").and_then(|v| v.trim().parse().ok())
    }

    /// Per-contact `q` parameter. Float syntax first, bare-integer fallback
    /// for peers that send `q=1` instead of `q=1.0`.
    pub fn q(&self) -> Option<f32> {
        let raw = self.param_value("q")?.trim();
        raw.parse::<f32>()
            .ok()
            .or_else(|| raw.parse::<i64>().ok().map(|n| n as f32))
    }

    /// The `reg-id` parameter (RFC 5626 §6).
    pub fn reg_id(&self) -> Option<&str> {
        self.param_value("reg-id")
    }

    /// Raw `+sip.instance` value (RFC 5626 §4.1), quotes and all.
    pub fn instance(&self) -> Option<&str> {
        self.param_value("+sip.instance")
    }
}

impl fmt::Display for Contact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.uri)?;
        for param in &self.params {
            write!(f, ";{}", param)?;
        }
        Ok(())
    }
}

/// An inbound SIP request, as handed over by the transaction layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub method: Method,
    /// Request-URI
    pub uri: Uri,
    pub call_id: String,
    pub from_uri: Uri,
    pub from_tag: String,
    pub to_uri: Uri,
    pub to_tag: Option<String>,
    pub cseq: u32,
    /// Number of Via entries, i.e. hops this request has traversed.
    pub via_count: usize,
    /// Option tags from the Supported header.
    pub supported: Vec<String>,
    pub contacts: Vec<Contact>,
    /// Path header URIs in header order (RFC 3327).
    pub path: Vec<Uri>,
    /// Record-Route URIs in header order; becomes the dialog route set.
    pub record_route: Vec<Uri>,
    /// Expires header value, when present.
    pub expires: Option<u32>,
    /// Event header (RFC 6665), for SUBSCRIBE/NOTIFY matching.
    pub event: Option<String>,
    pub body: Option<Sdp>,
    pub transport: TransportInfo,
}

impl Request {
    /// A minimal request; the `with_*` helpers fill in the rest.
    pub fn new(method: Method, uri: Uri) -> Self {
        Request {
            method,
            uri,
            call_id: String::new(),
            from_uri: Uri::sip("invalid.invalid"),
            from_tag: String::new(),
            to_uri: Uri::sip("invalid.invalid"),
            to_tag: None,
            cseq: 0,
            via_count: 1,
            supported: Vec::new(),
            contacts: Vec::new(),
            path: Vec::new(),
            record_route: Vec::new(),
            expires: None,
            event: None,
            body: None,
            transport: TransportInfo::default(),
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    pub fn with_from(mut self, uri: Uri, tag: impl Into<String>) -> Self {
        self.from_uri = uri;
        self.from_tag = tag.into();
        self
    }

    pub fn with_to(mut self, uri: Uri, tag: Option<&str>) -> Self {
        self.to_uri = uri;
        self.to_tag = tag.map(str::to_string);
        self
    }

    pub fn with_cseq(mut self, cseq: u32) -> Self {
        self.cseq = cseq;
        self
    }

    pub fn with_body(mut self, body: Sdp) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.push(contact);
        self
    }

    pub fn with_supported(mut self, tags: &[&str]) -> Self {
        self.supported = tags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_expires(mut self, expires: u32) -> Self {
        self.expires = Some(expires);
        self
    }

    pub fn with_transport(mut self, transport: TransportInfo) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_via_count(mut self, count: usize) -> Self {
        self.via_count = count;
        self
    }

    pub fn with_path(mut self, path: Vec<Uri>) -> Self {
        self.path = path;
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Whether the Supported header advertises the given option tag.
    pub fn supports(&self, option: &str) -> bool {
        self.supported.iter().any(|s| s.eq_ignore_ascii_case(option))
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// An outgoing UAS response (or a reply built by the registrar)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    /// Overridden reason phrase; `None` means the conventional one.
    pub reason: Option<String>,
    pub call_id: String,
    pub from_tag: String,
    pub to_tag: Option<String>,
    pub cseq: u32,
    /// Method from the CSeq header.
    pub method: Method,
    pub contacts: Vec<Contact>,
    pub supported: Vec<String>,
    pub require: Vec<String>,
    pub path: Vec<Uri>,
    pub expires: Option<u32>,
    pub min_expires: Option<u32>,
    pub retry_after: Option<u32>,
    pub body: Option<Sdp>,
    /// Stamped by the response decorator before the message leaves the stack.
    pub dialog_id: Option<DialogId>,
}

impl Response {
    /// A response to `req`, inheriting its identity headers.
    pub fn new(status: u16, req: &Request) -> Self {
        Response {
            status,
            reason: None,
            call_id: req.call_id.clone(),
            from_tag: req.from_tag.clone(),
            to_tag: req.to_tag.clone(),
            cseq: req.cseq,
            method: req.method.clone(),
            contacts: Vec::new(),
            supported: Vec::new(),
            require: Vec::new(),
            path: Vec::new(),
            expires: None,
            min_expires: None,
            retry_after: None,
            body: None,
            dialog_id: None,
        }
    }

    pub fn with_to_tag(mut self, tag: impl Into<String>) -> Self {
        self.to_tag = Some(tag.into());
        self
    }

    pub fn with_body(mut self, body: Sdp) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.contacts.push(contact);
        self
    }

    pub fn is_provisional(&self) -> bool {
        self.status < 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}
