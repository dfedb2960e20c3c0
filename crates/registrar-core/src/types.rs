//! Registered contact records

use serde::{Deserialize, Serialize};

use ferrosip_sip_core::{Contact, Scheme, TransportInfo, TransportKind, Uri};

/// Replacement key of a registered contact within one AOR
///
/// A newly bound contact replaces the prior entry carrying the same index.
/// Outbound registrations key on `(instance, reg-id)` so a re-registration
/// over a new flow replaces the old flow binding; everything else keys on
/// the network coordinates of the contact URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContactIndex {
    /// Contact-URI coordinates: scheme, transport, user, domain, port.
    Net {
        scheme: Scheme,
        proto: TransportKind,
        user: String,
        domain: String,
        port: u16,
    },
    /// Outbound flow key (RFC 5626 §6): instance id plus reg-id.
    Ob { instance_id: String, reg_id: String },
}

impl ContactIndex {
    /// Derive the network index from a contact URI.
    ///
    /// The transport defaults to UDP (TLS for sips), the port to the
    /// scheme's well-known one.
    pub fn net_from_uri(uri: &Uri) -> Self {
        let proto = match uri.transport() {
            Some(t) if t.eq_ignore_ascii_case("tcp") => TransportKind::Tcp,
            Some(t) if t.eq_ignore_ascii_case("tls") => TransportKind::Tls,
            Some(t) if t.eq_ignore_ascii_case("ws") => TransportKind::Ws,
            Some(t) if t.eq_ignore_ascii_case("wss") => TransportKind::Wss,
            Some(_) => TransportKind::Udp,
            None if uri.scheme == Scheme::Sips => TransportKind::Tls,
            None => TransportKind::Udp,
        };
        let port = uri.port.unwrap_or(match proto {
            TransportKind::Tls | TransportKind::Wss => 5061,
            _ => 5060,
        });
        ContactIndex::Net {
            scheme: uri.scheme.clone(),
            proto,
            user: uri.user.clone().unwrap_or_default(),
            domain: uri.host.clone(),
            port,
        }
    }
}

/// One registered contact of an AOR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegContact {
    pub index: ContactIndex,
    /// The stored Contact header entry, `expires` normalized to a decimal
    /// and any minted GRUUs attached.
    pub contact: Contact,
    /// Microsecond logical timestamp of the binding write; tiebreaker for
    /// q-ordering.
    pub updated: u64,
    /// Wall-clock second past which the entry is stale.
    pub expire: u64,
    pub q: f32,
    /// Call-ID/CSeq of the binding REGISTER, for replay protection.
    pub call_id: String,
    pub cseq: u32,
    /// Flow the REGISTER arrived on.
    pub transport: TransportInfo,
    /// Path set to route through when contacting this binding (RFC 3327).
    pub path: Vec<Uri>,
    /// Hash of `+sip.instance`; empty when the UA sent none.
    pub instance_id: String,
    /// RFC 5626 reg-id; empty for non-outbound bindings.
    pub reg_id: String,
    /// Temporary GRUUs minted with a position below this no longer resolve.
    pub min_tmp_pos: u64,
    /// Position the next temporary GRUU will be minted with.
    pub next_tmp_pos: u64,
}

impl RegContact {
    /// Whether the binding is still current.
    pub fn is_live(&self, now: u64) -> bool {
        self.expire > now
    }
}
