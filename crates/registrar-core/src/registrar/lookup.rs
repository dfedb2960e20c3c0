//! Proxy-facing registration queries
//!
//! `find` resolves an AOR (or a GRUU) to routable contact URIs, `qfind`
//! groups them into priority buckets for sequential-parallel forking, and
//! `is_registered` answers whether a request arrived over a flow belonging
//! to one of its sender's bindings.

use std::net::IpAddr;

use ordered_float::OrderedFloat;
use tracing::{debug, warn};

use ferrosip_sip_core::{Aor, Request, SipResult, TransportKind, Uri};

use crate::registrar::{now_secs, Registrar};
use crate::types::{ContactIndex, RegContact};

impl Registrar {
    /// Routable contact URIs currently bound to an AOR.
    pub async fn find(&self, aor: &Aor) -> SipResult<Vec<Uri>> {
        Ok(self
            .live_contacts(aor)
            .await?
            .into_iter()
            .map(|c| c.contact.uri)
            .collect())
    }

    /// Resolve a URI, honoring GRUU forms (RFC 5627).
    ///
    /// A valueless `gr` parameter marks a temporary GRUU: the user part is
    /// decrypted and resolved to the bindings of the original AOR with a
    /// still-valid mint position. `gr=<instance>` is a public GRUU and fans
    /// out to the bindings of that instance. Anything that fails to decrypt
    /// falls back to a plain AOR lookup.
    pub async fn find_uri(&self, uri: &Uri) -> SipResult<Vec<Uri>> {
        if let Some(gr) = uri.param("gr").cloned() {
            match gr.value {
                None => {
                    if let Some(user) = &uri.user {
                        if let Some(term) = self.gruu.decrypt_term(user) {
                            debug!(aor = %term.aor, pos = term.pos, "resolving temporary GRUU");
                            return Ok(self
                                .live_contacts(&term.aor)
                                .await?
                                .into_iter()
                                .filter(|c| {
                                    c.instance_id == term.instance_id && term.pos >= c.min_tmp_pos
                                })
                                .map(|c| c.contact.uri)
                                .collect());
                        }
                        warn!(%uri, "temporary GRUU failed to decrypt, falling back to AOR lookup");
                    }
                }
                Some(instance) => {
                    let aor = Aor::from_uri(uri);
                    return Ok(self
                        .live_contacts(&aor)
                        .await?
                        .into_iter()
                        .filter(|c| c.instance_id == instance)
                        .map(|c| c.contact.uri)
                        .collect());
                }
            }
        }
        self.find(&Aor::from_uri(uri)).await
    }

    /// Contacts grouped into q-value buckets: outer list descending by
    /// preference, inner lists oldest binding first. Shaped for a
    /// sequential-parallel proxy fork.
    pub async fn qfind(&self, aor: &Aor) -> SipResult<Vec<Vec<Uri>>> {
        let mut keyed: Vec<(OrderedFloat<f32>, u64, Uri)> = self
            .live_contacts(aor)
            .await?
            .into_iter()
            .map(|c| (OrderedFloat(1.0 / c.q), c.updated, c.contact.uri))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut groups: Vec<(OrderedFloat<f32>, Vec<Uri>)> = Vec::new();
        for (inv_q, _, uri) in keyed {
            match groups.last_mut() {
                Some((group_q, uris)) if *group_q == inv_q => uris.push(uri),
                _ => groups.push((inv_q, vec![uri])),
            }
        }
        Ok(groups.into_iter().map(|(_, uris)| uris).collect())
    }

    /// Whether the request was sent over a flow (or from coordinates)
    /// matching one of its sender's bindings.
    pub async fn is_registered(&self, req: &Request) -> bool {
        let aor = Aor::from_uri(&req.from_uri);
        let Ok(contacts) = self.live_contacts(&aor).await else {
            return false;
        };
        let t = &req.transport;
        contacts.iter().any(|c| {
            if c.transport.proto == t.proto
                && c.transport.remote_ip == t.remote_ip
                && c.transport.remote_port == t.remote_port
            {
                return true;
            }
            contact_coordinates(c).is_some_and(|(proto, ip, port)| {
                proto == t.proto && ip == t.remote_ip && port == t.remote_port
            })
        })
    }

    pub(crate) async fn live_contacts(&self, aor: &Aor) -> SipResult<Vec<RegContact>> {
        let now = now_secs();
        Ok(self
            .store_get(aor)
            .await?
            .into_iter()
            .filter(|c| c.is_live(now))
            .collect())
    }
}

/// `(proto, ip, port)` of a binding's contact URI, when the host is an IP
/// literal. Hostname resolution is out of scope, so named hosts never match.
fn contact_coordinates(contact: &RegContact) -> Option<(TransportKind, IpAddr, u16)> {
    let ContactIndex::Net { proto, domain, port, .. } = &contact.index else {
        return None;
    };
    let ip: IpAddr = domain
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()?;
    Some((*proto, ip, *port))
}
