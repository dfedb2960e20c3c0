//! REGISTER processing (RFC 3261 §10)
//!
//! The pipeline runs in the order the RFCs layer their checks: outbound
//! flow handling (RFC 5626), GRUU negotiation (RFC 5627), scheme and time
//! parameters, then the per-contact update loop with its replacement table,
//! or the wildcard delete-all path. The contact set is committed with a
//! single `put`, so a failing contact aborts the whole REGISTER without
//! partial writes.

use std::net::IpAddr;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::debug;

use ferrosip_sip_core::{
    Aor, Contact, Method, Request, Response, Scheme, SipError, SipResult, Uri,
};

use crate::gruu::{hash_instance, TempGruuTerm};
use crate::registrar::{now_micros, now_secs, Registrar};
use crate::types::{ContactIndex, RegContact};

/// User-part prefix of synthesized flow-token Path entries. Wire-stable:
/// peers and edge proxies pattern-match on it.
const FLOW_TOKEN_PREFIX: &str = "NkF";

/// Result of the RFC 5626 pre-processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ObProc {
    /// One side does not support outbound; reg-id is ignored.
    Unsupported,
    /// Outbound negotiated but no flow was bound; reg-id is an error.
    False,
    /// A flow is bound (by us or an edge proxy on the Path).
    True,
}

/// Per-request parameters shared by every contact in the update loop
struct ContactCtx<'a> {
    aor: &'a Aor,
    ob: ObProc,
    gruu_proc: bool,
    default_expires: u32,
    now: u64,
    long_now: u64,
    path: &'a [Uri],
}

impl Registrar {
    /// Process a REGISTER request into its reply.
    pub async fn request(&self, req: &Request) -> SipResult<Response> {
        if req.method != Method::Register {
            return Err(SipError::InvalidRequest("Expected REGISTER".to_string()));
        }

        let (ob, path) = self.outbound_check(req)?;
        let gruu_proc = self.config.supports("gruu") && req.supports("gruu");

        let aor = Aor::from_uri(&req.to_uri);
        aor.check_scheme()?;

        let default_expires = req.expires.unwrap_or(self.config.default_expires);
        let now = now_secs();
        let long_now = now_micros();

        let mut current: Vec<RegContact> = self
            .store_get(&aor)
            .await?
            .into_iter()
            .filter(|c| c.is_live(now))
            .collect();

        // No contacts: a pure query of the current bindings.
        if req.contacts.is_empty() {
            return Ok(self.registration_reply(req, &current, &path, ob));
        }

        // Wildcard with zero expiry: delete-all, replay-protected.
        if req.contacts.len() == 1 && req.contacts[0].is_wildcard() && default_expires == 0 {
            for entry in &current {
                if entry.call_id == req.call_id && req.cseq <= entry.cseq {
                    return Err(SipError::InvalidRequest("Rejected Old CSeq".to_string()));
                }
            }
            self.store_del(&aor).await?;
            debug!(%aor, "wildcard deregistration removed AOR");
            return Ok(self.registration_reply(req, &[], &path, ob));
        }

        // At most one contact may bind a flow per REGISTER (RFC 5626 §6).
        let reg_id_bindings = req
            .contacts
            .iter()
            .filter(|c| c.reg_id().is_some() && c.expires().unwrap_or(default_expires) > 0)
            .count();
        if reg_id_bindings > 1 {
            return Err(SipError::InvalidRequest(
                "Several 'reg-id' Options".to_string(),
            ));
        }

        let ctx = ContactCtx {
            aor: &aor,
            ob,
            gruu_proc,
            default_expires,
            now,
            long_now,
            path: &path,
        };
        for contact in &req.contacts {
            self.apply_contact(req, contact, &mut current, &ctx)?;
        }

        if current.is_empty() {
            self.store_del(&aor).await?;
            debug!(%aor, "last binding removed, AOR deleted");
        } else {
            let max_expire = current.iter().map(|c| c.expire).max().unwrap_or(now);
            let ttl = max_expire.saturating_sub(now).max(self.config.min_ttl);
            self.store_put(&aor, current.clone(), Duration::from_secs(ttl))
                .await?;
            debug!(%aor, bindings = current.len(), ttl, "bindings committed");
        }
        Ok(self.registration_reply(req, &current, &path, ob))
    }

    /// RFC 5626 pre-processing: classify the request's outbound status and
    /// produce the Path set the binding will store (possibly with our own
    /// flow entry prepended).
    fn outbound_check(&self, req: &Request) -> SipResult<(ObProc, Vec<Uri>)> {
        if !(self.config.supports("outbound") && req.supports("outbound")) {
            return Ok((ObProc::Unsupported, req.path.clone()));
        }

        if req.via_count > 1 {
            // Already proxied: the edge proxy must have recorded the flow.
            let Some(nearest) = req.path.last() else {
                return Err(SipError::InvalidRequest("Path Needed".to_string()));
            };
            let ob = if nearest.has_param("ob") { ObProc::True } else { ObProc::False };
            return Ok((ob, req.path.clone()));
        }

        // First hop: bind the registration to our own flow, if one exists.
        let t = &req.transport;
        match self.flows.find_flow(t.proto, t.remote_ip, t.remote_port) {
            Some(token) => {
                let host = match t.listen_ip {
                    IpAddr::V4(ip) => ip.to_string(),
                    IpAddr::V6(ip) => format!("[{ip}]"),
                };
                let flow_uri = Uri::sip(host)
                    .with_user(format!("{FLOW_TOKEN_PREFIX}{}", BASE64.encode(&token)))
                    .with_port(t.listen_port)
                    .with_param("lr", None);
                debug!(flow = %flow_uri, "binding registration to local flow");
                let mut path = vec![flow_uri];
                path.extend(req.path.iter().cloned());
                Ok((ObProc::True, path))
            }
            None => Ok((ObProc::False, req.path.clone())),
        }
    }

    /// Apply one Contact header entry to the working set.
    fn apply_contact(
        &self,
        req: &Request,
        contact: &Contact,
        current: &mut Vec<RegContact>,
        ctx: &ContactCtx<'_>,
    ) -> SipResult<()> {
        // Contact sanity: no wildcard mixed into an update, no self-loop,
        // no GRUU pointing back at the AOR being registered.
        if contact.is_wildcard() {
            return Err(SipError::InvalidRequest("Invalid Contact".to_string()));
        }
        if Aor::from_uri(&contact.uri) == *ctx.aor {
            return Err(SipError::Forbidden("Invalid Contact".to_string()));
        }
        if contact.uri.has_param("gr") {
            if let Some(user) = &contact.uri.user {
                if let Some(term) = self.gruu.decrypt_term(user) {
                    if term.aor == *ctx.aor {
                        return Err(SipError::Forbidden("Invalid Contact".to_string()));
                    }
                }
            }
        }

        // Expiry negotiation: short-but-not-tiny intervals are rejected,
        // oversized ones clamped.
        let mut expires = contact.expires().unwrap_or(ctx.default_expires);
        if expires > 0 && expires < 3600 && expires < self.config.min_expires {
            return Err(SipError::IntervalTooBrief(self.config.min_expires));
        }
        if expires > self.config.max_expires {
            expires = self.config.max_expires;
        }

        let q = contact.q().unwrap_or(1.0);
        if q <= 0.0 {
            return Err(SipError::InvalidRequest("Invalid Q Value".to_string()));
        }
        let q = q.min(1.0);

        let instance_id = contact.instance().map(hash_instance).unwrap_or_default();

        let mut reg_id = contact.reg_id().unwrap_or_default().to_string();
        if !reg_id.is_empty() {
            if ctx.ob == ObProc::Unsupported || instance_id.is_empty() {
                // Not negotiated: the parameter is ignored, not an error.
                reg_id.clear();
            } else if ctx.ob == ObProc::False {
                return Err(SipError::FirstHopLacksOutbound);
            }
        }

        let index = if reg_id.is_empty() {
            ContactIndex::net_from_uri(&contact.uri)
        } else {
            ContactIndex::Ob {
                instance_id: instance_id.clone(),
                reg_id: reg_id.clone(),
            }
        };

        // Replacement table, keyed by index within the live set.
        let slot = current.iter().position(|c| c.index == index);
        let (slot, min_tmp_pos, next_tmp_pos) = match slot {
            None => {
                if expires == 0 {
                    return Ok(());
                }
                (None, 0, 0)
            }
            Some(i) => {
                let prior = &current[i];
                if prior.call_id == req.call_id && req.cseq <= prior.cseq {
                    return Err(SipError::InvalidRequest("Rejected Old CSeq".to_string()));
                }
                let (min_tmp, next_tmp) = if prior.call_id == req.call_id {
                    (prior.min_tmp_pos, prior.next_tmp_pos)
                } else {
                    // Call-ID changed: invalidate every temp GRUU minted
                    // under the old registration.
                    (prior.next_tmp_pos, prior.next_tmp_pos)
                };
                if expires == 0 {
                    current.remove(i);
                    return Ok(());
                }
                (Some(i), min_tmp, next_tmp)
            }
        };

        let mut stored = contact.clone();
        stored.set_param("expires", Some(&expires.to_string()));

        let mut next_tmp_pos = next_tmp_pos;
        if ctx.gruu_proc && !instance_id.is_empty() && reg_id.is_empty() {
            if contact.uri.scheme != Scheme::Sip {
                return Err(SipError::Forbidden("Invalid Contact".to_string()));
            }
            let pub_gruu = ctx.aor.to_uri().with_param("gr", Some(&instance_id));
            stored.set_param("pub-gruu", Some(&format!("\"<{pub_gruu}>\"")));

            let term = TempGruuTerm {
                aor: ctx.aor.clone(),
                instance_id: instance_id.clone(),
                pos: next_tmp_pos,
            };
            let tmp_user = self.gruu.encrypt_term(&term);
            stored.set_param(
                "temp-gruu",
                Some(&format!("\"<sip:{tmp_user}@{};gr>\"", ctx.aor.domain)),
            );
            next_tmp_pos += 1;
        }

        let built = RegContact {
            index,
            contact: stored,
            updated: ctx.long_now,
            expire: ctx.now + u64::from(expires),
            q,
            call_id: req.call_id.clone(),
            cseq: req.cseq,
            transport: req.transport,
            path: ctx.path.to_vec(),
            instance_id,
            reg_id,
            min_tmp_pos,
            next_tmp_pos,
        };
        match slot {
            Some(i) => current[i] = built,
            None => current.push(built),
        }
        Ok(())
    }

    fn registration_reply(
        &self,
        req: &Request,
        contacts: &[RegContact],
        path: &[Uri],
        ob: ObProc,
    ) -> Response {
        let mut resp = Response::new(200, req);
        resp.contacts = contacts.iter().map(|c| c.contact.clone()).collect();
        resp.supported = self.config.supported.clone();
        resp.path = path.to_vec();
        if ob == ObProc::True && contacts.iter().any(|c| !c.reg_id.is_empty()) {
            resp.require.push("outbound".to_string());
        }
        resp
    }
}
