//! SDP offer/answer slot model (RFC 3264)
//!
//! Each invite usage carries at most one outstanding offer and one answer.
//! A slot records who produced the body and which message carried it:
//!
//! ```text
//! {origin ∈ {local, remote}, carrier ∈ {invite, prack, update, ack}, body}
//! ```
//!
//! The state machine in [`crate::machine`] drives every transition; this
//! module only provides the slot type and predicates. Bodies stay opaque;
//! negotiation of the media lines themselves happens above this stack.

use serde::{Deserialize, Serialize};

use ferrosip_sip_core::Sdp;

/// Which side produced the SDP body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdpOrigin {
    Local,
    Remote,
}

impl SdpOrigin {
    /// The opposite side.
    pub fn flip(self) -> Self {
        match self {
            SdpOrigin::Local => SdpOrigin::Remote,
            SdpOrigin::Remote => SdpOrigin::Local,
        }
    }
}

/// Which message carried the SDP body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdpCarrier {
    Invite,
    Prack,
    Update,
    Ack,
}

/// One offer or answer slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdpSlot {
    pub origin: SdpOrigin,
    pub carrier: SdpCarrier,
    pub sdp: Sdp,
}

impl SdpSlot {
    pub fn new(origin: SdpOrigin, carrier: SdpCarrier, sdp: Sdp) -> Self {
        SdpSlot { origin, carrier, sdp }
    }

    pub fn local(carrier: SdpCarrier, sdp: Sdp) -> Self {
        SdpSlot::new(SdpOrigin::Local, carrier, sdp)
    }

    pub fn remote(carrier: SdpCarrier, sdp: Sdp) -> Self {
        SdpSlot::new(SdpOrigin::Remote, carrier, sdp)
    }

    /// Origin/carrier match, body ignored.
    pub fn is(&self, origin: SdpOrigin, carrier: SdpCarrier) -> bool {
        self.origin == origin && self.carrier == carrier
    }

    /// Whether the carrier is INVITE or PRACK, the pair cleared together
    /// when a failed final response abandons the exchange.
    pub fn carried_by_invite_or_prack(&self) -> bool {
        matches!(self.carrier, SdpCarrier::Invite | SdpCarrier::Prack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_predicates() {
        let slot = SdpSlot::remote(SdpCarrier::Invite, Sdp::from("v=0"));
        assert!(slot.is(SdpOrigin::Remote, SdpCarrier::Invite));
        assert!(!slot.is(SdpOrigin::Local, SdpCarrier::Invite));
        assert!(!slot.is(SdpOrigin::Remote, SdpCarrier::Update));
        assert!(slot.carried_by_invite_or_prack());
        assert!(!SdpSlot::local(SdpCarrier::Update, Sdp::from("v=0")).carried_by_invite_or_prack());
    }

    #[test]
    fn test_origin_flip() {
        assert_eq!(SdpOrigin::Local.flip(), SdpOrigin::Remote);
        assert_eq!(SdpOrigin::Remote.flip(), SdpOrigin::Local);
    }
}
