//! Invite usage state
//!
//! The invite sub-record and its lifecycle enums. A freshly created usage
//! starts in the synthetic neutral `Confirmed` state so the first INVITE
//! takes the same path as a re-INVITE; the request handler overwrites it
//! immediately.

use serde::{Deserialize, Serialize};

use ferrosip_sip_core::{Request, Response};

use crate::sdp::SdpSlot;

/// Which role this side played in the INVITE transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Uac,
    Uas,
}

/// Invite usage status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteStatus {
    /// INVITE sent, no final response yet
    ProceedingUac,
    /// 2xx received, ACK not yet sent
    AcceptedUac,
    /// INVITE received, no final response yet
    ProceedingUas,
    /// 2xx sent, ACK not yet received
    AcceptedUas,
    /// ACK exchanged (also the synthetic starting state of a new usage)
    Confirmed,
    /// BYE seen; the usage is winding down
    Bye,
}

impl InviteStatus {
    /// An INVITE transaction is in flight on either side.
    pub fn in_progress(&self) -> bool {
        matches!(
            self,
            InviteStatus::ProceedingUac
                | InviteStatus::AcceptedUac
                | InviteStatus::ProceedingUas
                | InviteStatus::AcceptedUas
        )
    }
}

/// Why a dialog was stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Terminated by a dialog-ending status code (RFC 5057 §5.2) or a 481
    /// against the invite usage.
    Code(u16),
    /// BYE sent by the party that initiated the dialog
    CallerBye,
    /// BYE sent by the answering party
    CalleeBye,
}

/// The invite usage of a dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InviteState {
    pub status: InviteStatus,
    pub class: Role,
    /// Last INVITE (or BYE) request observed on this usage.
    pub request: Option<Request>,
    /// Last response observed.
    pub response: Option<Response>,
    /// Last ACK observed.
    pub ack: Option<Request>,
    pub sdp_offer: Option<SdpSlot>,
    pub sdp_answer: Option<SdpSlot>,
    /// Unix seconds when the first 2xx was sent; `None` until answered.
    pub answered: Option<u64>,
}

impl InviteState {
    /// A fresh usage in the neutral `Confirmed` state.
    pub fn new(class: Role) -> Self {
        InviteState {
            status: InviteStatus::Confirmed,
            class,
            request: None,
            response: None,
            ack: None,
            sdp_offer: None,
            sdp_answer: None,
            answered: None,
        }
    }

    /// Drop both slots; used when an exchange is abandoned.
    pub fn clear_sdp(&mut self) {
        self.sdp_offer = None;
        self.sdp_answer = None;
    }

    /// CSeq of the INVITE this usage is processing, if any.
    pub fn request_cseq(&self) -> Option<u32> {
        self.request.as_ref().map(|r| r.cseq)
    }
}
