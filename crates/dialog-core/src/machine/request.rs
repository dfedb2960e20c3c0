//! UAS request handlers
//!
//! Advances a dialog in response to an inbound request. Dispatch follows
//! method, invite status and the offer/answer slots; every rejection leaves
//! the caller's stored dialog untouched because the store only commits the
//! returned record.

use tracing::debug;

use ferrosip_sip_core::{Method, Request, SipError, SipResult};

use crate::config::DialogConfig;
use crate::dialog::{Dialog, InviteState, InviteStatus, Role};
use crate::events::{DialogEvent, DialogEvents};
use crate::machine::retry_busy;
use crate::sdp::{SdpCarrier, SdpOrigin, SdpSlot};

/// Outcome of request processing: the advanced dialog and the event to
/// publish, if the transition is notable.
pub type RequestOutcome = (Dialog, Option<DialogEvent>);

/// Process an inbound in-dialog request on the UAS side.
pub fn uas_request(
    req: &Request,
    mut dialog: Dialog,
    events: &dyn DialogEvents,
    config: &DialogConfig,
) -> SipResult<RequestOutcome> {
    // CSeq gate, ACK excepted: reject regressions, then advance the window.
    if req.method != Method::Ack {
        if dialog.remote_seq > 0 && req.cseq < dialog.remote_seq {
            debug!(
                dialog_id = %dialog.id,
                cseq = req.cseq,
                remote_seq = dialog.remote_seq,
                "rejecting out-of-order request"
            );
            return Err(SipError::Internal("Old CSeq in Dialog".to_string()));
        }
        dialog.remote_seq = req.cseq;
    }

    match req.method {
        Method::Invite => invite(req, dialog, config),
        Method::Bye => bye(req, dialog),
        Method::Prack => prack(req, dialog),
        Method::Update => update(req, dialog, config),
        Method::Ack => ack(req, dialog),
        Method::Subscribe | Method::Refer => {
            let dialog = events.uas_request(req, dialog)?;
            Ok((dialog, Some(DialogEvent::Subscribe)))
        }
        Method::Notify => {
            let dialog = events.uas_request(req, dialog)?;
            Ok((dialog, Some(DialogEvent::Notify)))
        }
        _ => Ok((dialog, None)),
    }
}

fn invite(req: &Request, mut dialog: Dialog, config: &DialogConfig) -> SipResult<RequestOutcome> {
    // First INVITE on a dialog without a usage: start from the neutral
    // state and fall through to the confirmed branch below.
    let mut inv = dialog
        .invite
        .take()
        .unwrap_or_else(|| InviteState::new(Role::Uas));

    // Glare check before status dispatch: a second offer while one is
    // unanswered is 491 whatever state the usage is in.
    if req.has_body() && inv.sdp_offer.is_some() && inv.sdp_answer.is_none() {
        return Err(SipError::RequestPending);
    }

    match inv.status {
        InviteStatus::Confirmed => {
            // A completed exchange is consumed by the next offer-bearing
            // transaction.
            if inv.sdp_offer.is_some() && inv.sdp_answer.is_some() {
                inv.clear_sdp();
            }
            if let Some(body) = &req.body {
                inv.sdp_offer = Some(SdpSlot::remote(SdpCarrier::Invite, body.clone()));
            }
            inv.status = InviteStatus::ProceedingUas;
            inv.class = Role::Uas;
            inv.request = Some(req.clone());
            inv.response = None;
            inv.ack = None;
            debug!(dialog_id = %dialog.id, "invite usage entering proceeding_uas");
            dialog.invite = Some(inv);
            Ok((dialog, None))
        }
        InviteStatus::ProceedingUac | InviteStatus::AcceptedUac => Err(SipError::RequestPending),
        InviteStatus::ProceedingUas | InviteStatus::AcceptedUas => Err(retry_busy(config)),
        InviteStatus::Bye => Err(SipError::NoTransaction),
    }
}

fn bye(req: &Request, mut dialog: Dialog) -> SipResult<RequestOutcome> {
    // The usage enters `bye` whatever its state; the stop itself is
    // scheduled when the BYE response goes out.
    let mut inv = dialog
        .invite
        .take()
        .unwrap_or_else(|| InviteState::new(Role::Uas));
    inv.status = InviteStatus::Bye;
    inv.request = Some(req.clone());
    dialog.invite = Some(inv);
    Ok((dialog, Some(DialogEvent::Bye)))
}

fn prack(req: &Request, mut dialog: Dialog) -> SipResult<RequestOutcome> {
    let Some(inv) = dialog.invite.as_mut() else {
        return Err(SipError::RequestPending);
    };
    if inv.status != InviteStatus::ProceedingUas {
        return Err(SipError::RequestPending);
    }

    match (&inv.sdp_offer, &req.body) {
        (None, Some(body)) => {
            inv.sdp_offer = Some(SdpSlot::remote(SdpCarrier::Prack, body.clone()));
            Ok((dialog, None))
        }
        (Some(offer), Some(body)) if offer.is(SdpOrigin::Local, SdpCarrier::Invite) => {
            inv.sdp_answer = Some(SdpSlot::remote(SdpCarrier::Prack, body.clone()));
            Ok((dialog, Some(DialogEvent::Prack)))
        }
        _ => Ok((dialog, None)),
    }
}

fn update(req: &Request, mut dialog: Dialog, config: &DialogConfig) -> SipResult<RequestOutcome> {
    let Some(body) = &req.body else {
        return Ok((dialog, None));
    };

    // UPDATE before any INVITE still negotiates; the slot lives on a
    // neutral usage just like the first-INVITE case.
    let inv = dialog
        .invite
        .get_or_insert_with(|| InviteState::new(Role::Uas));

    if inv.sdp_offer.is_some() && inv.sdp_answer.is_some() {
        inv.clear_sdp();
    }
    match &inv.sdp_offer {
        None => {
            inv.sdp_offer = Some(SdpSlot::remote(SdpCarrier::Update, body.clone()));
            Ok((dialog, None))
        }
        Some(offer) if offer.origin == SdpOrigin::Local => Err(SipError::RequestPending),
        Some(_) => Err(retry_busy(config)),
    }
}

fn ack(req: &Request, mut dialog: Dialog) -> SipResult<RequestOutcome> {
    let Some(inv) = dialog.invite.as_mut() else {
        return Err(SipError::NoTransaction);
    };

    match inv.status {
        InviteStatus::AcceptedUas if inv.request_cseq() == Some(req.cseq) => {
            merge_ack_sdp(inv, req);
            inv.status = InviteStatus::Confirmed;
            inv.ack = Some(req.clone());
            debug!(dialog_id = %dialog.id, "invite usage confirmed");
            Ok((dialog, Some(DialogEvent::Confirmed)))
        }
        // Retransmissions after confirmation or teardown are absorbed.
        InviteStatus::Confirmed | InviteStatus::Bye => Ok((dialog, None)),
        _ => Err(SipError::NoTransaction),
    }
}

/// ACK-side SDP merge: a local INVITE offer is answered by the ACK body, or
/// abandoned when the ACK carries none.
fn merge_ack_sdp(inv: &mut InviteState, req: &Request) {
    let offer_is_local_invite = inv
        .sdp_offer
        .as_ref()
        .is_some_and(|o| o.is(SdpOrigin::Local, SdpCarrier::Invite));
    if !offer_is_local_invite {
        return;
    }
    match &req.body {
        Some(body) => {
            inv.sdp_answer = Some(SdpSlot::remote(SdpCarrier::Ack, body.clone()));
        }
        None => inv.clear_sdp(),
    }
}
