//! UAS response handlers
//!
//! Advances a dialog when a response for a previously received request goes
//! out. Dispatch is by status bucket first (RFC 5057 dialog-ending codes,
//! 481 against the invite usage), then by CSeq method.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use ferrosip_sip_core::error::is_dialog_ending;
use ferrosip_sip_core::{Method, Request, Response, SipResult};

use crate::dialog::{Dialog, InviteState, InviteStatus, StopReason};
use crate::events::{DialogEvent, DialogEvents};
use crate::machine::request::RequestOutcome;
use crate::sdp::{SdpCarrier, SdpOrigin, SdpSlot};

/// Process an outgoing UAS response against its dialog.
pub fn uas_response(
    req: &Request,
    resp: &Response,
    mut dialog: Dialog,
    events: &dyn DialogEvents,
) -> SipResult<RequestOutcome> {
    let code = resp.status;
    if code < 101 {
        return Ok((dialog, None));
    }

    // RFC 5057 §5.2: these codes end the whole dialog, whatever the method.
    if is_dialog_ending(code) {
        return Ok((dialog, Some(DialogEvent::Stop(StopReason::Code(code)))));
    }

    // 481 ends the invite usage only; the dialog survives on remaining
    // subscription usages.
    if code == 481 && dialog.invite.is_some() {
        dialog.invite = None;
        let event = if dialog.event_usages == 0 {
            DialogEvent::Stop(StopReason::Code(481))
        } else {
            DialogEvent::InviteStopped { code: 481 }
        };
        return Ok((dialog, Some(event)));
    }

    match resp.method {
        Method::Invite => invite_response(req, resp, dialog),
        Method::Bye => {
            let reason = if dialog.is_caller(&req.from_tag) {
                StopReason::CallerBye
            } else {
                StopReason::CalleeBye
            };
            Ok((dialog, Some(DialogEvent::Stop(reason))))
        }
        Method::Prack => prack_response(resp, dialog),
        Method::Update => update_response(resp, dialog),
        Method::Subscribe | Method::Refer | Method::Notify => {
            let method = resp.method.clone();
            let dialog = events.uas_response(req, resp, dialog);
            let event = if resp.is_success() {
                Some(match method {
                    Method::Notify => DialogEvent::Notify,
                    _ => DialogEvent::Subscribe,
                })
            } else {
                None
            };
            Ok((dialog, event))
        }
        _ => Ok((dialog, None)),
    }
}

fn invite_response(req: &Request, resp: &Response, mut dialog: Dialog) -> SipResult<RequestOutcome> {
    let code = resp.status;
    let dialog_id = dialog.id.clone();
    let Some(inv) = dialog.invite.as_mut() else {
        debug!(dialog_id = %dialog_id, code, "INVITE response without invite usage, ignoring");
        return Ok((dialog, None));
    };
    if inv.status != InviteStatus::ProceedingUas {
        debug!(dialog_id = %dialog_id, code, status = ?inv.status, "INVITE response outside proceeding_uas, ignoring");
        return Ok((dialog, None));
    }

    if (101..300).contains(&code) {
        apply_invite_offer_answer(inv, req, resp);
        inv.response = Some(resp.clone());
        if code >= 200 {
            inv.status = InviteStatus::AcceptedUas;
            if inv.answered.is_none() {
                inv.answered = Some(now_secs());
            }
            debug!(dialog_id = %dialog_id, "invite usage accepted");
            return Ok((dialog, Some(DialogEvent::Accepted)));
        }
        return Ok((dialog, None));
    }

    // Failed final response. A never-answered usage takes the dialog down;
    // an answered one stays alive with the in-flight exchange abandoned.
    if inv.answered.is_none() {
        return Ok((dialog, Some(DialogEvent::Stop(StopReason::Code(code)))));
    }
    if inv
        .sdp_offer
        .as_ref()
        .is_some_and(SdpSlot::carried_by_invite_or_prack)
    {
        inv.clear_sdp();
    }
    inv.status = InviteStatus::Confirmed;
    inv.response = Some(resp.clone());
    Ok((dialog, None))
}

/// Offer/answer actions for an INVITE 101–299, keyed on the current offer
/// slot and whether the response carries SDP:
///
/// | offer            | resp SDP | action                                |
/// |------------------|----------|---------------------------------------|
/// | {remote, invite} | yes      | answer ← {local, invite}              |
/// | {remote, invite} | no, ≥200 | clear both                            |
/// | none             | yes      | late answer when the request offered, |
/// |                  |          | else offer ← {local, invite}          |
/// | {local, invite}  | yes      | offer refreshed                       |
/// | otherwise        | —        | unchanged                             |
fn apply_invite_offer_answer(inv: &mut InviteState, req: &Request, resp: &Response) {
    let offer_remote_invite = inv
        .sdp_offer
        .as_ref()
        .is_some_and(|o| o.is(SdpOrigin::Remote, SdpCarrier::Invite));
    let offer_local_invite = inv
        .sdp_offer
        .as_ref()
        .is_some_and(|o| o.is(SdpOrigin::Local, SdpCarrier::Invite));

    if offer_remote_invite {
        if let Some(body) = &resp.body {
            inv.sdp_answer = Some(SdpSlot::local(SdpCarrier::Invite, body.clone()));
        } else if resp.status >= 200 {
            inv.clear_sdp();
        }
    } else if inv.sdp_offer.is_none() {
        if let Some(body) = &resp.body {
            if let Some(req_body) = &req.body {
                // Late answer: the INVITE's offer was never slotted.
                inv.sdp_offer = Some(SdpSlot::remote(SdpCarrier::Invite, req_body.clone()));
                inv.sdp_answer = Some(SdpSlot::local(SdpCarrier::Invite, body.clone()));
            } else {
                inv.sdp_offer = Some(SdpSlot::local(SdpCarrier::Invite, body.clone()));
            }
        }
    } else if offer_local_invite {
        if let Some(body) = &resp.body {
            // Retransmission refresh of our own offer.
            inv.sdp_offer = Some(SdpSlot::local(SdpCarrier::Invite, body.clone()));
        }
    }
}

fn prack_response(resp: &Response, mut dialog: Dialog) -> SipResult<RequestOutcome> {
    let Some(inv) = dialog.invite.as_mut() else {
        return Ok((dialog, None));
    };
    let offer_remote_prack = inv
        .sdp_offer
        .as_ref()
        .is_some_and(|o| o.is(SdpOrigin::Remote, SdpCarrier::Prack));
    if !offer_remote_prack {
        return Ok((dialog, None));
    }

    if resp.is_success() {
        if let Some(body) = &resp.body {
            inv.sdp_answer = Some(SdpSlot::local(SdpCarrier::Prack, body.clone()));
            return Ok((dialog, Some(DialogEvent::Prack)));
        }
        inv.clear_sdp();
    } else if resp.status >= 300 {
        inv.clear_sdp();
    }
    Ok((dialog, None))
}

/// UPDATE responses answer whichever side carried the pending UPDATE offer.
///
/// The remote-offer arm is the plain UAS case; the mirrored local-offer arm
/// covers responses consumed on behalf of this side's own UPDATE, which
/// otherwise would be unreachable dead dispatch.
fn update_response(resp: &Response, mut dialog: Dialog) -> SipResult<RequestOutcome> {
    let Some(inv) = dialog.invite.as_mut() else {
        return Ok((dialog, None));
    };
    let class = inv.class;
    let update_offer_origin = inv
        .sdp_offer
        .as_ref()
        .filter(|o| o.carrier == SdpCarrier::Update)
        .map(|o| o.origin);

    if resp.is_success() {
        match (update_offer_origin, &resp.body) {
            (Some(SdpOrigin::Remote), Some(body)) => {
                inv.sdp_answer = Some(SdpSlot::local(SdpCarrier::Update, body.clone()));
            }
            (Some(SdpOrigin::Local), Some(body)) => {
                inv.sdp_answer = Some(SdpSlot::remote(SdpCarrier::Update, body.clone()));
            }
            (Some(_), None) => inv.clear_sdp(),
            (None, _) => {}
        }
        return Ok((dialog, Some(DialogEvent::Update { class })));
    }
    if resp.status >= 300 && update_offer_origin.is_some() {
        inv.clear_sdp();
    }
    Ok((dialog, None))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
