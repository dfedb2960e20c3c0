//! # Dialog identifier
//!
//! RFC 3261 §12 identifies a dialog by Call-ID plus the two tags. The id is
//! derivable from a request and from a response independently; for the UAS
//! role the local tag is the To tag and the remote tag the From tag.
//!
//! An id with an empty local tag (initial INVITE before the UAS has minted
//! its tag) is legal but never stored; the store keys dialogs by the
//! completed id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::message::{Request, Response};

/// Identity of a dialog: Call-ID plus local and remote tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DialogId {
    pub call_id: String,
    pub local_tag: String,
    pub remote_tag: String,
}

impl DialogId {
    pub fn new(
        call_id: impl Into<String>,
        local_tag: impl Into<String>,
        remote_tag: impl Into<String>,
    ) -> Self {
        DialogId {
            call_id: call_id.into(),
            local_tag: local_tag.into(),
            remote_tag: remote_tag.into(),
        }
    }

    /// Id of the dialog an inbound request belongs to, seen from the UAS.
    ///
    /// Local tag is the To tag (empty on an initial request), remote tag the
    /// From tag.
    pub fn uas_from_request(req: &Request) -> Self {
        DialogId::new(
            req.call_id.clone(),
            req.to_tag.clone().unwrap_or_default(),
            req.from_tag.clone(),
        )
    }

    /// Id of the dialog an outgoing UAS response belongs to.
    ///
    /// The To tag of the response is the tag this side minted.
    pub fn uas_from_response(resp: &Response) -> Self {
        DialogId::new(
            resp.call_id.clone(),
            resp.to_tag.clone().unwrap_or_default(),
            resp.from_tag.clone(),
        )
    }

    /// Whether both tags are known.
    pub fn is_complete(&self) -> bool {
        !self.local_tag.is_empty() && !self.remote_tag.is_empty()
    }
}

impl fmt::Display for DialogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.call_id, self.local_tag, self.remote_tag)
    }
}
