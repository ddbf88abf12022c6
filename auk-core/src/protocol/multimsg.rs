//! Multi-message (long / forward bundle) transfer payloads.

use serde::{Deserialize, Serialize};

use super::ServerAddr;
use crate::message::Element;

/// Business type codes for the apply-up round.
pub const BU_TYPE_LONG: i32 = 1;
pub const BU_TYPE_FORWARD: i32 = 2;

/// Highway business type used when uploading bundle bodies.
pub const HIGHWAY_TYPE_MULTI_MSG: u32 = 27;

#[derive(Debug, Serialize, Deserialize)]
pub struct MultiApplyUpRequest {
    /// Destination uin derived from the group code.
    pub dst_uin: i64,
    pub msg_size: i64,
    pub msg_hash: Vec<u8>,
    /// 1 = long message, 2 = forward bundle.
    pub bu_type: i32,
}

/// Upload ticket: resource id to reference later, per-uin key, transfer
/// signature and the candidate server list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiApplyUpResponse {
    pub msg_resid: String,
    pub msg_ukey: Vec<u8>,
    pub msg_sig: Vec<u8>,
    pub servers: Vec<ServerAddr>,
}

/// Body shipped over the highway for a bundle upload.
#[derive(Debug, Serialize, Deserialize)]
pub struct LongMsgUploadBody {
    pub subcmd: i32,
    pub term_type: i32,
    pub platform_type: i32,
    pub msg_type: i32,
    pub dst_uin: i64,
    pub store_type: i32,
    pub ukey: Vec<u8>,
    pub content: Vec<u8>,
}

impl LongMsgUploadBody {
    pub fn new(dst_uin: i64, ukey: Vec<u8>, content: Vec<u8>) -> Self {
        Self {
            subcmd: 1,
            term_type: 5,
            platform_type: 9,
            msg_type: 3,
            dst_uin,
            store_type: 2,
            ukey,
            content,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MultiApplyDownRequest {
    pub res_id: String,
}

/// Message type marking a group-authored entry inside a downloaded
/// bundle; such entries carry the sender name in `group_card`.
pub const MSG_TYPE_GROUP: i32 = 82;

/// One message inside a downloaded bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmittedMessage {
    pub from_uin: i64,
    pub msg_type: i32,
    pub group_card: String,
    pub nickname: String,
    pub time: i32,
    pub elements: Vec<Element>,
}

impl TransmittedMessage {
    /// Display name for the reconstructed node: group-authored entries
    /// use the embedded group card, others the plain nickname.
    pub fn sender_name(&self) -> &str {
        if self.msg_type == MSG_TYPE_GROUP { &self.group_card } else { &self.nickname }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiApplyDownResponse {
    pub messages: Vec<TransmittedMessage>,
}
