//! Outgoing messaging payloads: sends, recall, registration, sync.

use serde::{Deserialize, Serialize};

use crate::message::Element;

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupSendRequest {
    pub group_code: i64,
    /// Random receipt-correlation tag; the receipt echoes it back.
    pub rand: u32,
    /// Set when the body is a synthesized placeholder for an uploaded
    /// bundle.
    pub forward: bool,
    pub elements: Vec<Element>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendSendRequest {
    pub target: i64,
    pub seq: i32,
    pub rand: u32,
    pub time: i64,
    pub elements: Vec<Element>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupRecallRequest {
    pub group_code: i64,
    pub msg_id: i32,
    pub msg_internal_id: i32,
}

/// Post-login client registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub uin: i64,
    pub status: i32,
}

/// Message-sync kick issued right after login.
#[derive(Debug, Serialize, Deserialize)]
pub struct SyncRequest {
    /// 0 = start, 1 = continue, 2 = stop.
    pub sync_flag: i32,
    pub time: i64,
}

/// Accept/refuse a group join or invite request.
#[derive(Debug, Serialize, Deserialize)]
pub struct GroupSystemAction {
    pub request_id: i64,
    pub requester_uin: i64,
    pub group_code: i64,
    pub is_invite: bool,
    pub accept: bool,
    pub block: bool,
}

/// Accept/refuse a friend request.
#[derive(Debug, Serialize, Deserialize)]
pub struct FriendSystemAction {
    pub request_id: i64,
    pub requester_uin: i64,
    pub accept: bool,
}

/// Group administration sub-operations multiplexed on one command.
#[derive(Debug, Serialize, Deserialize)]
pub enum GroupAdminRequest {
    EditMemberCard { group_code: i64, member_uin: i64, card: String },
    EditSpecialTitle { group_code: i64, member_uin: i64, title: String },
    UpdateGroupName { group_code: i64, name: String },
    MuteAll { group_code: i64, mute: bool },
    MuteMember { group_code: i64, member_uin: i64, seconds: u32 },
    KickMember { group_code: i64, member_uin: i64, message: String },
    Quit { group_code: i64 },
}
