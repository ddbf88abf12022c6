//! Server-initiated push payloads.

use serde::{Deserialize, Serialize};

use crate::events::{GroupInvitedRequest, NewFriendRequest, UserJoinGroupRequest};
use crate::message::Element;

/// Group message push. Also carries this account's own sends back as
/// receipts: when `from_uin` equals the session uin the packet confirms
/// delivery and carries the assigned sequence id.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushGroupMessage {
    pub group_code: i64,
    pub group_name: String,
    pub from_uin: i64,
    pub from_nick: String,
    pub seq: i32,
    pub rand: u32,
    pub time: i32,
    pub elements: Vec<Element>,
}

/// 1:1 message push.
#[derive(Debug, Serialize, Deserialize)]
pub struct PushPrivateMessage {
    pub from_uin: i64,
    pub from_nick: String,
    pub seq: i32,
    pub rand: u32,
    pub time: i32,
    pub elements: Vec<Element>,
}

/// Miscellaneous status push, de-duplicated per connection by `seq`.
#[derive(Debug, Serialize, Deserialize)]
pub struct OnlinePushReq {
    pub seq: i16,
    pub item: PushItem,
}

#[derive(Debug, Serialize, Deserialize)]
pub enum PushItem {
    MemberLeft { group_code: i64, member_uin: i64 },
    MemberKicked { group_code: i64, member_uin: i64, operator_uin: i64 },
}

/// Server-side session termination notice.
#[derive(Debug, Serialize, Deserialize)]
pub struct OfflineNotice {
    pub message: String,
}

/// Group system message (join request or invitation).
#[derive(Debug, Serialize, Deserialize)]
pub enum GroupSystemMessage {
    Join(UserJoinGroupRequest),
    Invite(GroupInvitedRequest),
}

/// Friend system message.
#[derive(Debug, Serialize, Deserialize)]
pub struct FriendSystemMessage {
    pub request: NewFriendRequest,
}
