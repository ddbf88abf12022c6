//! Friend / group / member directory payloads.

use serde::{Deserialize, Serialize};

use crate::directory::{Friend, GroupMember};

/// Page size used by the friend-list pagination loop.
pub const FRIEND_PAGE_SIZE: i16 = 150;

#[derive(Debug, Serialize, Deserialize)]
pub struct FriendListRequest {
    /// Index of the first entry requested (current accumulated count).
    pub start: i16,
    /// Page size; the server may return fewer.
    pub count: i16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FriendListResponse {
    pub total_count: i32,
    pub list: Vec<Friend>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupListRequest {
    /// Opaque vendor cookie echoed from earlier responses; empty on the
    /// first request.
    pub cookie: Vec<u8>,
}

/// Wire form of one group row. `Group` itself is not serialized: its
/// member list sits behind a lock and is fetched separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupEntry {
    pub uin: i64,
    pub code: i64,
    pub name: String,
    pub owner_uin: i64,
    pub member_count: u16,
    pub max_member_count: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupListResponse {
    pub groups: Vec<GroupEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemberListRequest {
    pub group_uin: i64,
    pub group_code: i64,
    /// Pagination cursor; 0 on the first request.
    pub next_uin: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberListResponse {
    /// Cursor for the next page; 0 terminates the loop.
    pub next_uin: i64,
    pub members: Vec<GroupMember>,
}
