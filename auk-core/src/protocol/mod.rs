//! Typed request/response payloads for each protocol domain.
//!
//! Each sub-module defines the structured payloads for one family of
//! commands (login, roster, images, multi-message transfer, messaging,
//! server pushes). Payloads are serialized with `serde` + `bincode` in
//! the reference wire format and carried inside request envelopes /
//! transport packets; a production codec swaps the byte layer without
//! touching these types.

pub mod image;
pub mod login;
pub mod messaging;
pub mod multimsg;
pub mod push;
pub mod roster;

mod decoders;

pub use decoders::default_decoder_table;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::AukError;

// ── Command names ────────────────────────────────────────────────

/// Protocol command names, exactly as they appear on the wire.
pub mod commands {
    pub const LOGIN: &str = "wtlogin.login";
    pub const REGISTER: &str = "StatSvc.register";
    pub const MSF_OFFLINE: &str = "StatSvc.ReqMSFOffline";
    pub const FORCE_OFFLINE: &str = "MessageSvc.PushForceOffline";
    pub const GET_MESSAGE: &str = "MessageSvc.PbGetMsg";
    pub const SEND_MESSAGE: &str = "MessageSvc.PbSendMsg";
    pub const HEARTBEAT: &str = "Heartbeat.Alive";
    pub const FRIEND_LIST: &str = "friendlist.getFriendGroupList";
    pub const GROUP_LIST: &str = "friendlist.GetTroopListReqV2";
    pub const MEMBER_LIST: &str = "friendlist.GetTroopMemberListReq";
    pub const GROUP_PIC_UP: &str = "ImgStore.GroupPicUp";
    pub const OFF_PIC_UP: &str = "LongConn.OffPicUp";
    pub const MULTI_APPLY_UP: &str = "MultiMsg.ApplyUp";
    pub const MULTI_APPLY_DOWN: &str = "MultiMsg.ApplyDown";
    pub const PUSH_GROUP_MSG: &str = "OnlinePush.PbPushGroupMsg";
    pub const PUSH_PRIVATE_MSG: &str = "MessageSvc.PushNotify";
    pub const PUSH_REQ: &str = "OnlinePush.ReqPush";
    pub const SYSTEM_MSG_GROUP: &str = "ProfileService.Pb.ReqSystemMsgNew.Group";
    pub const SYSTEM_MSG_FRIEND: &str = "ProfileService.Pb.ReqSystemMsgNew.Friend";
    pub const GROUP_RECALL: &str = "PbMessageSvc.PbMsgWithDraw";
    pub const GROUP_ADMIN: &str = "OidbSvc.EditGroup";
}

// ── Serialization helpers ────────────────────────────────────────

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, AukError> {
    bincode::serialize(value).map_err(|e| AukError::Encoding(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(command: &str, bytes: &[u8]) -> Result<T, AukError> {
    bincode::deserialize(bytes).map_err(|e| AukError::Decode {
        command: command.to_owned(),
        reason: e.to_string(),
    })
}

// ── Upload servers ───────────────────────────────────────────────

/// A candidate upload server as the coordinator reports it: packed IPv4
/// (protocol byte order) plus port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerAddr {
    pub ip: u32,
    pub port: u32,
}

impl ServerAddr {
    /// Render as a dialable `ip:port` string. The wire packs the
    /// address least-significant octet first.
    pub fn to_dial_string(&self) -> String {
        let b = self.ip.to_le_bytes();
        format!("{}.{}.{}.{}:{}", b[0], b[1], b[2], b[3], self.port)
    }
}

// ── Typed responses ──────────────────────────────────────────────

/// The decoded response for a correlated request. One variant per
/// request kind, so callers match statically instead of downcasting.
#[derive(Debug, Clone)]
pub enum Response {
    Login(login::LoginResponse),
    FriendList(roster::FriendListResponse),
    GroupList(roster::GroupListResponse),
    MemberList(roster::MemberListResponse),
    ImageStore(image::ImageStoreResponse),
    MultiApplyUp(multimsg::MultiApplyUpResponse),
    MultiApplyDown(multimsg::MultiApplyDownResponse),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_addr_renders_le() {
        let addr = ServerAddr { ip: u32::from_le_bytes([125, 94, 60, 146]), port: 80 };
        assert_eq!(addr.to_dial_string(), "125.94.60.146:80");
    }

    #[test]
    fn decode_reports_command_name() {
        let err = decode::<ServerAddr>(commands::LOGIN, &[1]).unwrap_err();
        match err {
            AukError::Decode { command, .. } => assert_eq!(command, commands::LOGIN),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
