//! Reference decoders and the default dispatch table.
//!
//! Each function parses the reference wire payload for one command and
//! lifts it into a [`Decoded`] value. A deployment with the production
//! byte layout registers its own functions instead; the table shape is
//! the contract, not these bodies.

use crate::dispatch::{DecodeContext, Decoded, DecoderTable};
use crate::error::AukError;
use crate::events::Event;
use crate::message::{GroupMessage, PrivateMessage, Sender};
use crate::protocol::{commands, decode, Response};
use crate::protocol::image::ImageStoreResponse;
use crate::protocol::login::{LoginResponse, LoginRspWire};
use crate::protocol::multimsg::{MultiApplyDownResponse, MultiApplyUpResponse};
use crate::protocol::push::{
    FriendSystemMessage, GroupSystemMessage, OfflineNotice, OnlinePushReq, PushGroupMessage,
    PushItem, PushPrivateMessage,
};
use crate::protocol::roster::{FriendListResponse, GroupListResponse, MemberListResponse};

/// Assemble the default decoder table for the reference wire format.
pub fn default_decoder_table() -> DecoderTable {
    DecoderTable::builder()
        .register(commands::LOGIN, decode_login)
        .register(commands::REGISTER, decode_ack)
        .register(commands::MSF_OFFLINE, decode_offline)
        .register(commands::FORCE_OFFLINE, decode_offline)
        .register(commands::GET_MESSAGE, decode_ack)
        .register(commands::HEARTBEAT, decode_ack)
        .register(commands::FRIEND_LIST, decode_friend_list)
        .register(commands::GROUP_LIST, decode_group_list)
        .register(commands::MEMBER_LIST, decode_member_list)
        .register(commands::GROUP_PIC_UP, decode_image_store)
        .register(commands::OFF_PIC_UP, decode_image_store)
        .register(commands::MULTI_APPLY_UP, decode_multi_apply_up)
        .register(commands::MULTI_APPLY_DOWN, decode_multi_apply_down)
        .register(commands::PUSH_GROUP_MSG, decode_push_group_msg)
        .register(commands::PUSH_PRIVATE_MSG, decode_push_private_msg)
        .register(commands::PUSH_REQ, decode_push_req)
        .register(commands::SYSTEM_MSG_GROUP, decode_system_msg_group)
        .register(commands::SYSTEM_MSG_FRIEND, decode_system_msg_friend)
        .build()
}

fn decode_ack(_: &DecodeContext<'_>, _: u16, _: &[u8]) -> Result<Decoded, AukError> {
    Ok(Decoded::Ack)
}

fn decode_login(ctx: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let wire: LoginRspWire = decode(commands::LOGIN, payload)?;
    if let Some(sig) = wire.sig {
        *ctx.session.sig.lock().expect("sig poisoned") = sig;
    }
    if let Some(nickname) = &wire.nickname {
        *ctx.session.nickname.lock().expect("nickname poisoned") = nickname.clone();
    }
    Ok(Decoded::Response(Response::Login(LoginResponse {
        success: wire.success,
        captcha: wire.captcha,
        error_message: wire.error_message,
    })))
}

fn decode_offline(ctx: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let notice: OfflineNotice = decode(commands::FORCE_OFFLINE, payload)?;
    ctx.session.note_disconnect_reason(notice.message.clone());
    Ok(Decoded::Event(Event::ForceOffline { message: notice.message }))
}

fn decode_friend_list(_: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let rsp: FriendListResponse = decode(commands::FRIEND_LIST, payload)?;
    Ok(Decoded::Response(Response::FriendList(rsp)))
}

fn decode_group_list(_: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let rsp: GroupListResponse = decode(commands::GROUP_LIST, payload)?;
    Ok(Decoded::Response(Response::GroupList(rsp)))
}

fn decode_member_list(_: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let rsp: MemberListResponse = decode(commands::MEMBER_LIST, payload)?;
    Ok(Decoded::Response(Response::MemberList(rsp)))
}

fn decode_image_store(_: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let rsp: ImageStoreResponse = decode(commands::GROUP_PIC_UP, payload)?;
    Ok(Decoded::Response(Response::ImageStore(rsp)))
}

fn decode_multi_apply_up(_: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let rsp: MultiApplyUpResponse = decode(commands::MULTI_APPLY_UP, payload)?;
    Ok(Decoded::Response(Response::MultiApplyUp(rsp)))
}

fn decode_multi_apply_down(
    _: &DecodeContext<'_>,
    _: u16,
    payload: &[u8],
) -> Result<Decoded, AukError> {
    let rsp: MultiApplyDownResponse = decode(commands::MULTI_APPLY_DOWN, payload)?;
    Ok(Decoded::Response(Response::MultiApplyDown(rsp)))
}

fn decode_push_group_msg(
    ctx: &DecodeContext<'_>,
    _: u16,
    payload: &[u8],
) -> Result<Decoded, AukError> {
    let push: PushGroupMessage = decode(commands::PUSH_GROUP_MSG, payload)?;
    if push.from_uin == ctx.session.uin {
        // Our own send echoed back: this is the delivery receipt.
        return Ok(Decoded::Receipt { rand: push.rand, seq: push.seq });
    }
    Ok(Decoded::Event(Event::GroupMessage(GroupMessage {
        id: push.seq,
        internal_id: push.rand as i32,
        group_code: push.group_code,
        sender: Sender { uin: push.from_uin, nickname: push.from_nick, is_friend: false },
        time: push.time,
        elements: push.elements,
    })))
}

fn decode_push_private_msg(
    ctx: &DecodeContext<'_>,
    _: u16,
    payload: &[u8],
) -> Result<Decoded, AukError> {
    let push: PushPrivateMessage = decode(commands::PUSH_PRIVATE_MSG, payload)?;
    // The server redelivers 1:1 messages until synced; drop replays.
    if ctx.session.last_friend_seq(push.from_uin) == Some(push.seq) {
        return Ok(Decoded::Ack);
    }
    ctx.session.note_friend_seq(push.from_uin, push.seq);
    Ok(Decoded::Event(Event::PrivateMessage(PrivateMessage {
        id: push.seq,
        internal_id: push.rand as i32,
        target: ctx.session.uin,
        sender: Sender { uin: push.from_uin, nickname: push.from_nick, is_friend: true },
        time: push.time,
        elements: push.elements,
    })))
}

fn decode_push_req(ctx: &DecodeContext<'_>, _: u16, payload: &[u8]) -> Result<Decoded, AukError> {
    let push: OnlinePushReq = decode(commands::PUSH_REQ, payload)?;
    if ctx.session.push_seen(push.seq) {
        return Ok(Decoded::Ack);
    }
    let event = match push.item {
        PushItem::MemberLeft { group_code, member_uin } => {
            Event::GroupMemberLeft { group_code, member_uin }
        }
        PushItem::MemberKicked { group_code, member_uin, .. } => {
            Event::GroupMemberLeft { group_code, member_uin }
        }
    };
    Ok(Decoded::Event(event))
}

fn decode_system_msg_group(
    _: &DecodeContext<'_>,
    _: u16,
    payload: &[u8],
) -> Result<Decoded, AukError> {
    let msg: GroupSystemMessage = decode(commands::SYSTEM_MSG_GROUP, payload)?;
    Ok(Decoded::Event(match msg {
        GroupSystemMessage::Join(req) => Event::JoinGroupRequest(req),
        GroupSystemMessage::Invite(req) => Event::GroupInvited(req),
    }))
}

fn decode_system_msg_friend(
    _: &DecodeContext<'_>,
    _: u16,
    payload: &[u8],
) -> Result<Decoded, AukError> {
    let msg: FriendSystemMessage = decode(commands::SYSTEM_MSG_FRIEND, payload)?;
    Ok(Decoded::Event(Event::FriendRequest(msg.request)))
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Element;
    use crate::protocol::encode;
    use crate::session::Session;

    fn ctx_session() -> Session {
        Session::new(10_001, [0; 16])
    }

    #[test]
    fn default_table_covers_all_commands() {
        let table = default_decoder_table();
        for cmd in [
            commands::LOGIN,
            commands::HEARTBEAT,
            commands::FRIEND_LIST,
            commands::GROUP_LIST,
            commands::MEMBER_LIST,
            commands::GROUP_PIC_UP,
            commands::OFF_PIC_UP,
            commands::MULTI_APPLY_UP,
            commands::MULTI_APPLY_DOWN,
            commands::PUSH_GROUP_MSG,
            commands::PUSH_REQ,
        ] {
            assert!(table.contains(cmd), "missing decoder for {cmd}");
        }
        // Recall success is signaled purely by packet arrival.
        assert!(!table.contains(commands::GROUP_RECALL));
    }

    #[test]
    fn own_group_push_becomes_receipt() {
        let session = ctx_session();
        let ctx = DecodeContext { session: &session };
        let payload = encode(&PushGroupMessage {
            group_code: 5,
            group_name: "g".into(),
            from_uin: session.uin,
            from_nick: "me".into(),
            seq: 777,
            rand: 0xDEAD,
            time: 0,
            elements: vec![Element::text("hi")],
        })
        .unwrap();
        match decode_push_group_msg(&ctx, 1, &payload).unwrap() {
            Decoded::Receipt { rand, seq } => {
                assert_eq!(rand, 0xDEAD);
                assert_eq!(seq, 777);
            }
            other => panic!("expected receipt, got {other:?}"),
        }
    }

    #[test]
    fn foreign_group_push_becomes_event() {
        let session = ctx_session();
        let ctx = DecodeContext { session: &session };
        let payload = encode(&PushGroupMessage {
            group_code: 5,
            group_name: "g".into(),
            from_uin: 999,
            from_nick: "peer".into(),
            seq: 1,
            rand: 2,
            time: 3,
            elements: vec![],
        })
        .unwrap();
        assert!(matches!(
            decode_push_group_msg(&ctx, 1, &payload).unwrap(),
            Decoded::Event(Event::GroupMessage(_))
        ));
    }

    #[test]
    fn push_req_deduplicates_by_seq() {
        let session = ctx_session();
        let ctx = DecodeContext { session: &session };
        let payload = encode(&OnlinePushReq {
            seq: 31,
            item: PushItem::MemberLeft { group_code: 1, member_uin: 2 },
        })
        .unwrap();
        assert!(matches!(
            decode_push_req(&ctx, 1, &payload).unwrap(),
            Decoded::Event(Event::GroupMemberLeft { .. })
        ));
        assert!(matches!(decode_push_req(&ctx, 1, &payload).unwrap(), Decoded::Ack));
    }

    #[test]
    fn private_push_replay_is_dropped() {
        let session = ctx_session();
        let ctx = DecodeContext { session: &session };
        let payload = encode(&PushPrivateMessage {
            from_uin: 77,
            from_nick: "f".into(),
            seq: 9,
            rand: 1,
            time: 2,
            elements: vec![],
        })
        .unwrap();
        assert!(matches!(
            decode_push_private_msg(&ctx, 1, &payload).unwrap(),
            Decoded::Event(Event::PrivateMessage(_))
        ));
        assert!(matches!(decode_push_private_msg(&ctx, 1, &payload).unwrap(), Decoded::Ack));
    }

    #[test]
    fn login_decoder_stores_credentials() {
        let session = ctx_session();
        let ctx = DecodeContext { session: &session };
        let payload = encode(&LoginRspWire {
            success: true,
            nickname: Some("bird".into()),
            captcha: None,
            error_message: None,
            sig: Some(crate::session::SigInfo {
                d2_key: vec![9, 9, 9],
                ..Default::default()
            }),
        })
        .unwrap();
        match decode_login(&ctx, 1, &payload).unwrap() {
            Decoded::Response(Response::Login(rsp)) => assert!(rsp.success),
            other => panic!("expected login response, got {other:?}"),
        }
        assert_eq!(session.sig.lock().unwrap().d2_key, vec![9, 9, 9]);
        assert_eq!(*session.nickname.lock().unwrap(), "bird");
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let session = ctx_session();
        let ctx = DecodeContext { session: &session };
        let err = decode_friend_list(&ctx, 1, &[0xFF]).unwrap_err();
        assert!(matches!(err, AukError::Decode { .. }));
    }
}
