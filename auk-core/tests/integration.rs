//! Integration tests — full session lifecycle, request round-trips,
//! reconnection and the messaging pipeline against a scripted mock
//! coordinator on localhost.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tokio_util::codec::Framed;
use tokio_test::assert_ok;

use auk_core::client::ClientBuilder;
use auk_core::codec::FrameCodec;
use auk_core::error::AukError;
use auk_core::events::Event;
use auk_core::highway::HighwayTransport;
use auk_core::message::{Element, ForwardMessage, ForwardNode, SendingMessage};
use auk_core::packet::{PacketFlags, RequestEnvelope};
use auk_core::protocol::{commands, ServerAddr};
use auk_core::protocol::image::ImageStoreResponse;
use auk_core::protocol::login::LoginRequest;
use auk_core::protocol::messaging::GroupSendRequest;
use auk_core::protocol::multimsg::{
    MultiApplyDownResponse, MultiApplyUpRequest, MultiApplyUpResponse, TransmittedMessage,
};
use auk_core::protocol::push::{OnlinePushReq, PushGroupMessage, PushItem};
use auk_core::protocol::roster::{
    FriendListRequest, FriendListResponse, MemberListRequest, MemberListResponse,
};
use auk_core::session::SigInfo;
use auk_core::wire::ClearCodec;
use auk_core::{Client, ClientConfig, Friend, Group, GroupMember, Permission};

// ── Harness ──────────────────────────────────────────────────────

const UIN: i64 = 123_456_789;

/// Maps one request envelope to zero or more raw response packets.
type Responder = Arc<dyn Fn(&RequestEnvelope) -> Vec<Vec<u8>> + Send + Sync>;

/// Accept loop: each connection reads framed requests and feeds them to
/// the responder. Survives reconnects (keeps accepting).
fn spawn_server(listener: TcpListener, responder: Responder) {
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else { break };
            let responder = Arc::clone(&responder);
            tokio::spawn(handle_connection(stream, responder));
        }
    });
}

async fn handle_connection(stream: TcpStream, responder: Responder) {
    let mut framed = Framed::new(stream, FrameCodec);
    while let Some(Ok(frame)) = framed.next().await {
        let Ok(envelope) = ClearCodec::decode_request(&frame) else { continue };
        for packet in responder(&envelope) {
            if framed.send(Bytes::from(packet)).await.is_err() {
                return;
            }
        }
    }
}

/// Response packet carrying `payload` for the request's command/seq.
fn reply<T: serde::Serialize>(envelope: &RequestEnvelope, payload: &T) -> Vec<u8> {
    ClearCodec::encode_packet(
        &envelope.command,
        envelope.seq,
        PacketFlags::empty(),
        &bincode::serialize(payload).unwrap(),
    )
    .unwrap()
}

/// Unsolicited push packet (sequence 0).
fn push<T: serde::Serialize>(command: &str, payload: &T) -> Vec<u8> {
    ClearCodec::encode_packet(
        command,
        0,
        PacketFlags::empty(),
        &bincode::serialize(payload).unwrap(),
    )
    .unwrap()
}

fn login_ok(envelope: &RequestEnvelope) -> Vec<u8> {
    #[derive(serde::Serialize)]
    struct LoginRspWire {
        success: bool,
        nickname: Option<String>,
        captcha: Option<()>,
        error_message: Option<String>,
        sig: Option<SigInfo>,
    }
    reply(
        envelope,
        &LoginRspWire {
            success: true,
            nickname: Some("tester".into()),
            captcha: None,
            error_message: None,
            sig: Some(SigInfo { d2_key: vec![1, 2, 3, 4], ..Default::default() }),
        },
    )
}

/// Handles the login/sync/heartbeat baseline every session needs.
fn baseline(envelope: &RequestEnvelope) -> Vec<Vec<u8>> {
    match envelope.command.as_str() {
        commands::LOGIN => {
            // Sanity: the login body is a real credential payload.
            let req: LoginRequest = bincode::deserialize(&envelope.body).unwrap();
            assert_eq!(req.uin, UIN);
            vec![login_ok(envelope)]
        }
        commands::GET_MESSAGE | commands::HEARTBEAT => vec![reply(envelope, &())],
        _ => Vec::new(),
    }
}

fn test_config(addr: std::net::SocketAddr) -> ClientConfig {
    ClientConfig {
        server_addr: addr.to_string(),
        request_timeout_ms: 1_000,
        receipt_timeout_ms: 300,
        heartbeat_interval_ms: 60_000,
        soft_error_backoff_ms: 10,
        ..ClientConfig::default()
    }
}

async fn connected_client(responder: Responder) -> Client {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_server(listener, responder);

    let client = ClientBuilder::new(UIN, "hunter2").config(test_config(addr)).build();
    let rsp = client.login().await.unwrap();
    assert!(rsp.success);
    assert!(client.is_online());
    client
}

/// Highway stub that records calls instead of moving bytes.
#[derive(Default)]
struct RecordingHighway {
    calls: Mutex<Vec<(String, u32, usize)>>,
}

#[async_trait::async_trait]
impl HighwayTransport for RecordingHighway {
    async fn upload(
        &self,
        server: &ServerAddr,
        _ticket: &[u8],
        body: &[u8],
        business_type: u32,
    ) -> Result<(), AukError> {
        self.calls.lock().unwrap().push((server.to_dial_string(), business_type, body.len()));
        Ok(())
    }
}

fn some_server() -> ServerAddr {
    ServerAddr { ip: u32::from_le_bytes([127, 0, 0, 1]), port: 19_999 }
}

// ── Lifecycle ────────────────────────────────────────────────────

#[tokio::test]
async fn login_brings_session_online() {
    let client = connected_client(Arc::new(baseline)).await;
    assert_eq!(client.uin(), UIN);
    assert_eq!(client.nickname(), "tester");
    assert!(client.phase().is_online());
}

#[tokio::test]
async fn login_twice_is_rejected() {
    let client = connected_client(Arc::new(baseline)).await;
    assert!(matches!(client.login().await, Err(AukError::AlreadyOnline)));
}

#[tokio::test]
async fn request_timeout_cleans_up() {
    // Server swallows everything except the baseline, so the friend
    // list round must time out.
    let client = connected_client(Arc::new(baseline)).await;
    let started = std::time::Instant::now();
    let err = client.get_friend_list().await.unwrap_err();
    assert!(matches!(err, AukError::Timeout(_)));
    assert!(started.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn unknown_command_completes_as_bare_ack() {
    // GROUP_ADMIN has no decoder: the reply's arrival is the ack.
    let responder: Responder = Arc::new(|env| match env.command.as_str() {
        commands::GROUP_ADMIN => vec![reply(env, &())],
        _ => baseline(env),
    });
    let client = connected_client(responder).await;
    tokio_test::assert_ok!(client.quit_group(42).await);
}

// ── Soft errors and reconnect ────────────────────────────────────

#[tokio::test]
async fn soft_error_ceiling_tears_down_with_one_disconnect_event() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // First (and only) connection: serve the login, then emit 11 frames
    // whose length prefix is nonsense.
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec);
        while let Some(Ok(frame)) = framed.next().await {
            let Ok(envelope) = ClearCodec::decode_request(&frame) else { continue };
            let done = envelope.command == commands::GET_MESSAGE;
            for packet in baseline(&envelope) {
                framed.send(Bytes::from(packet)).await.unwrap();
            }
            if done {
                break;
            }
        }
        // 11 bogus prefixes, each a self-contained soft error.
        let stream = framed.into_inner();
        use tokio::io::AsyncWriteExt;
        let mut stream = stream;
        for _ in 0..11 {
            stream.write_all(&2u32.to_be_bytes()).await.unwrap();
        }
        stream.flush().await.unwrap();
        // Keep the socket open so EOF handling never kicks in.
        sleep(Duration::from_secs(5)).await;
    });

    let client = ClientBuilder::new(UIN, "hunter2").config(test_config(addr)).build();
    let disconnects = Arc::new(AtomicUsize::new(0));
    {
        let disconnects = Arc::clone(&disconnects);
        client.on_event(move |event| {
            if matches!(event, Event::Disconnected { .. }) {
                disconnects.fetch_add(1, Ordering::SeqCst);
            }
        });
    }

    client.login().await.unwrap();
    // 11 soft errors × 10 ms backoff, plus slack.
    sleep(Duration::from_millis(600)).await;

    assert!(!client.is_online());
    assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    assert!(client.phase().is_disconnected());
}

#[tokio::test]
async fn end_of_stream_reconnects_and_clears_push_dedup() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let member_left = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        // Connection 1: login baseline, push the same seq twice (second
        // copy must be deduplicated), then drop the stream.
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec);
        while let Some(Ok(frame)) = framed.next().await {
            let Ok(envelope) = ClearCodec::decode_request(&frame) else { continue };
            let done = envelope.command == commands::GET_MESSAGE;
            for packet in baseline(&envelope) {
                framed.send(Bytes::from(packet)).await.unwrap();
            }
            if done {
                break;
            }
        }
        let evt = OnlinePushReq {
            seq: 31,
            item: PushItem::MemberLeft { group_code: 1, member_uin: 2 },
        };
        framed.send(Bytes::from(push(commands::PUSH_REQ, &evt))).await.unwrap();
        framed.send(Bytes::from(push(commands::PUSH_REQ, &evt))).await.unwrap();
        framed.flush().await.unwrap();
        sleep(Duration::from_millis(150)).await;
        drop(framed); // end of stream → client re-dials

        // Connection 2: the same seq fires again because the dedup
        // cache was cleared on reconnect; roster rounds keep working.
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec);
        framed.send(Bytes::from(push(commands::PUSH_REQ, &evt))).await.unwrap();
        while let Some(Ok(frame)) = framed.next().await {
            let Ok(envelope) = ClearCodec::decode_request(&frame) else { continue };
            if envelope.command == commands::FRIEND_LIST {
                let page = FriendListResponse { total_count: 0, list: Vec::new() };
                framed.send(Bytes::from(reply(&envelope, &page))).await.unwrap();
            }
        }
    });

    let client = ClientBuilder::new(UIN, "hunter2").config(test_config(addr)).build();
    {
        let member_left = Arc::clone(&member_left);
        client.on_event(move |event| {
            if matches!(event, Event::GroupMemberLeft { .. }) {
                member_left.fetch_add(1, Ordering::SeqCst);
            }
        });
    }
    client.login().await.unwrap();

    sleep(Duration::from_millis(600)).await;
    assert!(client.is_online(), "session must survive the end-of-stream");
    assert_eq!(
        member_left.load(Ordering::SeqCst),
        2,
        "one event per connection: duplicate dropped, cache cleared on reconnect"
    );

    // The re-dialed link still serves correlated requests.
    let friends = client.get_friend_list().await.unwrap();
    assert_eq!(friends.total_count, 0);
}

// ── Receipt correlation ──────────────────────────────────────────

#[tokio::test]
async fn group_send_receives_correlated_receipt() {
    let responder: Responder = Arc::new(|env| match env.command.as_str() {
        commands::SEND_MESSAGE => {
            let req: GroupSendRequest = bincode::deserialize(&env.body).unwrap();
            let receipt = PushGroupMessage {
                group_code: req.group_code,
                group_name: String::new(),
                from_uin: UIN, // own uin → receipt
                from_nick: "tester".into(),
                seq: 8_888,
                rand: req.rand,
                time: 0,
                elements: req.elements,
            };
            vec![push(commands::PUSH_GROUP_MSG, &receipt)]
        }
        _ => baseline(env),
    });
    let client = connected_client(responder).await;

    let sent = client
        .send_group_message(77, SendingMessage::new().append(Element::text("hello")))
        .await
        .unwrap();
    assert_eq!(sent.id, 8_888);
    assert_eq!(sent.group_code, 77);
}

#[tokio::test]
async fn group_send_without_receipt_returns_placeholder_id() {
    let client = connected_client(Arc::new(baseline)).await;
    let started = std::time::Instant::now();
    let sent = client
        .send_group_message(77, SendingMessage::new().append(Element::text("hello")))
        .await
        .unwrap();
    assert_eq!(sent.id, -1, "no receipt → placeholder id");
    assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn private_send_uses_friend_sequence_immediately() {
    let client = connected_client(Arc::new(baseline)).await;
    let first = client
        .send_private_message(55, SendingMessage::new().append(Element::text("hi")))
        .await
        .unwrap();
    let second = client
        .send_private_message(55, SendingMessage::new().append(Element::text("again")))
        .await
        .unwrap();
    assert_eq!(first.id, 22_911);
    assert_eq!(second.id, 22_912);
}

// ── Size classification ──────────────────────────────────────────

#[tokio::test]
async fn oversized_message_is_rejected_without_network() {
    // Not logged in: any network touch would fail with NotConnected,
    // so getting MessageTooLarge proves no send was attempted.
    let client = ClientBuilder::new(UIN, "hunter2").build();
    let big = SendingMessage::new().append(Element::text("x".repeat(5001)));
    assert!(matches!(
        client.send_group_message(1, big).await,
        Err(AukError::MessageTooLarge)
    ));
}

#[tokio::test]
async fn oversized_bundle_is_rejected_without_network() {
    let client = ClientBuilder::new(UIN, "hunter2").build();
    let node = ForwardNode {
        sender_id: 1,
        sender_name: "n".into(),
        time: 0,
        elements: vec![Element::text("x")],
    };
    let bundle = ForwardMessage { nodes: vec![node; 200] };
    assert!(matches!(
        client.send_group_forward_message(1, &bundle).await,
        Err(AukError::BundleTooLarge(200))
    ));
}

// ── Long / forward pipeline ──────────────────────────────────────

fn apply_up_responder(bu_types: Arc<Mutex<Vec<i32>>>) -> Responder {
    Arc::new(move |env| match env.command.as_str() {
        commands::MULTI_APPLY_UP => {
            let req: MultiApplyUpRequest = bincode::deserialize(&env.body).unwrap();
            bu_types.lock().unwrap().push(req.bu_type);
            let ticket = MultiApplyUpResponse {
                msg_resid: "res-777".into(),
                msg_ukey: vec![0xAA],
                msg_sig: vec![0xBB],
                servers: vec![some_server()],
            };
            vec![reply(env, &ticket)]
        }
        commands::SEND_MESSAGE => {
            let req: GroupSendRequest = bincode::deserialize(&env.body).unwrap();
            let receipt = PushGroupMessage {
                group_code: req.group_code,
                group_name: String::new(),
                from_uin: UIN,
                from_nick: "tester".into(),
                seq: 9_001,
                rand: req.rand,
                time: 0,
                elements: req.elements,
            };
            vec![push(commands::PUSH_GROUP_MSG, &receipt)]
        }
        _ => baseline(env),
    })
}

#[tokio::test]
async fn oversized_text_goes_through_long_message_path() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bu_types = Arc::new(Mutex::new(Vec::new()));
    spawn_server(listener, apply_up_responder(Arc::clone(&bu_types)));

    let highway = Arc::new(RecordingHighway::default());
    let client = ClientBuilder::new(UIN, "hunter2")
        .config(test_config(addr))
        .highway(Arc::clone(&highway) as Arc<dyn HighwayTransport>)
        .build();
    client.login().await.unwrap();

    let sent = client
        .send_group_message(55, SendingMessage::new().append(Element::text("x".repeat(800))))
        .await
        .unwrap();

    // Apply-up used the long-message type code.
    assert_eq!(*bu_types.lock().unwrap(), vec![1]);
    // Exactly one highway transfer, business type 27.
    let calls = highway.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, 27);
    // The delivered message is the placeholder embedding the resource id.
    assert_eq!(sent.id, 9_001);
    match &sent.elements[0] {
        Element::Service { template, .. } => assert!(template.contains("res-777")),
        other => panic!("expected placeholder service element, got {other:?}"),
    }
}

#[tokio::test]
async fn forward_bundle_uses_forward_type_and_preview() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bu_types = Arc::new(Mutex::new(Vec::new()));
    spawn_server(listener, apply_up_responder(Arc::clone(&bu_types)));

    let highway = Arc::new(RecordingHighway::default());
    let client = ClientBuilder::new(UIN, "hunter2")
        .config(test_config(addr))
        .highway(Arc::clone(&highway) as Arc<dyn HighwayTransport>)
        .build();
    client.login().await.unwrap();

    let bundle = ForwardMessage {
        nodes: (0..6)
            .map(|i| ForwardNode {
                sender_id: i,
                sender_name: format!("s{i}"),
                time: 0,
                elements: vec![Element::text(format!("m{i}"))],
            })
            .collect(),
    };
    let sent = client.send_group_forward_message(55, &bundle).await.unwrap();

    assert_eq!(*bu_types.lock().unwrap(), vec![2]);
    match &sent.elements[0] {
        Element::Service { template, .. } => {
            assert!(template.contains("res-777"));
            assert!(template.contains("s3: m3"), "preview is built from the first 4 nodes");
            assert!(!template.contains("s4: m4"));
            assert!(template.contains("查看 6 条转发消息"));
        }
        other => panic!("expected placeholder service element, got {other:?}"),
    }
}

#[tokio::test]
async fn forward_download_rebuilds_sender_names() {
    let responder: Responder = Arc::new(|env| match env.command.as_str() {
        commands::MULTI_APPLY_DOWN => {
            let rsp = MultiApplyDownResponse {
                messages: vec![
                    TransmittedMessage {
                        from_uin: 1,
                        msg_type: 82,
                        group_card: "card-name".into(),
                        nickname: "ignored".into(),
                        time: 5,
                        elements: vec![Element::text("a")],
                    },
                    TransmittedMessage {
                        from_uin: 2,
                        msg_type: 9,
                        group_card: "ignored".into(),
                        nickname: "nick-name".into(),
                        time: 6,
                        elements: vec![Element::text("b")],
                    },
                ],
            };
            vec![reply(env, &rsp)]
        }
        _ => baseline(env),
    });
    let client = connected_client(responder).await;

    let bundle = client.get_forward_message("res-777").await.unwrap();
    assert_eq!(bundle.nodes.len(), 2);
    assert_eq!(bundle.nodes[0].sender_name, "card-name");
    assert_eq!(bundle.nodes[1].sender_name, "nick-name");
}

// ── Image upload ─────────────────────────────────────────────────

#[tokio::test]
async fn known_image_hash_skips_highway_entirely() {
    let responder: Responder = Arc::new(|env| match env.command.as_str() {
        commands::GROUP_PIC_UP => {
            let rsp = ImageStoreResponse {
                result_code: 0,
                message: String::new(),
                exists: true,
                resource_id: String::new(),
                upload_key: Vec::new(),
                servers: Vec::new(),
            };
            vec![reply(env, &rsp)]
        }
        _ => baseline(env),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_server(listener, responder);

    let highway = Arc::new(RecordingHighway::default());
    let client = ClientBuilder::new(UIN, "hunter2")
        .config(test_config(addr))
        .highway(Arc::clone(&highway) as Arc<dyn HighwayTransport>)
        .build();
    client.login().await.unwrap();

    let element = client.upload_group_image(9, b"imagebytes").await.unwrap();
    assert!(matches!(element, Element::GroupImage { .. }));
    assert!(highway.calls.lock().unwrap().is_empty(), "dedup must skip the transfer");
}

#[tokio::test]
async fn unknown_image_is_uploaded_with_business_type_two() {
    let responder: Responder = Arc::new(|env| match env.command.as_str() {
        commands::GROUP_PIC_UP => {
            let rsp = ImageStoreResponse {
                result_code: 0,
                message: String::new(),
                exists: false,
                resource_id: String::new(),
                upload_key: vec![0xCC],
                servers: vec![some_server()],
            };
            vec![reply(env, &rsp)]
        }
        _ => baseline(env),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    spawn_server(listener, responder);

    let highway = Arc::new(RecordingHighway::default());
    let client = ClientBuilder::new(UIN, "hunter2")
        .config(test_config(addr))
        .highway(Arc::clone(&highway) as Arc<dyn HighwayTransport>)
        .build();
    client.login().await.unwrap();

    client.upload_group_image(9, b"imagebytes").await.unwrap();
    let calls = highway.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, 2);
    assert_eq!(calls[0].2, b"imagebytes".len());
}

#[tokio::test]
async fn rejected_image_store_surfaces_server_message() {
    let responder: Responder = Arc::new(|env| match env.command.as_str() {
        commands::GROUP_PIC_UP => {
            let rsp = ImageStoreResponse {
                result_code: 193,
                message: "over file size max".into(),
                exists: false,
                resource_id: String::new(),
                upload_key: Vec::new(),
                servers: Vec::new(),
            };
            vec![reply(env, &rsp)]
        }
        _ => baseline(env),
    });
    let client = connected_client(responder).await;

    let err = client.upload_group_image(9, b"huge").await.unwrap_err();
    match err {
        AukError::ServerReject { code, message } => {
            assert_eq!(code, 193);
            assert_eq!(message, "over file size max");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

// ── Roster pagination ────────────────────────────────────────────

fn friend(uin: i64) -> Friend {
    Friend { uin, nickname: format!("f{uin}"), remark: String::new(), face_id: 0 }
}

#[tokio::test]
async fn friend_list_pagination_issues_ceil_requests() {
    const TOTAL: i64 = 310;
    const PAGE: i64 = 150;
    let requests = Arc::new(AtomicUsize::new(0));

    let responder: Responder = {
        let requests = Arc::clone(&requests);
        Arc::new(move |env| match env.command.as_str() {
            commands::FRIEND_LIST => {
                requests.fetch_add(1, Ordering::SeqCst);
                let req: FriendListRequest = bincode::deserialize(&env.body).unwrap();
                assert_eq!(req.count as i64, PAGE);
                let start = req.start as i64;
                let end = (start + PAGE).min(TOTAL);
                let page = FriendListResponse {
                    total_count: TOTAL as i32,
                    list: (start..end).map(friend).collect(),
                };
                vec![reply(env, &page)]
            }
            _ => baseline(env),
        })
    };
    let client = connected_client(responder).await;

    client.reload_friend_list().await.unwrap();
    // ceil(310 / 150) = 3 round-trips, 310 aggregated entries.
    assert_eq!(requests.load(Ordering::SeqCst), 3);
    assert!(client.find_friend(0).is_some());
    assert!(client.find_friend(309).is_some());
    assert!(client.find_friend(310).is_none());
}

fn wire_member(uin: i64, permission: Permission) -> GroupMember {
    GroupMember {
        uin,
        nickname: format!("m{uin}"),
        card_name: String::new(),
        join_time: 0,
        level: 1,
        permission,
        special_title: String::new(),
    }
}

#[tokio::test]
async fn member_pagination_follows_cursor_and_tags_owner() {
    const OWNER: i64 = 42;
    let requests = Arc::new(AtomicUsize::new(0));

    let responder: Responder = {
        let requests = Arc::clone(&requests);
        Arc::new(move |env| match env.command.as_str() {
            commands::MEMBER_LIST => {
                let req: MemberListRequest = bincode::deserialize(&env.body).unwrap();
                let n = requests.fetch_add(1, Ordering::SeqCst);
                let (next_uin, members) = match n {
                    0 => {
                        assert_eq!(req.next_uin, 0);
                        // The owner arrives mis-tagged as a plain member.
                        (100, vec![wire_member(OWNER, Permission::Member), wire_member(2, Permission::Member)])
                    }
                    1 => {
                        assert_eq!(req.next_uin, 100);
                        (0, vec![wire_member(3, Permission::Administrator)])
                    }
                    _ => panic!("pagination must stop at cursor 0"),
                };
                vec![reply(env, &MemberListResponse { next_uin, members })]
            }
            _ => baseline(env),
        })
    };
    let client = connected_client(responder).await;

    let group = Group::new(1000, 2000, "g".into(), OWNER, 3, 200);
    let members = client.get_group_members(&group).await.unwrap();

    assert_eq!(requests.load(Ordering::SeqCst), 2);
    assert_eq!(members.len(), 3);
    let owner = members.iter().find(|m| m.uin == OWNER).unwrap();
    assert_eq!(owner.permission, Permission::Owner, "owner tag overrides the payload");
    assert_eq!(members.iter().filter(|m| m.permission == Permission::Owner).count(), 1);
}
