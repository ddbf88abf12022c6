//! The public client surface.
//!
//! [`Client`] wraps one session [`Engine`] and exposes the operation
//! set: login, messaging, media upload, roster management and the
//! system-message answers. Construction goes through [`ClientBuilder`],
//! which is where deployments inject their wire codec, highway
//! transport and decoder table.

mod media;
mod messages;
mod roster;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use crate::config::ClientConfig;
use crate::directory::{Friend, Group};
use crate::dispatch::DecoderTable;
use crate::error::AukError;
use crate::events::{Event, HandlerId, NewFriendRequest};
use crate::highway::{HighwayTransport, TcpHighway};
use crate::network::{ConnectionPhase, Engine};
use crate::packet::PacketKind;
use crate::protocol::{commands, default_decoder_table, encode, Response};
use crate::protocol::login::{CaptchaSubmitRequest, LoginRequest, LoginResponse};
use crate::protocol::messaging::{FriendSystemAction, GroupSystemAction, SyncRequest};
use crate::protocol::push::GroupSystemMessage;
use crate::session::Session;
use crate::wire::{ClearCodec, WireCodec};

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ── Builder ──────────────────────────────────────────────────────

/// Assembles a [`Client`] with its injected collaborators.
pub struct ClientBuilder {
    uin: i64,
    password_digest: [u8; 16],
    config: ClientConfig,
    wire: Arc<dyn WireCodec>,
    highway: Arc<dyn HighwayTransport>,
    decoders: Option<DecoderTable>,
}

impl ClientBuilder {
    /// Start from account credentials. The password is digested
    /// immediately and never stored in clear.
    pub fn new(uin: i64, password: &str) -> Self {
        let mut digest = [0u8; 16];
        digest.copy_from_slice(&blake3::hash(password.as_bytes()).as_bytes()[..16]);
        Self::with_password_digest(uin, digest)
    }

    /// Start from a precomputed password digest.
    pub fn with_password_digest(uin: i64, password_digest: [u8; 16]) -> Self {
        Self {
            uin,
            password_digest,
            config: ClientConfig::default(),
            wire: Arc::new(ClearCodec),
            highway: Arc::new(TcpHighway::new()),
            decoders: None,
        }
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn wire_codec(mut self, wire: Arc<dyn WireCodec>) -> Self {
        self.wire = wire;
        self
    }

    pub fn highway(mut self, highway: Arc<dyn HighwayTransport>) -> Self {
        self.highway = highway;
        self
    }

    /// Replace the decoder table (frozen from here on).
    pub fn decoders(mut self, decoders: DecoderTable) -> Self {
        self.decoders = Some(decoders);
        self
    }

    pub fn build(self) -> Client {
        let session = Session::new(self.uin, self.password_digest);
        let decoders = self.decoders.unwrap_or_else(default_decoder_table);
        Client {
            engine: Arc::new(Engine::new(
                session,
                self.config,
                self.wire,
                self.highway,
                decoders,
            )),
        }
    }
}

// ── Client ───────────────────────────────────────────────────────

/// One authenticated session against the coordinator.
///
/// Cloning is cheap; all clones drive the same session.
#[derive(Clone)]
pub struct Client {
    pub(crate) engine: Arc<Engine>,
}

impl Client {
    pub fn builder(uin: i64, password: &str) -> ClientBuilder {
        ClientBuilder::new(uin, password)
    }

    // ── Introspection ────────────────────────────────────────────

    pub fn uin(&self) -> i64 {
        self.engine.session.uin
    }

    pub fn nickname(&self) -> String {
        self.engine.session.nickname.lock().expect("nickname poisoned").clone()
    }

    pub fn is_online(&self) -> bool {
        self.engine.session.is_online()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.engine.link.phase()
    }

    // ── Events ───────────────────────────────────────────────────

    /// Subscribe to push events; the handler runs on dispatch tasks and
    /// must not block.
    pub fn on_event<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.engine.events.subscribe(handler)
    }

    pub fn off_event(&self, id: HandlerId) {
        self.engine.events.unsubscribe(id);
    }

    // ── Session lifecycle ────────────────────────────────────────

    /// Dial the coordinator and run the credential handshake.
    ///
    /// On success the session loop and heartbeat are already running;
    /// when the response asks for captcha verification, complete the
    /// login with [`Client::submit_captcha`].
    pub async fn login(&self) -> Result<LoginResponse, AukError> {
        if self.engine.session.is_online() {
            return Err(AukError::AlreadyOnline);
        }
        let reader = self.engine.link.dial().await?;
        self.engine.session.reset_connection_state();
        self.engine.session.set_online(true);
        tokio::spawn(Arc::clone(&self.engine).run_session_loop(reader));

        let body = encode(&LoginRequest {
            uin: self.engine.session.uin,
            password_digest: self.engine.session.password_digest,
        })?;
        let envelope = self.engine.envelope(PacketKind::Login, commands::LOGIN, body);
        let response = match self.engine.send_and_wait(&envelope).await? {
            Some(Response::Login(response)) => response,
            _ => return Err(AukError::UnexpectedResponse { command: commands::LOGIN }),
        };

        if response.success {
            self.engine.session.clear_disconnect_reason();
            self.finish_login(true).await;
        }
        Ok(response)
    }

    /// Answer a captcha challenge raised by [`Client::login`].
    pub async fn submit_captcha(
        &self,
        result: &str,
        sign: &[u8],
    ) -> Result<LoginResponse, AukError> {
        let body = encode(&CaptchaSubmitRequest { result: result.to_owned(), sign: sign.to_vec() })?;
        let envelope = self.engine.envelope(PacketKind::Login, commands::LOGIN, body);
        let response = match self.engine.send_and_wait(&envelope).await? {
            Some(Response::Login(response)) => response,
            _ => return Err(AukError::UnexpectedResponse { command: commands::LOGIN }),
        };
        if response.success {
            self.finish_login(false).await;
        }
        Ok(response)
    }

    async fn finish_login(&self, sync_kick: bool) {
        if let Err(e) = self.engine.register_client().await {
            debug!(error = %e, "client registration failed");
        }
        tokio::spawn(Arc::clone(&self.engine).run_heartbeat());
        if sync_kick {
            // Best effort: prime the message-sync cursor.
            if let Ok(body) = encode(&SyncRequest { sync_flag: 0, time: unix_now() }) {
                let envelope = self.engine.envelope(PacketKind::Simple, commands::GET_MESSAGE, body);
                let _ = self.engine.send_and_wait(&envelope).await;
            }
        }
    }

    // ── Directory lookups ────────────────────────────────────────

    /// Cached friend list (see [`Client::reload_friend_list`]).
    pub fn friends(&self) -> Vec<Arc<Friend>> {
        self.engine.directory.friends()
    }

    /// Cached group list (see [`Client::reload_group_list`]).
    pub fn groups(&self) -> Vec<Arc<Group>> {
        self.engine.directory.groups()
    }

    pub fn find_friend(&self, uin: i64) -> Option<Arc<Friend>> {
        self.engine.directory.find_friend(uin)
    }

    pub fn find_group(&self, code: i64) -> Option<Arc<Group>> {
        self.engine.directory.find_group(code)
    }

    pub fn find_group_by_uin(&self, uin: i64) -> Option<Arc<Group>> {
        self.engine.directory.find_group_by_uin(uin)
    }

    // ── System messages ──────────────────────────────────────────

    /// Answer a group join request or invitation. Fire-and-forget; the
    /// server's acknowledgement has no decoder.
    pub async fn solve_group_join_request(
        &self,
        request: &GroupSystemMessage,
        accept: bool,
    ) -> Result<(), AukError> {
        let action = match request {
            GroupSystemMessage::Join(req) => GroupSystemAction {
                request_id: req.request_id,
                requester_uin: req.requester_uin,
                group_code: req.group_code,
                is_invite: false,
                accept,
                block: false,
            },
            GroupSystemMessage::Invite(req) => GroupSystemAction {
                request_id: req.request_id,
                requester_uin: req.invitor_uin,
                group_code: req.group_code,
                is_invite: true,
                accept,
                block: false,
            },
        };
        let body = encode(&action)?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::SYSTEM_MSG_GROUP, body);
        self.engine.send(&envelope).await
    }

    /// Answer a friend request. Fire-and-forget.
    pub async fn solve_friend_request(
        &self,
        request: &NewFriendRequest,
        accept: bool,
    ) -> Result<(), AukError> {
        let body = encode(&FriendSystemAction {
            request_id: request.request_id,
            requester_uin: request.requester_uin,
            accept,
        })?;
        let envelope = self.engine.envelope(PacketKind::Simple, commands::SYSTEM_MSG_FRIEND, body);
        self.engine.send(&envelope).await
    }
}
