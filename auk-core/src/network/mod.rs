//! Session engine: the coordinator link, the request/response plumbing
//! and the long-lived loops.
//!
//! [`Engine`] owns everything the concurrent tasks share: the link, the
//! session state, the decoder table, the pending-request table and the
//! event sinks. The public [`Client`] is a thin facade over one
//! `Arc<Engine>`.
//!
//! [`Client`]: crate::client::Client

mod link;
mod loops;
mod phase;

pub use phase::ConnectionPhase;

pub(crate) use link::Link;

use std::sync::Arc;

use tokio::time::timeout;

use crate::config::ClientConfig;
use crate::directory::DirectoryCache;
use crate::dispatch::DecoderTable;
use crate::error::AukError;
use crate::events::{EventBus, ReceiptWaiters};
use crate::highway::HighwayTransport;
use crate::packet::{PacketKind, RequestEnvelope};
use crate::pending::PendingRequests;
use crate::protocol::{commands, encode, Response};
use crate::protocol::messaging::RegisterRequest;
use crate::session::Session;
use crate::wire::WireCodec;

/// Everything one client session shares across its tasks.
pub(crate) struct Engine {
    pub(crate) session: Arc<Session>,
    pub(crate) config: ClientConfig,
    pub(crate) wire: Arc<dyn WireCodec>,
    pub(crate) highway: Arc<dyn HighwayTransport>,
    pub(crate) decoders: Arc<DecoderTable>,
    pub(crate) pending: PendingRequests<Option<Response>>,
    pub(crate) events: EventBus,
    pub(crate) receipts: ReceiptWaiters,
    pub(crate) directory: DirectoryCache,
    pub(crate) link: Link,
    /// Serializes whole-list roster reloads.
    pub(crate) reload_guard: tokio::sync::Mutex<()>,
}

impl Engine {
    pub(crate) fn new(
        session: Session,
        config: ClientConfig,
        wire: Arc<dyn WireCodec>,
        highway: Arc<dyn HighwayTransport>,
        decoders: DecoderTable,
    ) -> Self {
        let link = Link::new(config.server_addr.clone());
        Self {
            session: Arc::new(session),
            config,
            wire,
            highway,
            decoders: Arc::new(decoders),
            pending: PendingRequests::new(),
            events: EventBus::new(),
            receipts: ReceiptWaiters::new(),
            directory: DirectoryCache::new(),
            link,
            reload_guard: tokio::sync::Mutex::new(()),
        }
    }

    // ── Request plumbing ─────────────────────────────────────────

    /// Allocate a transport sequence and assemble the envelope for one
    /// outgoing request.
    pub(crate) fn envelope(&self, kind: PacketKind, command: &str, body: Vec<u8>) -> RequestEnvelope {
        RequestEnvelope {
            uin: self.session.uin,
            kind,
            command: command.to_owned(),
            seq: self.session.seqs.next_transport(),
            session_id: self.session.session_id,
            ksid: self.session.ksid.clone(),
            imei: self.config.imei.clone(),
            body,
        }
    }

    /// Fire-and-forget write.
    pub(crate) async fn send(&self, envelope: &RequestEnvelope) -> Result<(), AukError> {
        let bytes = self.wire.build_request(envelope)?;
        self.link.send(bytes).await
    }

    /// Correlated send: register the waiter, write, then block on the
    /// rendezvous until the dispatcher completes it or the deadline
    /// passes. The waiter is registered before the write so a fast
    /// response cannot race the registration, and it is removed on
    /// every exit path.
    pub(crate) async fn send_and_wait(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<Option<Response>, AukError> {
        let seq = envelope.seq;
        let bytes = self.wire.build_request(envelope)?;
        let rx = self.pending.register(seq);

        if let Err(e) = self.link.send(bytes).await {
            self.pending.discard(seq);
            return Err(e);
        }

        let deadline = self.config.request_timeout();
        match timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AukError::ChannelClosed),
            Err(_) => {
                self.pending.discard(seq);
                Err(AukError::Timeout(deadline))
            }
        }
    }

    /// Post-(re)connect client registration; success is signaled purely
    /// by packet arrival, so nothing waits on it.
    pub(crate) async fn register_client(&self) -> Result<(), AukError> {
        let body = encode(&RegisterRequest { uin: self.session.uin, status: 11 })?;
        let envelope = self.envelope(PacketKind::Login, commands::REGISTER, body);
        self.send(&envelope).await
    }
}
