//! # auk-core
//!
//! Client engine for the auk instant-messaging protocol: one persistent
//! TCP session against a coordinator, with reconnection, request/response
//! correlation, command dispatch, heartbeat keepalive and the chunked
//! "highway" bulk-upload channel.
//!
//! This crate contains:
//! - **Session engine**: read loop, reconnect, heartbeat, write-serialized link
//! - **Correlation**: `PendingRequests` — sequence id → one-shot rendezvous
//! - **Dispatch**: immutable command-name → decoder table
//! - **Sequencing**: `SequenceSpaces` — the six independent counters
//! - **Messaging**: inline sends with receipt correlation, long/forward
//!   split path, image upload with hash dedup
//! - **Directory**: friend/group/member caches with per-group locking
//! - **Contracts**: `WireCodec` and `HighwayTransport` seams with
//!   reference implementations (`ClearCodec`, `TcpHighway`)
//! - **Error**: `AukError` — typed, `thiserror`-based error hierarchy

pub mod client;
pub mod codec;
pub mod config;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod highway;
pub mod message;
pub mod network;
pub mod packet;
pub mod pending;
pub mod protocol;
pub mod seq;
pub mod session;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use client::{Client, ClientBuilder};
pub use codec::{FrameCodec, FrameError, MAX_FRAME_SIZE};
pub use config::{ClientConfig, DEFAULT_SERVER};
pub use directory::{DirectoryCache, Friend, Group, GroupMember, Permission};
pub use dispatch::{DecodeContext, Decoded, DecoderFn, DecoderTable};
pub use error::AukError;
pub use events::{Event, EventBus, HandlerId};
pub use highway::{HighwayTransport, TcpHighway};
pub use message::{
    Element, ForwardMessage, ForwardNode, GroupMessage, PrivateMessage, Sender, SendingMessage,
};
pub use network::ConnectionPhase;
pub use packet::{PacketFlags, PacketKind, RequestEnvelope, TransportPacket};
pub use pending::PendingRequests;
pub use protocol::{default_decoder_table, Response, ServerAddr};
pub use seq::SequenceSpaces;
pub use session::Session;
pub use wire::{ClearCodec, WireCodec};
