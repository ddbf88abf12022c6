//! Command-to-decoder dispatch table.
//!
//! The table is assembled once at client construction and shared
//! read-only across all inbound packets. Commands without a registered
//! decoder are treated as bare acknowledgements when a caller is
//! waiting, and silently dropped otherwise — server pushes outnumber
//! client-correlated responses, so an unknown command is not an error.

use std::collections::HashMap;

use crate::error::AukError;
use crate::events::Event;
use crate::protocol::Response;
use crate::session::Session;

/// What a decoder produced from one packet.
#[derive(Debug)]
pub enum Decoded {
    /// A typed response for the caller waiting on this sequence id.
    Response(Response),
    /// A server push for the event bus.
    Event(Event),
    /// A group-send receipt, routed to the transient receipt waiters.
    Receipt { rand: u32, seq: i32 },
    /// Packet processed, nothing to deliver beyond completing a waiter.
    Ack,
}

/// State a decoder may read or update while parsing.
pub struct DecodeContext<'a> {
    pub session: &'a Session,
}

/// One decode function per command name.
pub type DecoderFn = fn(&DecodeContext<'_>, u16, &[u8]) -> Result<Decoded, AukError>;

/// Immutable command-name → decoder mapping.
pub struct DecoderTable {
    map: HashMap<&'static str, DecoderFn>,
}

impl DecoderTable {
    pub fn builder() -> DecoderTableBuilder {
        DecoderTableBuilder { map: HashMap::new() }
    }

    pub fn get(&self, command: &str) -> Option<DecoderFn> {
        self.map.get(command).copied()
    }

    pub fn contains(&self, command: &str) -> bool {
        self.map.contains_key(command)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Builder consumed into the frozen table.
pub struct DecoderTableBuilder {
    map: HashMap<&'static str, DecoderFn>,
}

impl DecoderTableBuilder {
    /// Register a decoder; a later registration for the same command
    /// replaces the earlier one.
    pub fn register(mut self, command: &'static str, decoder: DecoderFn) -> Self {
        self.map.insert(command, decoder);
        self
    }

    pub fn build(self) -> DecoderTable {
        DecoderTable { map: self.map }
    }
}

// ── Tests ────────────────────────────────────────────────────────
