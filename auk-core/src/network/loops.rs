//! The long-lived session tasks: read loop, reconnection, per-packet
//! dispatch and the heartbeat.

use std::io::ErrorKind;
use std::sync::Arc;

use tokio::net::tcp::OwnedReadHalf;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::codec::{read_frame, FrameError};
use crate::dispatch::{DecodeContext, Decoded};
use crate::error::AukError;
use crate::events::Event;
use crate::network::Engine;
use crate::network::phase::ConnectionPhase;
use crate::packet::{PacketFlags, PacketKind, TransportPacket};
use crate::protocol::commands;

/// Read errors that mean the peer went away, as opposed to a garbled
/// length prefix or a transient read failure.
fn is_stream_end(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

impl Engine {
    /// The session read loop. Runs until the online flag clears or an
    /// unrecoverable transport failure exhausts the reconnect attempt.
    ///
    /// Emits the `Disconnected` event exactly once, on exit.
    pub(crate) async fn run_session_loop(self: Arc<Self>, mut reader: OwnedReadHalf) {
        let mut soft_errors: u32 = 0;
        while self.session.is_online() {
            let result = tokio::select! {
                result = read_frame(&mut reader) => result,
                _ = self.link.wake.notified() => {
                    if !self.session.is_online() {
                        break;
                    }
                    match self.reconnect().await {
                        Some(fresh) => {
                            reader = fresh;
                            continue;
                        }
                        None => break,
                    }
                }
            };

            match result {
                // Peer hung up: one reconnect attempt, then give up.
                Err(FrameError::Io(e)) if is_stream_end(e.kind()) => {
                    match self.reconnect().await {
                        Some(fresh) => reader = fresh,
                        None => break,
                    }
                }
                // Garbled prefix or transient read failure: back off and
                // retry, bounded by the consecutive-error ceiling.
                Err(e) => {
                    soft_errors += 1;
                    debug!(error = %e, soft_errors, "soft read error");
                    sleep(self.config.soft_error_backoff()).await;
                    if soft_errors > self.config.soft_error_limit {
                        warn!("soft error ceiling reached; tearing session down");
                        self.session.set_online(false);
                    }
                }
                Ok(frame) => {
                    let d2_key = self.session.sig.lock().expect("sig poisoned").d2_key.clone();
                    let mut packet = match self.wire.parse_incoming(&frame, &d2_key) {
                        Ok(packet) => packet,
                        Err(e) => {
                            warn!(error = %e, "parse incoming packet error");
                            continue;
                        }
                    };
                    if packet.body_encrypted() {
                        match self.wire.decrypt_body(&packet.payload, &self.session.random_key) {
                            Ok(plain) => {
                                packet.payload = plain;
                                packet.flags.remove(PacketFlags::BODY_ENCRYPTED);
                            }
                            Err(_) => {
                                // Undecryptable frames cannot be attributed
                                // to any pending request; drop them.
                                debug!(command = %packet.command, "dropping undecryptable packet");
                                continue;
                            }
                        }
                    }
                    soft_errors = 0;

                    // Dispatch off the read loop; one bad packet must not
                    // stall or kill frame consumption.
                    let engine = Arc::clone(&self);
                    tokio::spawn(async move {
                        engine.dispatch(packet);
                    });
                }
            }
        }

        self.link.close().await;
        self.session.set_online(false);
        self.events.emit(&Event::Disconnected { message: self.session.disconnect_reason() });
        info!("session loop finished");
    }

    /// One re-dial attempt. On success the connection-scoped dedup
    /// cache is cleared and the client re-registers.
    async fn reconnect(&self) -> Option<OwnedReadHalf> {
        self.link.set_phase(ConnectionPhase::Reconnecting);
        match self.link.dial().await {
            Ok(reader) => {
                self.session.reset_connection_state();
                if let Err(e) = self.register_client().await {
                    debug!(error = %e, "re-register failed");
                }
                info!("reconnected to coordinator");
                Some(reader)
            }
            Err(e) => {
                warn!(error = %e, "reconnect failed");
                None
            }
        }
    }

    // ── Per-packet dispatch ──────────────────────────────────────

    pub(crate) fn dispatch(&self, packet: TransportPacket) {
        let Some(decoder) = self.decoders.get(&packet.command) else {
            // No decoder: arrival itself is the acknowledgement, if
            // anyone is waiting for this sequence.
            if self.pending.complete(packet.seq, Ok(None)) {
                trace!(command = %packet.command, seq = packet.seq, "bare acknowledgement");
            } else {
                trace!(command = %packet.command, "dropping unhandled push");
            }
            return;
        };

        let ctx = DecodeContext { session: self.session.as_ref() };
        match decoder(&ctx, packet.seq, &packet.payload) {
            Ok(Decoded::Response(response)) => {
                self.pending.complete(packet.seq, Ok(Some(response)));
            }
            Ok(Decoded::Ack) => {
                self.pending.complete(packet.seq, Ok(None));
            }
            Ok(Decoded::Receipt { rand, seq }) => {
                self.receipts.deliver(rand, seq);
            }
            Ok(Decoded::Event(event)) => {
                self.route_event(event);
            }
            Err(e) => {
                warn!(command = %packet.command, error = %e, "decode error");
                // Do not leave a caller hanging on a garbled response.
                self.pending.complete(packet.seq, Err(e));
            }
        }
    }

    /// Apply cache side effects, then fan the event out to subscribers.
    fn route_event(&self, event: Event) {
        match &event {
            Event::GroupMemberLeft { group_code, member_uin } => {
                if let Some(group) = self.directory.find_group(*group_code) {
                    group.remove_member(*member_uin);
                }
            }
            Event::ForceOffline { .. } => {
                // Reason was already recorded by the decoder. Clear the
                // online flag and wake the read loop so it exits.
                self.session.set_online(false);
                self.link.wake.notify_one();
            }
            _ => {}
        }
        self.events.emit(&event);
    }

    // ── Heartbeat ────────────────────────────────────────────────

    /// Periodic keepalive. The result is discarded; a timeout nudges
    /// the session loop into a proactive re-dial instead of waiting
    /// for the dead link to surface elsewhere.
    pub(crate) async fn run_heartbeat(self: Arc<Self>) {
        loop {
            sleep(self.config.heartbeat_interval()).await;
            if !self.session.is_online() {
                break;
            }
            let envelope = self.envelope(PacketKind::Login, commands::HEARTBEAT, Vec::new());
            match self.send_and_wait(&envelope).await {
                Ok(_) => trace!("heartbeat ok"),
                Err(AukError::Timeout(_)) => {
                    warn!("heartbeat timed out; forcing reconnect");
                    self.link.wake.notify_one();
                }
                Err(e) => debug!(error = %e, "heartbeat failed"),
            }
        }
    }
}
