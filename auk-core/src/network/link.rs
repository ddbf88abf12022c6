//! The coordinator link: dialing, the shared write half, lifecycle
//! phase.
//!
//! Only the session loop reads; any task may write. Writes are
//! serialized by the writer mutex so concurrent senders cannot
//! interleave frames.

use std::sync::Mutex;
use std::time::Instant;

use bytes::Bytes;
use futures::SinkExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Notify;
use tokio_util::codec::FramedWrite;
use tracing::debug;

use crate::codec::FrameCodec;
use crate::error::AukError;
use crate::network::phase::ConnectionPhase;

type FrameWriter = FramedWrite<OwnedWriteHalf, FrameCodec>;

pub(crate) struct Link {
    server_addr: String,
    writer: tokio::sync::Mutex<Option<FrameWriter>>,
    phase: Mutex<ConnectionPhase>,
    /// Signals the session loop to re-dial (heartbeat timeout, forced
    /// offline).
    pub(crate) wake: Notify,
}

impl Link {
    pub(crate) fn new(server_addr: String) -> Self {
        Self {
            server_addr,
            writer: tokio::sync::Mutex::new(None),
            phase: Mutex::new(ConnectionPhase::Disconnected),
            wake: Notify::new(),
        }
    }

    pub(crate) fn phase(&self) -> ConnectionPhase {
        *self.phase.lock().expect("phase poisoned")
    }

    pub(crate) fn set_phase(&self, phase: ConnectionPhase) {
        *self.phase.lock().expect("phase poisoned") = phase;
    }

    /// Dial the coordinator, install the write half and hand the read
    /// half to the caller (the session loop owns it).
    pub(crate) async fn dial(&self) -> Result<OwnedReadHalf, AukError> {
        self.set_phase(ConnectionPhase::Connecting);
        let stream = match TcpStream::connect(&self.server_addr).await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_phase(ConnectionPhase::Disconnected);
                return Err(e.into());
            }
        };
        let (read_half, write_half) = stream.into_split();
        *self.writer.lock().await = Some(FramedWrite::new(write_half, FrameCodec));
        self.set_phase(ConnectionPhase::Online { since: Instant::now() });
        debug!(addr = %self.server_addr, "link established");
        Ok(read_half)
    }

    /// Write one framed request. Serialized across tasks by the writer
    /// lock.
    pub(crate) async fn send(&self, bytes: Vec<u8>) -> Result<(), AukError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(AukError::NotConnected)?;
        writer.send(Bytes::from(bytes)).await.map_err(crate::error::AukError::from)
    }

    /// Drop the write half and mark the link down.
    pub(crate) async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.close().await;
        }
        self.set_phase(ConnectionPhase::Disconnected);
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use tokio::net::TcpListener;
    use tokio_util::codec::FramedRead;

    #[tokio::test]
    async fn dial_send_close() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let link = Link::new(addr.to_string());
        assert!(link.phase().is_disconnected());

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut framed = FramedRead::new(stream, FrameCodec);
            framed.next().await.unwrap().unwrap()
        });

        let _reader = link.dial().await.unwrap();
        assert!(link.phase().is_online());

        link.send(b"ping".to_vec()).await.unwrap();
        assert_eq!(&accept.await.unwrap()[..], b"ping");

        link.close().await;
        assert!(link.phase().is_disconnected());
        assert!(matches!(
            link.send(b"late".to_vec()).await,
            Err(AukError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn failed_dial_returns_to_disconnected() {
        // Bind-then-drop leaves a port nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let link = Link::new(addr.to_string());
        assert!(link.dial().await.is_err());
        assert!(link.phase().is_disconnected());
    }
}
