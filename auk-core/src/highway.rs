//! Highway chunk-transfer: the bulk upload channel for images and
//! long/forward message bodies.
//!
//! The engine drives the two-phase protocol (apply for a ticket, then
//! upload to one of the returned candidate servers); the transfer
//! itself sits behind [`HighwayTransport`]. [`TcpHighway`] is the
//! reference implementation over a plain TCP stream.
//!
//! ## Reference wire format (one framed message per line)
//!
//! ```text
//! Client ──[UploadHeader]────────────► Server
//!   ticket, business_type, total_size, chunk_count, body hash
//!
//! Client ──[UploadChunk]─────────────► Server   (repeated, in order)
//!   index, offset, data (≤ 64 KiB)
//!
//! Server ──[UploadAck]───────────────► Client
//!   result_code (0 = accepted), message
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::debug;

use crate::codec::FrameCodec;
use crate::error::AukError;
use crate::protocol::ServerAddr;

/// Chunk payload ceiling (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// The externally-defined bulk transfer: ship `body` to `server`,
/// authenticated by the upload ticket signature.
#[async_trait]
pub trait HighwayTransport: Send + Sync + 'static {
    async fn upload(
        &self,
        server: &ServerAddr,
        ticket: &[u8],
        body: &[u8],
        business_type: u32,
    ) -> Result<(), AukError>;
}

// ── Reference implementation ─────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadHeader {
    pub business_type: u32,
    pub ticket: Vec<u8>,
    pub total_size: u64,
    pub chunk_count: u32,
    pub hash: [u8; 32],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadChunk {
    pub index: u32,
    pub offset: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadAck {
    pub result_code: u32,
    pub message: String,
}

/// Reference [`HighwayTransport`] over framed TCP.
#[derive(Debug, Clone)]
pub struct TcpHighway {
    chunk_size: usize,
}

impl TcpHighway {
    pub fn new() -> Self {
        Self { chunk_size: CHUNK_SIZE }
    }

    /// Override the chunk size (tests use small bodies).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        assert!(chunk_size > 0);
        self.chunk_size = chunk_size;
        self
    }
}

impl Default for TcpHighway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HighwayTransport for TcpHighway {
    async fn upload(
        &self,
        server: &ServerAddr,
        ticket: &[u8],
        body: &[u8],
        business_type: u32,
    ) -> Result<(), AukError> {
        let stream = TcpStream::connect(server.to_dial_string()).await?;
        let mut framed = Framed::new(stream, FrameCodec);

        let chunk_count = body.len().div_ceil(self.chunk_size).max(1) as u32;
        let header = UploadHeader {
            business_type,
            ticket: ticket.to_vec(),
            total_size: body.len() as u64,
            chunk_count,
            hash: *blake3::hash(body).as_bytes(),
        };
        send_frame(&mut framed, &header).await?;

        let mut offset = 0u64;
        for (index, data) in body.chunks(self.chunk_size.max(1)).enumerate() {
            let chunk = UploadChunk { index: index as u32, offset, data: data.to_vec() };
            offset += data.len() as u64;
            send_frame(&mut framed, &chunk).await?;
        }
        if body.is_empty() {
            send_frame(&mut framed, &UploadChunk { index: 0, offset: 0, data: Vec::new() }).await?;
        }

        let frame = match framed.next().await {
            Some(Ok(frame)) => frame,
            Some(Err(e)) => return Err(AukError::Encoding(e.to_string())),
            None => return Err(AukError::ChannelClosed),
        };
        let ack: UploadAck =
            bincode::deserialize(&frame).map_err(|e| AukError::Encoding(e.to_string()))?;
        if ack.result_code != 0 {
            return Err(AukError::ServerReject {
                code: ack.result_code as i32,
                message: ack.message,
            });
        }
        Ok(())
    }
}

async fn send_frame<T: Serialize>(
    framed: &mut Framed<TcpStream, FrameCodec>,
    value: &T,
) -> Result<(), AukError> {
    let bytes = bincode::serialize(value).map_err(|e| AukError::Encoding(e.to_string()))?;
    framed
        .send(Bytes::from(bytes))
        .await
        .map_err(|e| AukError::Encoding(e.to_string()))
}

// ── Candidate iteration ──────────────────────────────────────────

/// Try each candidate server in order; the first accepted transfer
/// wins. No parallel fan-out, no retry after the list is exhausted.
pub async fn upload_to_any(
    transport: &dyn HighwayTransport,
    servers: &[ServerAddr],
    ticket: &[u8],
    body: &[u8],
    business_type: u32,
) -> Result<(), AukError> {
    for server in servers {
        match transport.upload(server, ticket, body, business_type).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                debug!(server = %server.to_dial_string(), error = %e, "highway candidate failed");
            }
        }
    }
    Err(AukError::UploadFailed)
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    fn addr_of(sock: SocketAddr) -> ServerAddr {
        let ip = match sock.ip() {
            std::net::IpAddr::V4(v4) => u32::from_le_bytes(v4.octets()),
            std::net::IpAddr::V6(_) => unreachable!("tests bind v4"),
        };
        ServerAddr { ip, port: sock.port() as u32 }
    }

    /// Accept one upload, verify reassembly, answer with `result_code`.
    async fn mock_highway_server(listener: TcpListener, result_code: u32) {
        let (stream, _) = listener.accept().await.unwrap();
        let mut framed = Framed::new(stream, FrameCodec);

        let header: UploadHeader =
            bincode::deserialize(&framed.next().await.unwrap().unwrap()).unwrap();
        let mut body = Vec::with_capacity(header.total_size as usize);
        for _ in 0..header.chunk_count {
            let chunk: UploadChunk =
                bincode::deserialize(&framed.next().await.unwrap().unwrap()).unwrap();
            assert_eq!(chunk.offset as usize, body.len());
            body.extend_from_slice(&chunk.data);
        }
        assert_eq!(body.len() as u64, header.total_size);
        assert_eq!(*blake3::hash(&body).as_bytes(), header.hash);

        let ack = UploadAck { result_code, message: String::new() };
        framed.send(Bytes::from(bincode::serialize(&ack).unwrap())).await.unwrap();
    }

    #[tokio::test]
    async fn upload_chunks_and_succeeds() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = addr_of(listener.local_addr().unwrap());
        let handle = tokio::spawn(mock_highway_server(listener, 0));

        let body = vec![0xCD; 10_000];
        let hw = TcpHighway::new().with_chunk_size(4096); // forces 3 chunks
        hw.upload(&server, b"sig", &body, 27).await.unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn rejected_upload_surfaces_server_code() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = addr_of(listener.local_addr().unwrap());
        tokio::spawn(mock_highway_server(listener, 193));

        let err = TcpHighway::new().upload(&server, b"sig", b"data", 2).await.unwrap_err();
        assert!(matches!(err, AukError::ServerReject { code: 193, .. }));
    }

    #[tokio::test]
    async fn upload_to_any_falls_through_to_working_server() {
        // First candidate: a listener that is immediately dropped, so
        // the dial fails. Second candidate: a real server.
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = addr_of(dead.local_addr().unwrap());
        drop(dead);

        let live = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let live_addr = addr_of(live.local_addr().unwrap());
        tokio::spawn(mock_highway_server(live, 0));

        let hw = TcpHighway::new();
        upload_to_any(&hw, &[dead_addr, live_addr], b"sig", b"payload", 2)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn upload_to_any_fails_when_all_candidates_fail() {
        let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead_addr = addr_of(dead.local_addr().unwrap());
        drop(dead);

        let hw = TcpHighway::new();
        let err = upload_to_any(&hw, &[dead_addr], b"sig", b"payload", 2).await.unwrap_err();
        assert!(matches!(err, AukError::UploadFailed));
    }
}
