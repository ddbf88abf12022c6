//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default coordinator address the session dials.
pub const DEFAULT_SERVER: &str = "125.94.60.146:80";

/// Tunable knobs for a client session.
///
/// Everything here has a protocol-faithful default; embedders normally
/// only override `server_addr` (e.g. to point at a test coordinator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Coordinator address (IP:port) for the persistent TCP session.
    pub server_addr: String,

    /// Device IMEI echoed on every outgoing envelope.
    pub imei: String,

    /// Deadline for a correlated request/response round, in milliseconds.
    pub request_timeout_ms: u64,

    /// How long a group send waits for its receipt before returning the
    /// placeholder message id, in milliseconds.
    pub receipt_timeout_ms: u64,

    /// Keepalive period, in milliseconds.
    pub heartbeat_interval_ms: u64,

    /// Consecutive soft read errors tolerated before the session is torn
    /// down.
    pub soft_error_limit: u32,

    /// Pause after a soft read error, in milliseconds.
    pub soft_error_backoff_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER.into(),
            imei: "468356291846738".into(),
            request_timeout_ms: 15_000,
            receipt_timeout_ms: 5_000,
            heartbeat_interval_ms: 30_000,
            soft_error_limit: 10,
            soft_error_backoff_ms: 3_000,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn receipt_timeout(&self) -> Duration {
        Duration::from_millis(self.receipt_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn soft_error_backoff(&self) -> Duration {
        Duration::from_millis(self.soft_error_backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.server_addr, DEFAULT_SERVER);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.receipt_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(cfg.soft_error_limit, 10);
    }
}
