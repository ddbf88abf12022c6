//! Connection lifecycle state.

use std::time::Instant;

/// The current phase of the coordinator link.
///
/// ```text
///  Disconnected ──► Connecting ──► Online ◄──► Reconnecting
///       ▲                             │              │
///       └─────────────────────────────┴──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionPhase {
    /// No active connection. Initial / terminal state.
    #[default]
    Disconnected,

    /// TCP dial in progress.
    Connecting,

    /// Link established; session traffic flowing.
    Online {
        /// When the link came up.
        since: Instant,
    },

    /// Mid-session re-dial after a transport failure.
    Reconnecting,
}

impl std::fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Online { .. } => write!(f, "Online"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

impl ConnectionPhase {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// How long the link has been up. `None` in any other phase.
    pub fn online_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Online { since } => Some(since.elapsed()),
            _ => None,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
