use serde::{Deserialize, Serialize};

use crate::error::OperationError;

/// Transport-layer protocol for a [`Operation::PortForward`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortProtocol {
    Tcp,
    Udp,
}

/// The purpose of a tunnel session.
///
/// Exactly these four cases; there is no catch-all variant. A `match` over
/// `Operation` without a wildcard arm is a compile error when a new variant
/// is added, which is the point — callers that branch on operation kind are
/// forced to address every one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Run a command in the remote workload.
    Exec { command: String },

    /// Forward a single TCP or UDP port into the workload.
    PortForward { protocol: PortProtocol, port: u16 },

    /// An rsync data session; the command framing is handled above this layer.
    Rsync,

    /// A websocket session relayed opaquely through the tunnel.
    WebSocket,
}

impl Operation {
    /// Builds an [`Operation::Exec`].
    pub fn exec(command: impl Into<String>) -> Self {
        Operation::Exec {
            command: command.into(),
        }
    }

    /// Builds an [`Operation::PortForward`], validating that `port` is in
    /// the registered-or-dynamic range `1..=65535` (port `0` has no meaning
    /// for a forwarded connection).
    pub fn port_forward(protocol: PortProtocol, port: u16) -> Result<Self, OperationError> {
        if port == 0 {
            return Err(OperationError::InvalidPort(port));
        }
        Ok(Operation::PortForward { protocol, port })
    }

    /// Builds an [`Operation::Rsync`].
    pub fn rsync() -> Self {
        Operation::Rsync
    }

    /// Builds an [`Operation::WebSocket`].
    pub fn websocket() -> Self {
        Operation::WebSocket
    }
}
