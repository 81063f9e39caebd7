use serde::{Deserialize, Serialize};

/// Which RPC service a tunnel opens a stream against.
///
/// A [`crate::Tunnel`](crate) binds its role at construction time; the role
/// never changes for the lifetime of the session. The router pairs a
/// `User`-rolled stream with an `Agent`-rolled stream that share the same
/// `session_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Opens a stream against the user-facing RPC service (typically a CLI).
    User,
    /// Opens a stream against the agent-facing RPC service (inside the workload).
    Agent,
}
