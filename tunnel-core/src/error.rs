//! Error types for the tunnel endpoint, the dial path, and the pump.
//!
//! Each is generic over `E`, the underlying [`crate::TunnelStream::Error`],
//! so a caller dialing over TCP sees `io::Error` variants and a caller
//! dialing over the in-memory mock sees `Infallible` ones, without this
//! crate committing to one transport's error type.

use std::sync::Arc;

use thiserror::Error;

/// Errors a [`crate::Tunnel`] can return from its own methods.
#[derive(Debug, Error)]
pub enum TunnelError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// The underlying stream's send half failed.
    #[error("tunnel send failed: {0}")]
    Send(#[source] E),

    /// The underlying stream's receive half failed.
    #[error("tunnel recv failed: {0}")]
    Recv(#[source] E),

    /// A frame could not be decoded off the wire.
    #[error("malformed frame: {0}")]
    Protocol(#[from] tunnel_protocol::ProtocolError),

    /// A `Send`/`Write` was attempted after [`crate::Tunnel::close`] was
    /// called on this side.
    #[error("tunnel is closed")]
    Closed,
}

/// Errors [`crate::dial`] can return before a [`crate::Tunnel`] exists.
#[derive(Debug, Error)]
pub enum DialError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// `TunnelConfig` validation failed (a required field was empty).
    #[error("invalid dial configuration: {0}")]
    InvalidConfig(#[from] tunnel_protocol::ConfigError),

    /// The `Init` frame could not be sent on the newly opened stream.
    #[error("failed to send init frame: {0}")]
    SendInit(#[source] E),

    /// The connect-timeout elapsed before a stream could be opened.
    #[error("dial timed out")]
    Timeout,

    /// The caller's cancellation token fired before the dial completed.
    #[error("dial cancelled")]
    Cancelled,

    /// The transport-specific `connect` step itself failed.
    #[error("transport connect failed: {0}")]
    Connect(#[source] E),
}

/// One direction's outcome from the bidirectional pump, folded into
/// [`TransferFailed`] by [`crate::copy_bidirectional`].
#[derive(Debug, Error)]
pub enum TransferError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("{0}")]
    Tunnel(Arc<TunnelError<E>>),

    #[error("local I/O error: {0}")]
    Local(#[source] std::io::Error),
}

/// Reports which direction(s) of a bidirectional pump failed.
///
/// A clean shutdown (either side reaching EOF with no error) never produces
/// this; `copy_bidirectional` only returns `Err` when at least one direction
/// failed for a reason other than EOF.
#[derive(Debug, Error)]
#[error("bidirectional copy failed (tunnel->local: {tunnel_to_local:?}, local->tunnel: {local_to_tunnel:?})")]
pub struct TransferFailed<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    pub tunnel_to_local: Option<TransferError<E>>,
    pub local_to_tunnel: Option<TransferError<E>>,
}

/// Errors from a single pump direction's task, before they're folded into
/// [`TransferFailed`].
#[derive(Debug, Error)]
pub enum PumpError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Transfer(#[from] TransferError<E>),

    /// The other direction failed first and this task observed cancellation
    /// before hitting its own error or EOF. Not surfaced as a top-level
    /// `TransferFailed` entry — it's the expected shape of "the peer died".
    #[error("cancelled by peer direction")]
    Cancelled,
}

impl<E> PumpError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    pub fn from_transfer(e: impl Into<TransferError<E>>) -> Self {
        PumpError::Transfer(e.into())
    }
}
