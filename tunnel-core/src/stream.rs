//! The Stream Adapter: a uniform capability set over the two role-specific
//! RPC streams a tunnel can be dialed against.
//!
//! Exposes `{Send, Recv, CloseSend}` split into [`TunnelSender`] and
//! [`TunnelReceiver`] halves produced by [`TunnelStream::into_split`] —
//! the same shape `tokio::net::TcpStream::into_split` gives you, and the
//! one a tunnel needs anyway: one concurrent reader and one concurrent
//! writer, which only a split stream can give two independent pump tasks
//! without them fighting over a single `&mut self`.

use async_trait::async_trait;
use tunnel_protocol::Frame;

/// The send half of a role-specific stream.
#[async_trait]
pub trait TunnelSender: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Pushes a frame to the stream. No copy of the frame's bytes is
    /// required of the implementation.
    async fn send(&mut self, frame: Frame) -> Result<(), Self::Error>;

    /// Half-closes the send side. Idempotent at the transport level is not
    /// required — the `Tunnel` above this trait only ever calls it once.
    async fn close_send(&mut self) -> Result<(), Self::Error>;
}

/// The receive half of a role-specific stream.
#[async_trait]
pub trait TunnelReceiver: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the next frame, or `None` on clean stream EOF.
    async fn recv(&mut self) -> Result<Option<Frame>, Self::Error>;
}

/// A role-specific RPC stream, splittable into independent send/receive
/// halves. `Dial` opens a concrete `TunnelStream` for the chosen
/// [`tunnel_protocol::Role`] and hands it to [`crate::dial`], which wraps
/// it in a [`crate::Tunnel`].
pub trait TunnelStream: Send + 'static {
    type Error: std::error::Error + Send + Sync + 'static;
    type Sender: TunnelSender<Error = Self::Error>;
    type Receiver: TunnelReceiver<Error = Self::Error>;

    fn into_split(self) -> (Self::Sender, Self::Receiver);
}
