//! # Router Tunnel — Core
//!
//! Everything that touches a stream: the [`TunnelStream`] adapter trait two
//! role-specific RPC streams are wrapped in, the [`Tunnel`] session
//! endpoint, the bidirectional [`copy_bidirectional`] pump, the buffer pool,
//! and [`dial`].
//!
//! `tunnel-protocol` defines the wire model this crate speaks; this crate
//! drives it over an actual async stream. See the crate-level docs there
//! for the frame format.
//!
//! ## Quick tour
//!
//! - Open a session with [`dial`], supplying a `Role`, a validated
//!   `tunnel_protocol::TunnelConfig`, and a closure that opens the
//!   role-specific stream.
//! - Drive the resulting [`Tunnel`] with `send`/`recv` for whole payloads,
//!   or `read`/`write` when your caller's buffer size doesn't line up with
//!   frame boundaries.
//! - Hand a `Tunnel` and a local `AsyncRead + AsyncWrite` to
//!   [`copy_bidirectional`] to relay the two without writing a pump loop
//!   yourself.
//!
//! No `tracing_subscriber` initialization happens in this crate — that's
//! left to whatever binary links it.

mod error;
mod framed;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod pool;
mod pump;
mod stream;
mod tunnel;

pub use error::{DialError, PumpError, TransferError, TransferFailed, TunnelError};
pub use framed::{FramedReceiver, FramedSender, FramedStream};
pub use pool::PooledBuffer;
pub use pump::copy_bidirectional;
pub use stream::{TunnelReceiver, TunnelSender, TunnelStream};
pub use tunnel::{dial, DialOptions, Tunnel, TunnelResult};
