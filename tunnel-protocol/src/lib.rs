//! # Router Tunnel — Wire Protocol
//!
//! The wire model shared by both ends of a router tunnel session: the
//! [`Role`] a stream is opened under, the [`Operation`] a session exists
//! for, the [`TunnelInit`] handshake payload, and the [`Frame`] codec that
//! maps between these and bytes on the wire.
//!
//! This crate has no async runtime dependency and does no I/O — it exists
//! so that anything speaking the protocol (the tunnel core, a router
//! implementation, test tooling) shares one definition of the wire format.
//!
//! ## Wire format
//!
//! Every frame is a single tag byte followed by a body:
//!
//! - `0x00` — `Init`, body is the `bincode`-encoded [`TunnelInit`].
//! - `0x01` — `Payload`, body is the opaque application bytes verbatim.
//! - anything else — unrecognized; [`Frame::classify`] returns
//!   [`Classified::Other`] so newer peers can add frame kinds without
//!   breaking older ones mid-session.
//!
//! The first frame in each direction is always `Init`; every later frame is
//! `Payload`. There is no explicit close frame — closing is a transport-level
//! half-close (see the tunnel-core crate).

mod config;
mod error;
mod frame;
mod operation;
mod role;

pub use config::{TunnelConfig, TunnelInit};
pub use error::{ConfigError, OperationError, ProtocolError};
pub use frame::{Classified, Frame};
pub use operation::{Operation, PortProtocol};
pub use role::Role;

/// Default size of the pooled buffers used by the copy fallback path
/// (`tunnel-core`'s buffer pool). Also a reasonable default for a local
/// listener's read buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;
