use thiserror::Error;

/// Errors raised while encoding or decoding a [`crate::Frame`](crate::frame::Frame).
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The wire frame had no tag byte at all.
    #[error("frame is empty (missing tag byte)")]
    Truncated,

    /// The tag byte identified an `Init` frame but the body failed to
    /// (de)serialize as a [`crate::TunnelInit`].
    #[error("failed to (de)serialize frame body: {0}")]
    Codec(#[from] bincode::Error),
}

/// Errors raised constructing an [`crate::Operation`](crate::operation::Operation).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OperationError {
    #[error("port forward port must be in 1..=65535, got {0}")]
    InvalidPort(u16),
}

/// Errors raised constructing a [`crate::TunnelConfig`](crate::config::TunnelConfig).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
