use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::operation::Operation;

/// The handshake payload carried by the first frame of every direction.
///
/// Sent exactly once per session, before any `Payload` frame, by whichever
/// side dials first. The router pairs a `User` stream and an `Agent` stream
/// that carry matching `session_key`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelInit {
    pub session_key: String,
    pub cookie: String,
    pub workflow_id: String,
    pub operation: Operation,
}

/// Immutable configuration captured at dial time.
///
/// All four fields are required; there are no defaults. Construct via
/// [`TunnelConfig::new`], which validates the three opaque string fields
/// are non-empty before a [`TunnelInit`] can be derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelConfig {
    session_key: String,
    cookie: String,
    workflow_id: String,
    operation: Operation,
}

impl TunnelConfig {
    /// Validates and builds a `TunnelConfig`. Fails if any of
    /// `session_key`, `cookie`, or `workflow_id` is empty.
    pub fn new(
        session_key: impl Into<String>,
        cookie: impl Into<String>,
        workflow_id: impl Into<String>,
        operation: Operation,
    ) -> Result<Self, ConfigError> {
        let session_key = session_key.into();
        let cookie = cookie.into();
        let workflow_id = workflow_id.into();

        if session_key.is_empty() {
            return Err(ConfigError::MissingField("session_key"));
        }
        if cookie.is_empty() {
            return Err(ConfigError::MissingField("cookie"));
        }
        if workflow_id.is_empty() {
            return Err(ConfigError::MissingField("workflow_id"));
        }

        Ok(Self {
            session_key,
            cookie,
            workflow_id,
            operation,
        })
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Derives the [`TunnelInit`] sent as the first frame of the session.
    pub fn to_init(&self) -> TunnelInit {
        TunnelInit {
            session_key: self.session_key.clone(),
            cookie: self.cookie.clone(),
            workflow_id: self.workflow_id.clone(),
            operation: self.operation.clone(),
        }
    }
}
