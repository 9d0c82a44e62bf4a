//! Identity visibility lookup
//!
//! CreateConnection asks whether the target account is private. Private
//! targets get a pending request, public ones an immediate connection.
//! The answer belongs to the identity service, so this is a capability
//! trait with two implementations:
//!
//! - [`StaticVisibility`]: in-process set of private ids (tests, standalone)
//! - [`PeerVisibility`]: asks the identity service over its Unix socket

use std::collections::HashSet;
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::VisibilityError;
use crate::wire;

pub type VisibilityResult<T> = std::result::Result<T, VisibilityError>;

pub trait VisibilityLookup: Send + Sync {
    /// Is the account `user_id` private
    fn is_private(&self, user_id: &str) -> VisibilityResult<bool>;
}

/// Visibility answered from memory.
///
/// Users not listed explicitly get `default_private`.
pub struct StaticVisibility {
    overrides: RwLock<HashSet<String>>,
    default_private: bool,
}

impl StaticVisibility {
    pub fn new(default_private: bool) -> Self {
        Self {
            overrides: RwLock::new(HashSet::new()),
            default_private,
        }
    }

    /// Every account public unless marked otherwise
    pub fn public() -> Self {
        Self::new(false)
    }

    /// Mark a single account private (or public).
    pub fn set_private(&self, user_id: &str, private: bool) {
        // Overrides hold the users whose visibility differs from the default
        let differs = private != self.default_private;
        let mut overrides = match self.overrides.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if differs {
            overrides.insert(user_id.to_string());
        } else {
            overrides.remove(user_id);
        }
    }
}

impl VisibilityLookup for StaticVisibility {
    fn is_private(&self, user_id: &str) -> VisibilityResult<bool> {
        let overrides = match self.overrides.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Ok(overrides.contains(user_id) != self.default_private)
    }
}

/// Request sent to the identity service
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum PeerRequest {
    IsUserPrivate {
        #[serde(rename = "userId")]
        user_id: String,
    },
}

/// Reply from the identity service
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PeerReply {
    Visibility {
        #[serde(rename = "isPrivate")]
        is_private: bool,
    },
    Error {
        error: String,
    },
}

/// Visibility answered by the identity service.
///
/// One connection per lookup, closed on return. Connect failures, timeouts,
/// malformed replies and error replies all surface as `VisibilityError`.
pub struct PeerVisibility {
    socket_path: PathBuf,
    timeout: Duration,
}

impl PeerVisibility {
    pub fn new(socket_path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout,
        }
    }
}

impl VisibilityLookup for PeerVisibility {
    fn is_private(&self, user_id: &str) -> VisibilityResult<bool> {
        debug!("Visibility lookup for user {} via {:?}", user_id, self.socket_path);

        let mut stream = UnixStream::connect(&self.socket_path)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let request = PeerRequest::IsUserPrivate { user_id: user_id.to_string() };
        wire::write_message(&mut stream, &wire::encode(&request)?)?;

        let reply = wire::read_message(&mut stream)?.ok_or(VisibilityError::Closed)?;
        match wire::decode::<PeerReply>(&reply)? {
            PeerReply::Visibility { is_private } => Ok(is_private),
            PeerReply::Error { error } => Err(VisibilityError::Rejected(error)),
        }
    }
}
