//! Error types for the relationship service

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConnectionError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure of the underlying graph store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Connection not found: {user_id} -> {connected_user_id}")]
    ConnectionNotFound {
        user_id: String,
        connected_user_id: String,
    },

    #[error("Graph store lock poisoned")]
    Poisoned,

    #[error("Graph store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of the identity-visibility lookup.
#[derive(Error, Debug)]
pub enum VisibilityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode visibility request: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode visibility reply: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("Identity service closed the connection")]
    Closed,

    #[error("Identity service rejected lookup: {0}")]
    Rejected(String),
}

/// Every refusal the relationship service can hand back to a caller.
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("User {user_id} and user {other_id} are blocked")]
    Blocked { user_id: String, other_id: String },

    #[error("Connection not found: {user_id} -> {connected_user_id}")]
    NotFound {
        user_id: String,
        connected_user_id: String,
    },

    #[error("Connection {user_id} -> {connected_user_id} is not pending")]
    NotPending {
        user_id: String,
        connected_user_id: String,
    },

    #[error("Visibility lookup failed: {0}")]
    PeerUnavailable(#[from] VisibilityError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ConnectionError {
    fn from(err: StoreError) -> Self {
        match err {
            // An update racing a delete surfaces as the edge being gone
            StoreError::ConnectionNotFound { user_id, connected_user_id } => {
                ConnectionError::NotFound { user_id, connected_user_id }
            }
            other => ConnectionError::Store(other),
        }
    }
}

impl ConnectionError {
    /// Get error code for wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            ConnectionError::Blocked { .. } => "BLOCKED",
            ConnectionError::NotFound { .. } => "NOT_FOUND",
            ConnectionError::NotPending { .. } => "NOT_PENDING",
            ConnectionError::PeerUnavailable(_) => "PEER_UNAVAILABLE",
            ConnectionError::Store(_) => "STORE_ERROR",
        }
    }

    pub(crate) fn blocked(user_id: &str, other_id: &str) -> Self {
        ConnectionError::Blocked {
            user_id: user_id.to_string(),
            other_id: other_id.to_string(),
        }
    }

    pub(crate) fn not_found(user_id: &str, connected_user_id: &str) -> Self {
        ConnectionError::NotFound {
            user_id: user_id.to_string(),
            connected_user_id: connected_user_id.to_string(),
        }
    }

    pub(crate) fn not_pending(user_id: &str, connected_user_id: &str) -> Self {
        ConnectionError::NotPending {
            user_id: user_id.to_string(),
            connected_user_id: connected_user_id.to_string(),
        }
    }
}
