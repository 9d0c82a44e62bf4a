//! Linkgraph - directed social-graph relationships
//!
//! Connection requests and approvals, blocking, and friend-of-friend
//! suggestions over a pluggable [`GraphStore`].

pub mod block;
pub mod config;
pub mod error;
pub mod graph;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod relationship;
pub mod server;
pub mod service;
pub mod storage;
pub mod suggestion;
pub mod visibility;
pub mod wire;

pub use block::BlockGuard;
pub use config::Config;
pub use error::{ConnectionError, Result, StoreError, StoreResult, VisibilityError};
pub use graph::{GraphStore, MemoryGraph};
pub use relationship::{NotificationKind, RelationshipEngine};
pub use service::Service;
pub use storage::{ConnectionQuery, ConnectionRecord, ConnectionState, EdgeKind};
pub use suggestion::SuggestionEngine;
pub use visibility::{PeerVisibility, StaticVisibility, VisibilityLookup};
