//! Linkgraph wire protocol
//!
//! Request:  `{"requestId"?: string, "cmd": <operation>, ...arguments}`
//! Response: one of the `Response` shapes, with `requestId` echoed back.
//!
//! Both travel as MessagePack maps inside length-prefixed frames (see
//! [`crate::wire`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::ConnectionError;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::service::Service;
use crate::storage::{ConnectionRecord, EdgeKind};

// ============================================================================
// Wire Protocol Types
// ============================================================================

/// Request from client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "camelCase")]
pub enum Request {
    // ========================================================================
    // Connection State Machine
    // ========================================================================
    CreateConnection {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },
    /// Approve the request `userId -> connectedUserId`
    ApproveConnection {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },
    /// Approve every request sent to `userId`
    ApproveAllConnections {
        #[serde(rename = "userId")]
        user_id: String,
    },
    RejectConnection {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },
    DeleteConnection {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },

    // ========================================================================
    // Connection Queries
    // ========================================================================
    GetConnection {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },
    GetAllConnections {
        #[serde(rename = "userId")]
        user_id: String,
    },
    GetFollowings {
        #[serde(rename = "userId")]
        user_id: String,
    },
    GetFollowers {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Pending requests sent to `userId`
    GetAllRequestConnections {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Pending requests sent by `userId`
    GetAllPendingConnections {
        #[serde(rename = "userId")]
        user_id: String,
    },

    // ========================================================================
    // Notification Toggles
    // ========================================================================
    ChangeMessageNotification {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },
    ChangePostNotification {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },
    ChangeCommentNotification {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "connectedUserId")]
        connected_user_id: String,
    },

    GetSuggestions {
        #[serde(rename = "userId")]
        user_id: String,
    },

    // ========================================================================
    // Blocking
    // ========================================================================
    BlockUser {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "blockedUserId")]
        blocked_user_id: String,
    },
    UnblockUser {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "blockedUserId")]
        blocked_user_id: String,
    },
    IsBlocked {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "blockedUserId")]
        blocked_user_id: String,
    },
    IsBlockedAny {
        #[serde(rename = "userId")]
        user_id: String,
        #[serde(rename = "blockedUserId")]
        blocked_user_id: String,
    },
    /// Users blocked by `userId`
    GetBlocked {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Users blocking `userId`
    GetBlockedBy {
        #[serde(rename = "userId")]
        user_id: String,
    },
    GetBlockedAny {
        #[serde(rename = "userId")]
        user_id: String,
    },

    // ========================================================================
    // Control
    // ========================================================================
    Ping,
    GetStats,
    Flush,
    Shutdown,
}

/// Response to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Structured error with code (for programmatic handling)
    ErrorWithCode { error: String, code: String },
    Error { error: String },

    Ok { ok: bool },
    Connection { connection: WireConnection },
    Connections { connections: Vec<WireConnection> },
    Ids { ids: Vec<String> },
    Bool { value: bool },
    Pong { pong: bool, version: String },
    Stats { stats: WireStats },
}

/// Request envelope: captures requestId alongside the tagged Request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub request: Request,
}

/// Response envelope: wraps Response with optional requestId for echo-back.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, rename = "requestId", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub response: Response,
}

/// CONNECT edge as seen by clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConnection {
    pub user_id: String,
    pub connected_user_id: String,
    pub is_connected: bool,
    pub pending_connection: bool,
    pub is_message_notification_enabled: bool,
    pub is_post_notification_enabled: bool,
    pub is_comment_notification_enabled: bool,
}

impl From<ConnectionRecord> for WireConnection {
    fn from(record: ConnectionRecord) -> Self {
        Self {
            is_connected: record.is_connected(),
            pending_connection: record.is_pending(),
            user_id: record.user_id,
            connected_user_id: record.connected_user_id,
            is_message_notification_enabled: record.message_notifications,
            is_post_notification_enabled: record.post_notifications,
            is_comment_notification_enabled: record.comment_notifications,
        }
    }
}

/// Graph size plus server metrics. Metric fields are zero when metrics
/// collection is disabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireStats {
    pub user_count: u64,
    pub edge_counts: HashMap<String, usize>,
    pub metrics_enabled: bool,
    #[serde(flatten)]
    pub metrics: MetricsSnapshot,
}

// ============================================================================
// Dispatch
// ============================================================================

/// Get operation name for metrics tracking.
pub fn get_operation_name(request: &Request) -> &'static str {
    match request {
        Request::CreateConnection { .. } => "CreateConnection",
        Request::ApproveConnection { .. } => "ApproveConnection",
        Request::ApproveAllConnections { .. } => "ApproveAllConnections",
        Request::RejectConnection { .. } => "RejectConnection",
        Request::DeleteConnection { .. } => "DeleteConnection",
        Request::GetConnection { .. } => "GetConnection",
        Request::GetAllConnections { .. } => "GetAllConnections",
        Request::GetFollowings { .. } => "GetFollowings",
        Request::GetFollowers { .. } => "GetFollowers",
        Request::GetAllRequestConnections { .. } => "GetAllRequestConnections",
        Request::GetAllPendingConnections { .. } => "GetAllPendingConnections",
        Request::ChangeMessageNotification { .. } => "ChangeMessageNotification",
        Request::ChangePostNotification { .. } => "ChangePostNotification",
        Request::ChangeCommentNotification { .. } => "ChangeCommentNotification",
        Request::GetSuggestions { .. } => "GetSuggestions",
        Request::BlockUser { .. } => "BlockUser",
        Request::UnblockUser { .. } => "UnblockUser",
        Request::IsBlocked { .. } => "IsBlocked",
        Request::IsBlockedAny { .. } => "IsBlockedAny",
        Request::GetBlocked { .. } => "GetBlocked",
        Request::GetBlockedBy { .. } => "GetBlockedBy",
        Request::GetBlockedAny { .. } => "GetBlockedAny",
        Request::Ping => "Ping",
        Request::GetStats => "GetStats",
        Request::Flush => "Flush",
        Request::Shutdown => "Shutdown",
    }
}

impl From<ConnectionError> for Response {
    fn from(err: ConnectionError) -> Self {
        Response::ErrorWithCode {
            code: err.code().to_string(),
            error: err.to_string(),
        }
    }
}

fn respond_ok(result: crate::error::Result<()>) -> Response {
    match result {
        Ok(()) => Response::Ok { ok: true },
        Err(e) => e.into(),
    }
}

fn respond_connection(result: crate::error::Result<ConnectionRecord>) -> Response {
    match result {
        Ok(record) => Response::Connection { connection: record.into() },
        Err(e) => e.into(),
    }
}

fn respond_connections(result: crate::error::Result<Vec<ConnectionRecord>>) -> Response {
    match result {
        Ok(records) => Response::Connections {
            connections: records.into_iter().map(WireConnection::from).collect(),
        },
        Err(e) => e.into(),
    }
}

fn respond_ids(result: crate::error::Result<Vec<String>>) -> Response {
    match result {
        Ok(ids) => Response::Ids { ids },
        Err(e) => e.into(),
    }
}

fn respond_bool(result: crate::error::Result<bool>) -> Response {
    match result {
        Ok(value) => Response::Bool { value },
        Err(e) => e.into(),
    }
}

/// Flush the store, recording timing when metrics are on.
fn flush(service: &Service, metrics: &Option<Arc<Metrics>>) -> Response {
    let start = Instant::now();
    match service.flush() {
        Ok(report) => {
            if let Some(ref m) = metrics {
                m.record_flush(
                    start.elapsed().as_millis() as u64,
                    report.users as u64,
                    report.edges as u64,
                );
            }
            Response::Ok { ok: true }
        }
        Err(e) => {
            error!("Flush failed: {}", e);
            e.into()
        }
    }
}

fn stats(service: &Service, metrics: &Option<Arc<Metrics>>) -> Response {
    let store = service.store();
    let user_count = match store.user_count() {
        Ok(n) => n as u64,
        Err(e) => return ConnectionError::from(e).into(),
    };
    let edge_counts = match store.count_edges_by_type() {
        Ok(counts) => counts,
        Err(e) => return ConnectionError::from(e).into(),
    };

    Response::Stats {
        stats: WireStats {
            user_count,
            edge_counts,
            metrics_enabled: metrics.is_some(),
            metrics: metrics.as_ref().map(|m| m.snapshot()).unwrap_or_default(),
        },
    }
}

/// Execute one request against the service.
///
/// `Shutdown` flushes and acknowledges; terminating the process is the
/// caller's job.
pub fn handle_request(
    service: &Service,
    request: Request,
    metrics: &Option<Arc<Metrics>>,
) -> Response {
    let rel = &service.relationships;
    let blocks = &service.blocks;

    match request {
        Request::CreateConnection { user_id, connected_user_id } => {
            respond_connection(rel.create_connection(&user_id, &connected_user_id))
        }
        Request::ApproveConnection { user_id, connected_user_id } => {
            respond_connection(rel.approve_connection(&user_id, &connected_user_id))
        }
        Request::ApproveAllConnections { user_id } => {
            respond_connections(rel.approve_all_connections(&user_id))
        }
        Request::RejectConnection { user_id, connected_user_id } => {
            respond_ok(rel.reject_connection(&user_id, &connected_user_id))
        }
        Request::DeleteConnection { user_id, connected_user_id } => {
            respond_ok(rel.delete_connection(&user_id, &connected_user_id))
        }

        Request::GetConnection { user_id, connected_user_id } => {
            respond_connection(rel.get_connection(&user_id, &connected_user_id))
        }
        Request::GetAllConnections { user_id } => respond_connections(rel.get_all_connections(&user_id)),
        Request::GetFollowings { user_id } => respond_connections(rel.get_followings(&user_id)),
        Request::GetFollowers { user_id } => respond_connections(rel.get_followers(&user_id)),
        Request::GetAllRequestConnections { user_id } => {
            respond_connections(rel.get_all_requests_sent_to(&user_id))
        }
        Request::GetAllPendingConnections { user_id } => {
            respond_connections(rel.get_all_pending_sent_by(&user_id))
        }

        Request::ChangeMessageNotification { user_id, connected_user_id } => {
            respond_connection(rel.change_message_notification(&user_id, &connected_user_id))
        }
        Request::ChangePostNotification { user_id, connected_user_id } => {
            respond_connection(rel.change_post_notification(&user_id, &connected_user_id))
        }
        Request::ChangeCommentNotification { user_id, connected_user_id } => {
            respond_connection(rel.change_comment_notification(&user_id, &connected_user_id))
        }

        Request::GetSuggestions { user_id } => respond_ids(service.suggestions.get_suggestions(&user_id)),

        Request::BlockUser { user_id, blocked_user_id } => {
            respond_ok(blocks.block(&user_id, &blocked_user_id))
        }
        Request::UnblockUser { user_id, blocked_user_id } => {
            respond_ok(blocks.unblock(&user_id, &blocked_user_id))
        }
        Request::IsBlocked { user_id, blocked_user_id } => {
            respond_bool(blocks.is_blocked(&user_id, &blocked_user_id))
        }
        Request::IsBlockedAny { user_id, blocked_user_id } => {
            respond_bool(blocks.is_blocked_either(&user_id, &blocked_user_id))
        }
        Request::GetBlocked { user_id } => respond_ids(blocks.list_blocked_by_me(&user_id)),
        Request::GetBlockedBy { user_id } => respond_ids(blocks.list_blocked_me(&user_id)),
        Request::GetBlockedAny { user_id } => respond_ids(blocks.list_blocked_either(&user_id)),

        Request::Ping => Response::Pong {
            pong: true,
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        Request::GetStats => stats(service, metrics),
        Request::Flush | Request::Shutdown => flush(service, metrics),
    }
}

/// Edge count of one kind from a stats reply
pub fn edge_count(stats: &WireStats, kind: EdgeKind) -> usize {
    stats.edge_counts.get(kind.as_str()).copied().unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
