//! Per-client request loop over a Unix socket.

use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::metrics::{Metrics, SLOW_QUERY_THRESHOLD_MS};
use crate::protocol::{get_operation_name, handle_request, Request, RequestEnvelope, Response, ResponseEnvelope};
use crate::service::Service;
use crate::wire;

/// How a client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Disconnected,
    /// Client sent `shutdown`; the store is already flushed
    Shutdown,
}

/// Serve one client until it disconnects, errors or asks for shutdown.
pub fn handle_client(
    mut stream: UnixStream,
    service: Service,
    client_id: usize,
    metrics: Option<Arc<Metrics>>,
) -> SessionEnd {
    info!("Client {} connected", client_id);

    loop {
        let msg = match wire::read_message(&mut stream) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                info!("Client {} disconnected", client_id);
                return SessionEnd::Disconnected;
            }
            Err(e) => {
                warn!("Client {} read error: {}", client_id, e);
                return SessionEnd::Disconnected;
            }
        };

        let (request_id, request) = match wire::decode::<RequestEnvelope>(&msg) {
            Ok(env) => (env.request_id, env.request),
            Err(e) => {
                warn!("Client {} sent an invalid request: {}", client_id, e);
                let envelope = ResponseEnvelope {
                    request_id: None,
                    response: Response::Error { error: format!("Invalid request: {}", e) },
                };
                if !send(&mut stream, client_id, &envelope) {
                    return SessionEnd::Disconnected;
                }
                continue;
            }
        };

        let is_shutdown = matches!(request, Request::Shutdown);

        let start = Instant::now();
        let op_name = get_operation_name(&request);
        debug!("Client {} -> {}", client_id, op_name);

        let response = handle_request(&service, request, &metrics);

        if let Some(ref m) = metrics {
            let duration_ms = start.elapsed().as_millis() as u64;
            m.record_query(op_name, duration_ms);

            if duration_ms >= SLOW_QUERY_THRESHOLD_MS {
                warn!("Slow request {}: {}ms (client {})", op_name, duration_ms, client_id);
            }
        }

        let envelope = ResponseEnvelope { request_id, response };
        if !send(&mut stream, client_id, &envelope) {
            return SessionEnd::Disconnected;
        }

        if is_shutdown {
            info!("Shutdown requested by client {}", client_id);
            return SessionEnd::Shutdown;
        }
    }
}

/// Write one response frame. Returns false once the client is unreachable.
fn send(stream: &mut UnixStream, client_id: usize, envelope: &ResponseEnvelope) -> bool {
    let bytes = match wire::encode(envelope) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("Serialize error for client {}: {}", client_id, e);
            return true;
        }
    };

    match wire::write_message(stream, &bytes) {
        Ok(()) => true,
        Err(e) => {
            warn!("Client {} write error: {}", client_id, e);
            false
        }
    }
}
