//! Linkgraph Server - Unix socket server for the relationship service
//!
//! Usage:
//!   linkgraph-server [--socket /tmp/linkgraph.sock] [--data-dir /data] [--metrics]
//!
//! Protocol:
//!   Request:  [4-byte length BE] [MessagePack payload]
//!   Response: [4-byte length BE] [MessagePack payload]
//!
//! Every flag also reads an environment variable (see `--help`).

use std::os::unix::net::UnixListener;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use linkgraph::config::{Config, DEFAULT_SOCKET_PATH, DEFAULT_VISIBILITY_TIMEOUT_MS};
use linkgraph::logging::init_tracing;
use linkgraph::metrics::Metrics;
use linkgraph::server::{handle_client, SessionEnd};
use linkgraph::suggestion::DEFAULT_SUGGESTION_TARGET;
use linkgraph::Service;

// Global client ID counter
static NEXT_CLIENT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Parser, Debug)]
#[command(name = "linkgraph-server", version, about = "Social-graph relationship server")]
struct Args {
    /// Unix socket path to listen on
    #[arg(long, env = "LINKGRAPH_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    socket: PathBuf,

    /// Directory for the graph snapshot (in-memory only when omitted)
    #[arg(long, env = "LINKGRAPH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Identity service socket used for account visibility lookups
    #[arg(long, env = "USER_SERVICE_SOCKET")]
    visibility_socket: Option<PathBuf>,

    /// Timeout for one visibility lookup, in milliseconds
    #[arg(long, env = "USER_SERVICE_TIMEOUT_MS", default_value_t = DEFAULT_VISIBILITY_TIMEOUT_MS)]
    visibility_timeout_ms: u64,

    /// Treat every account as private when no identity service is configured
    #[arg(long, env = "LINKGRAPH_DEFAULT_PRIVATE")]
    default_private: bool,

    /// Number of suggestions to aim for
    #[arg(long, env = "LINKGRAPH_SUGGESTION_TARGET", default_value_t = DEFAULT_SUGGESTION_TARGET)]
    suggestion_target: usize,

    /// Enable performance metrics collection
    #[arg(long, env = "LINKGRAPH_METRICS")]
    metrics: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn into_config(self) -> Config {
        Config {
            socket_path: self.socket,
            data_dir: self.data_dir,
            visibility_socket: self.visibility_socket,
            visibility_timeout_ms: self.visibility_timeout_ms,
            default_private: self.default_private,
            suggestion_target: self.suggestion_target,
            metrics: self.metrics,
        }
    }
}

/// Flush the graph, remove the socket file and exit.
fn shutdown(service: &Service, socket_path: &Path) -> ! {
    match service.flush() {
        Ok(report) => info!("Flushed {} users, {} edges", report.users, report.edges),
        Err(e) => error!("Flush failed: {}", e),
    }
    let _ = std::fs::remove_file(socket_path);
    info!("Exiting");
    std::process::exit(0);
}

fn main() -> Result<()> {
    let args = Args::parse();
    let print_config = args.print_config;
    let config = args.into_config();

    if print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    init_tracing();
    info!("Starting linkgraph-server v{}", env!("CARGO_PKG_VERSION"));

    let service = Service::from_config(&config)
        .with_context(|| format!("Failed to open graph store (data dir: {:?})", config.data_dir))?;

    let users = service.store().user_count()?;
    info!("Graph loaded: {} users", users);

    let metrics: Option<Arc<Metrics>> = if config.metrics {
        info!("Metrics collection enabled");
        Some(Arc::new(Metrics::new()))
    } else {
        None
    };

    // Remove stale socket file
    let _ = std::fs::remove_file(&config.socket_path);

    let listener = UnixListener::bind(&config.socket_path)
        .with_context(|| format!("Failed to bind socket {:?}", config.socket_path))?;
    info!("Listening on {:?}", config.socket_path);

    // Flush and exit on SIGINT / SIGTERM
    let mut signals = signal_hook::iterator::Signals::new([
        signal_hook::consts::SIGINT,
        signal_hook::consts::SIGTERM,
    ])
    .context("Failed to register signal handlers")?;

    let service_for_signal = service.clone();
    let socket_for_signal = config.socket_path.clone();
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("Received signal {}, flushing...", sig);
            shutdown(&service_for_signal, &socket_for_signal);
        }
    });

    // Accept connections
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::SeqCst);
                let service = service.clone();
                let metrics = metrics.clone();
                let socket_path = config.socket_path.clone();
                thread::spawn(move || {
                    if handle_client(stream, service.clone(), client_id, metrics) == SessionEnd::Shutdown {
                        shutdown(&service, &socket_path);
                    }
                });
            }
            Err(e) => {
                warn!("Accept error: {}", e);
            }
        }
    }

    Ok(())
}
