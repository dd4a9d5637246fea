//! DriftKV Server Binary
//!
//! Starts the TCP server for DriftKV.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use driftkv::network::Server;
use driftkv::{Config, Store, WritePolicy};
use tracing_subscriber::{fmt, EnvFilter};

/// DriftKV Server
#[derive(Parser, Debug)]
#[command(name = "driftkv-server")]
#[command(about = "Log-structured key-value store")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./driftkv_data")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Stage writes in memory and flush once this many bytes are buffered
    /// (0 writes every record straight to disk)
    #[arg(short, long, default_value = "0")]
    buffer_limit: usize,

    /// Interval for flushing staged writes in the background
    #[arg(long, default_value = "1000")]
    flush_interval_ms: u64,

    /// Mapping segment size in bytes
    #[arg(long, default_value_t = driftkv::config::MAX_SEGMENT_SIZE)]
    segment_size: u64,

    /// Serve reads only; never create or modify files
    #[arg(long)]
    read_only: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,driftkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("DriftKV Server v{}", driftkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let write_policy = if args.buffer_limit == 0 {
        WritePolicy::Direct
    } else {
        WritePolicy::Buffered {
            limit: args.buffer_limit,
        }
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .write_policy(write_policy)
        .segment_size(args.segment_size)
        .read_only(args.read_only)
        .build();

    // Open store
    let store = match Store::open(config.clone()) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            tracing::error!("Failed to open store: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Store initialized with buckets {:?}",
        store.bucket_names()
    );

    if matches!(write_policy, WritePolicy::Buffered { .. }) && !args.read_only {
        spawn_flusher(Arc::clone(&store), Duration::from_millis(args.flush_interval_ms));
    }

    // Start server
    let server = match Server::bind(config, store) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    if !args.read_only {
        if let Err(e) = server.store().flush() {
            tracing::error!("Final flush failed: {}", e);
        }
    }

    tracing::info!("Server stopped");
}

/// Bound how long staged writes can sit in memory
fn spawn_flusher(store: Arc<Store>, interval: Duration) {
    let spawned = thread::Builder::new()
        .name("driftkv-flusher".to_string())
        .spawn(move || loop {
            thread::sleep(interval);
            if let Err(e) = store.flush() {
                tracing::error!("Background flush failed: {}", e);
            }
        });

    if let Err(e) = spawned {
        tracing::error!("Failed to start background flusher: {}", e);
    }
}
