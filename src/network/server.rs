//! TCP Server
//!
//! Accepts connections and dispatches to worker threads.

use std::io::BufWriter;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, TrySendError};

use crate::config::Config;
use crate::error::{DriftError, Result};
use crate::protocol::{write_response, Response};
use crate::store::Store;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on worker threads regardless of `max_connections`
const MAX_WORKERS: usize = 64;

/// TCP server for DriftKV
pub struct Server {
    config: Config,
    store: Arc<Store>,
    listener: TcpListener,
    shutdown: AtomicBool,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            DriftError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            store,
            listener,
            shutdown: AtomicBool::new(false),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` is called (blocking)
    ///
    /// Connections beyond what the pool can queue are answered with an
    /// error response and closed.
    pub fn run(&self) -> Result<()> {
        let workers = self.config.max_connections.clamp(1, MAX_WORKERS);
        let (tx, rx) = channel::bounded::<TcpStream>(self.config.max_connections.max(1));

        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            workers
        );

        let handles: Vec<_> = (0..workers)
            .map(|id| {
                let rx = rx.clone();
                let store = Arc::clone(&self.store);
                let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

                thread::Builder::new()
                    .name(format!("driftkv-worker-{}", id))
                    .spawn(move || {
                        for stream in rx.iter() {
                            serve(stream, Arc::clone(&store), read_ms, write_ms);
                        }
                    })
            })
            .collect::<std::io::Result<_>>()?;

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    match tx.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(stream)) => {
                            tracing::warn!("Rejecting {}: connection limit reached", peer);
                            let mut writer = BufWriter::new(stream);
                            let _ = write_response(&mut writer, &Response::error("server busy"));
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        drop(tx);
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        tracing::info!("Server stopped accepting connections");
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

/// Run one connection to completion on the current worker
fn serve(stream: TcpStream, store: Arc<Store>, read_ms: u64, write_ms: u64) {
    let mut connection = match Connection::new(stream, store) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
    }

    if let Err(e) = connection.handle() {
        tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
    }
}
