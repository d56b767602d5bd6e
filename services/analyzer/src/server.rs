//! Analyzer TCP server
//!
//! Owns the listening socket and the per-connection handler tasks. The
//! server is a plain handle: the host constructs it, starts it, and stops it
//! as part of its own lifecycle. There is no global instance.

use crate::connection::handle_connection;
use crate::processor::ResultProcessor;
use crate::AnalyzerResult;
use labwire_config::AnalyzerConfig;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// TCP server accepting analyzer connections.
pub struct AnalyzerServer {
    config: AnalyzerConfig,
    processor: Arc<ResultProcessor>,
    running: Arc<AtomicBool>,
    accept_task: Option<JoinHandle<()>>,
    bound_addr: Option<SocketAddr>,
}

impl AnalyzerServer {
    pub fn new(config: AnalyzerConfig, processor: Arc<ResultProcessor>) -> Self {
        Self {
            config,
            processor,
            running: Arc::new(AtomicBool::new(false)),
            accept_task: None,
            bound_addr: None,
        }
    }

    /// Build a server from a TOML configuration file.
    pub fn from_config_file<P: AsRef<Path>>(
        path: P,
        processor: Arc<ResultProcessor>,
    ) -> AnalyzerResult<Self> {
        let config = AnalyzerConfig::from_file(path)?;
        config.validate()?;
        Ok(Self::new(config, processor))
    }

    /// Bind the listener and begin accepting connections.
    ///
    /// Idempotent: calling `start` while running warns and returns. A bind
    /// failure (port in use, missing permission) is non-fatal to the host:
    /// the server is simply marked not-running and the failure logged. The
    /// host process must keep serving everything else either way.
    pub async fn start(&mut self) -> AnalyzerResult<()> {
        if self.running.load(Ordering::SeqCst) {
            warn!("analyzer server is already running");
            return Ok(());
        }
        if !self.config.enabled {
            info!("analyzer integration is disabled in configuration");
            return Ok(());
        }

        let addr = self.config.bind_addr();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(e) => {
                error!(
                    %addr,
                    error = %e,
                    "failed to bind analyzer server; port may be in use or address unavailable"
                );
                self.running.store(false, Ordering::SeqCst);
                return Ok(());
            }
        };
        self.bound_addr = listener.local_addr().ok();

        info!(%addr, "analyzer server listening");
        if let Some(equipment_ip) = &self.config.equipment_ip {
            info!(%equipment_ip, "expecting instrument at this address");
        }

        self.running.store(true, Ordering::SeqCst);
        self.accept_task = Some(tokio::spawn(accept_loop(
            listener,
            self.config.clone(),
            self.running.clone(),
            self.processor.clone(),
        )));
        Ok(())
    }

    /// Stop accepting, signal handlers to wind down, and join them with a
    /// bounded grace period.
    pub async fn stop(&mut self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("analyzer server is not running");
        }
        if let Some(task) = self.accept_task.take() {
            info!("stopping analyzer server");
            // The accept loop notices the flag within one poll interval and
            // then drains its handlers within the grace period.
            let wait = self.config.shutdown_grace() + self.config.accept_poll() * 2;
            if timeout(wait, task).await.is_err() {
                warn!("accept loop did not wind down in time");
            }
            info!("analyzer server stopped");
        }
        self.bound_addr = None;
    }

    /// Coarse running/stopped state for an external status surface.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The address the listener actually bound, once running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.bound_addr
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: AnalyzerConfig,
    running: Arc<AtomicBool>,
    processor: Arc<ResultProcessor>,
) {
    let mut handlers: JoinSet<()> = JoinSet::new();
    let mut connections = 0u64;

    while running.load(Ordering::SeqCst) {
        // The timeout bounds accept() so the running flag is rechecked even
        // when no instrument ever connects.
        match timeout(config.accept_poll(), listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                connections += 1;
                info!(%peer, connection = connections, "analyzer connection established");
                let config = config.clone();
                let running = running.clone();
                let processor = processor.clone();
                handlers.spawn(async move {
                    if let Err(e) =
                        handle_connection(stream, peer, &config, running, processor).await
                    {
                        error!(%peer, error = %e, "connection handler failed");
                    }
                });
            }
            Ok(Err(e)) => {
                if running.load(Ordering::SeqCst) {
                    error!(error = %e, "failed to accept connection");
                }
            }
            Err(_) => {
                // Accept poll elapsed; fall through to the flag check.
            }
        }

        // Reap finished handlers without blocking the accept path.
        while let Some(joined) = handlers.try_join_next() {
            if let Err(e) = joined {
                warn!(error = %e, "connection handler panicked");
            }
        }
    }

    drop(listener);

    // Bounded-grace drain: handlers still running when the grace period
    // expires are aborted, not silently abandoned.
    let deadline = Instant::now() + config.shutdown_grace();
    loop {
        match timeout_at(deadline, handlers.join_next()).await {
            Ok(Some(joined)) => {
                if let Err(e) = joined {
                    warn!(error = %e, "connection handler panicked");
                }
            }
            Ok(None) => break,
            Err(_) => {
                warn!(
                    active = handlers.len(),
                    "handlers still active after grace period, aborting"
                );
                handlers.shutdown().await;
                break;
            }
        }
    }

    info!(connections, "analyzer accept loop ended");
}
