//! # Service Runtime
//!
//! Owns a listening connection and serves one request per accepted peer.
//!
//! ```text
//! accept thread --accept--> worker thread (recv, dispatch, send, close)
//!       |                        ^
//!       +--- pending[id] --------+   (connection + join handle)
//! ```
//!
//! `stop` is cooperative: it raises the shutdown flag, closes the listener to
//! wake `accept`, joins the accept thread, then closes every pending
//! connection to wake blocked workers and joins them. A handler that is
//! computing when `stop` runs finishes, but its reply goes nowhere.

use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use callsock::Connection;
use callsock::LISTEN_BACKLOG;
use callsock::Protocol;
use dashmap::DashMap;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::dispatch::serve_one;
use crate::error::Error;
use crate::error::Result;
use crate::registry::Registry;
use crate::request::MAX_MESSAGE;

/// Pause after a failed accept on a listener that is still usable.
const ACCEPT_PAUSE: Duration = Duration::from_millis(10);

/// How long `stop` waits for its wake-up connection.
const WAKE_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Bytes read for a request.
    pub max_request: usize,
    /// Pending-connection queue length of the listener.
    pub backlog: i32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_request: MAX_MESSAGE,
            backlog: LISTEN_BACKLOG,
        }
    }
}

impl ServiceConfig {
    pub fn with_max_request(mut self, max_request: usize) -> Self {
        self.max_request = max_request;
        self
    }

    pub fn with_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }
}

/// A connection being served and the worker serving it.
pub struct PendingRequest {
    connection: Connection,
    worker: JoinHandle<()>,
}

impl PendingRequest {
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

/// State shared between the service handle and its accept thread.
struct Shared {
    registry: Arc<Registry>,
    config: ServiceConfig,
    shutdown: AtomicBool,
    pending: DashMap<u64, PendingRequest>,
    next_request_id: AtomicU64,
}

/// One call to `start`.
struct Run {
    listener: Connection,
    shared: Arc<Shared>,
    accept: JoinHandle<()>,
}

/// A server for one `Registry`.
///
/// Dropping the service stops it.
pub struct Service {
    registry: Arc<Registry>,
    config: ServiceConfig,
    run: Mutex<Option<Run>>,
}

impl Service {
    pub fn new(registry: impl Into<Arc<Registry>>) -> Self {
        Self::with_config(registry, ServiceConfig::default())
    }

    pub fn with_config(registry: impl Into<Arc<Registry>>, config: ServiceConfig) -> Self {
        Self {
            registry: registry.into(),
            config,
            run: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Starts listening on `port` (0 for any free port), stopping any
    /// previous run first. Returns whether the accept loop started.
    pub fn start(&self, port: u16) -> bool {
        match self.try_start(port) {
            Ok(_) => true,
            Err(e) => {
                warn!(port, error = %e, "service failed to start");
                false
            }
        }
    }

    /// Like `start`, returning the bound port.
    pub fn try_start(&self, port: u16) -> Result<u16> {
        let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(prior) = run.take() {
            prior.stop();
        }

        let listener = Connection::new();
        listener.host_with_backlog(Protocol::Stream, port, self.config.backlog)?;
        let bound = listener.port();

        let shared = Arc::new(Shared {
            registry: self.registry.clone(),
            config: self.config,
            shutdown: AtomicBool::new(false),
            pending: DashMap::new(),
            next_request_id: AtomicU64::new(1),
        });

        let accept = {
            let listener = listener.clone();
            let shared = shared.clone();
            thread::Builder::new()
                .name(format!("callwire-accept-{}", bound))
                .spawn(move || accept_loop(listener, shared))
        };

        let accept = match accept {
            Ok(handle) => handle,
            Err(e) => {
                listener.close();
                return Err(Error::Spawn(e.kind()));
            }
        };

        info!(port = bound, "service started");
        *run = Some(Run {
            listener,
            shared,
            accept,
        });
        Ok(bound)
    }

    /// Stops the accept loop and every worker, and waits for them to exit.
    /// Does nothing if the service is not running.
    pub fn stop(&self) {
        let run = self.run.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(run) = run {
            run.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        let run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        run.as_ref().is_some_and(|run| !run.accept.is_finished())
    }

    /// The bound port while running.
    pub fn local_port(&self) -> Option<u16> {
        let run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        run.as_ref().map(|run| run.listener.port())
    }

    /// Workers that have not finished yet.
    pub fn active_requests(&self) -> usize {
        let run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        run.as_ref()
            .map(|run| run.shared.pending.iter().filter(|p| !p.is_finished()).count())
            .unwrap_or(0)
    }
}

impl Drop for Service {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("config", &self.config)
            .field("port", &self.local_port())
            .finish()
    }
}

impl Run {
    fn stop(self) {
        let port = self.listener.port();
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.listener.close();
        wake(port);

        if self.accept.join().is_err() {
            warn!(port, "accept thread panicked");
        }

        // The accept thread is gone, so nothing inserts any more.
        let ids: Vec<u64> = self.shared.pending.iter().map(|p| *p.key()).collect();
        let mut workers = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some((_, request)) = self.shared.pending.remove(&id) {
                request.connection.close();
                workers.push(request.worker);
            }
        }

        let count = workers.len();
        for worker in workers {
            if worker.join().is_err() {
                warn!(port, "worker panicked");
            }
        }

        info!(port, workers = count, "service stopped");
    }
}

/// Nudges an `accept` that a closed listener did not wake.
fn wake(port: u16) {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let _ = TcpStream::connect_timeout(&addr, WAKE_TIMEOUT);
}

fn accept_loop(listener: Connection, shared: Arc<Shared>) {
    let port = listener.port();
    while !shared.shutdown.load(Ordering::SeqCst) && listener.is_usable() {
        let conn = listener.accept();
        if shared.shutdown.load(Ordering::SeqCst) {
            conn.close();
            break;
        }
        if !conn.is_usable() {
            thread::sleep(ACCEPT_PAUSE);
            continue;
        }

        shared.pending.retain(|_, request| !request.is_finished());

        let id = shared.next_request_id.fetch_add(1, Ordering::Relaxed);
        let spawned = {
            let conn = conn.clone();
            let shared = shared.clone();
            thread::Builder::new()
                .name(format!("callwire-worker-{}", id))
                .spawn(move || {
                    serve_one(&shared.registry, &conn, shared.config.max_request);
                })
        };

        match spawned {
            Ok(worker) => {
                debug!(id, peer = %conn.peer_address(), "request accepted");
                shared.pending.insert(id, PendingRequest {
                    connection: conn,
                    worker,
                });
            }
            Err(e) => {
                warn!(error = %e, "could not spawn worker");
                conn.close();
            }
        }
    }

    debug!(port, "accept loop exited");
}
