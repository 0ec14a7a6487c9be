//! # Connection
//!
//! A shared handle to one socket and its lifecycle.
//!
//! ## Invariants
//! - The state only moves along the edges of `State::can_advance_to`.
//! - `open` and `host` start from `Closed`; `close` always returns to `Closed`.
//! - Each `close` bumps an epoch. A running `open` or `host` that observes a
//!   newer epoch abandons its work instead of resurrecting a closed handle.

use std::io::Read;
use std::io::Write;
use std::net::Ipv4Addr;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use socket2::Domain;
use socket2::SockAddr;
use socket2::Socket;
use socket2::Type;
use tracing::debug;
use tracing::warn;

use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::error::Result;
use crate::state;
use crate::state::Protocol;
use crate::state::Role;
use crate::state::State;

/// Receive size used when the caller has no better idea.
pub const DEFAULT_RECV_SIZE: usize = 256;

/// Pending-connection queue length of stream listeners.
pub const LISTEN_BACKLOG: i32 = 10;

/// Pause between connect attempts that were refused or timed out.
pub const CONNECT_RETRY_PAUSE: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Default)]
struct Meta {
    protocol: Option<Protocol>,
    role: Option<Role>,
    address: String,
    port: u16,
    connect_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
struct Status {
    state: State,
    failure: Option<Error>,
}

#[derive(Debug, Default)]
struct Inner {
    endpoint: RwLock<Option<Arc<Endpoint>>>,
    meta: Mutex<Meta>,
    status: Mutex<Status>,
    epoch: AtomicU64,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A blocking stream or datagram connection.
///
/// Clones share the socket. See the module docs for the state machine.
#[derive(Clone, Default)]
pub struct Connection {
    inner: Arc<Inner>,
}

impl Connection {
    /// Creates an empty, unusable connection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a stream handed out by `accept`.
    fn accepted(stream: TcpStream, peer: SocketAddr) -> Self {
        let conn = Self::new();
        *lock(&conn.inner.meta) = Meta {
            protocol: Some(Protocol::Stream),
            role: Some(Role::Initiator),
            address: peer.ip().to_string(),
            port: peer.port(),
            connect_timeout: Duration::ZERO,
        };
        *conn.write_endpoint() = Some(Arc::new(Endpoint::Stream(stream)));
        lock(&conn.inner.status).state = State::Ready;
        conn
    }

    // ---- Metadata ----

    pub fn state(&self) -> State {
        lock(&self.inner.status).state
    }

    /// The most recent failure, if the connection is in `State::Error`.
    pub fn failure(&self) -> Option<Error> {
        lock(&self.inner.status).failure.clone()
    }

    pub fn protocol(&self) -> Option<Protocol> {
        lock(&self.inner.meta).protocol
    }

    pub fn role(&self) -> Option<Role> {
        lock(&self.inner.meta).role
    }

    /// The remote address for initiators, `0.0.0.0` for listeners.
    pub fn peer_address(&self) -> String {
        lock(&self.inner.meta).address.clone()
    }

    /// The remote port for initiators, the bound port for listeners.
    pub fn port(&self) -> u16 {
        lock(&self.inner.meta).port
    }

    pub fn connect_timeout(&self) -> Duration {
        lock(&self.inner.meta).connect_timeout
    }

    /// The local port of the underlying socket, if there is one.
    pub fn local_port(&self) -> Option<u16> {
        self.read_endpoint().as_ref().and_then(|ep| ep.local_port())
    }

    /// Returns whether both handles refer to the same socket.
    pub fn same_socket(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns whether the connection can be used. Unusable connections
    /// should be discarded.
    pub fn is_usable(&self) -> bool {
        let (protocol, role) = {
            let meta = lock(&self.inner.meta);
            (meta.protocol, meta.role)
        };
        state::is_usable(protocol, role, self.state())
    }

    // ---- Lifecycle ----

    /// Connects to `address:port`.
    ///
    /// Any previous socket is closed first. Stream connects that are refused
    /// or time out are retried until `timeout` has elapsed; other connect
    /// errors end the attempt at once. Blocks until the connection is
    /// `Ready` or has failed.
    pub fn open(&self, protocol: Protocol, address: &str, port: u16, timeout: Duration) -> Result<()> {
        self.close();
        let epoch = self.epoch();

        *lock(&self.inner.meta) = Meta {
            protocol: Some(protocol),
            role: Some(Role::Initiator),
            address: address.to_string(),
            port,
            connect_timeout: timeout,
        };

        self.advance(epoch, State::Resolving)?;
        let target = resolve(address, port).map_err(|e| self.fail(epoch, e))?;

        let socket = create(protocol, &target).map_err(|e| self.fail(epoch, e))?;
        self.advance(epoch, State::SocketCreated)?;
        self.advance(epoch, State::Connecting)?;

        let endpoint = match protocol {
            Protocol::Stream => Endpoint::Stream(self.connect_stream(epoch, socket, target, timeout)?),
            Protocol::Datagram => {
                // Only fixes the default peer; nothing goes on the wire.
                socket
                    .connect(&SockAddr::from(target))
                    .map_err(|e| self.fail(epoch, Error::Connect(e.kind())))?;
                Endpoint::Datagram(socket.into())
            }
        };

        self.install(epoch, endpoint)?;
        debug!(?protocol, %target, "connection opened");
        Ok(())
    }

    fn connect_stream(
        &self,
        epoch: u64,
        mut socket: Socket,
        target: SocketAddr,
        timeout: Duration,
    ) -> Result<TcpStream> {
        let deadline = Instant::now() + timeout;
        let addr = SockAddr::from(target);

        loop {
            if self.epoch() != epoch {
                return Err(Error::Closed);
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(%target, ?timeout, "connect timed out");
                return Err(self.fail(epoch, Error::Timeout));
            }

            match socket.connect_timeout(&addr, remaining) {
                Ok(()) => return Ok(socket.into()),
                Err(e) if is_retryable(e.kind()) => {
                    debug!(%target, kind = ?e.kind(), "connect attempt failed, retrying");
                    std::thread::sleep(CONNECT_RETRY_PAUSE.min(remaining));
                    // A failed connect leaves the socket in an unspecified state.
                    socket = create(Protocol::Stream, &target).map_err(|e| self.fail(epoch, e))?;
                }
                Err(e) => return Err(self.fail(epoch, Error::Connect(e.kind()))),
            }
        }
    }

    /// Binds to `0.0.0.0:port`; stream listeners also start listening.
    ///
    /// Port 0 binds an ephemeral port, readable through `port()` afterwards.
    pub fn host(&self, protocol: Protocol, port: u16) -> Result<()> {
        self.host_with_backlog(protocol, port, LISTEN_BACKLOG)
    }

    /// Like `host`, with an explicit pending-connection queue length.
    /// The backlog is ignored for datagram sockets.
    pub fn host_with_backlog(&self, protocol: Protocol, port: u16, backlog: i32) -> Result<()> {
        self.close();
        let epoch = self.epoch();

        *lock(&self.inner.meta) = Meta {
            protocol: Some(protocol),
            role: Some(Role::Listener),
            address: Ipv4Addr::UNSPECIFIED.to_string(),
            port,
            connect_timeout: Duration::ZERO,
        };

        self.advance(epoch, State::Resolving)?;
        let local = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let socket = create(protocol, &local).map_err(|e| self.fail(epoch, e))?;
        self.advance(epoch, State::SocketCreated)?;
        self.advance(epoch, State::Binding)?;

        if protocol == Protocol::Stream {
            socket
                .set_reuse_address(true)
                .map_err(|e| self.fail(epoch, Error::Bind(e.kind())))?;
        }
        socket
            .bind(&SockAddr::from(local))
            .map_err(|e| self.fail(epoch, Error::Bind(e.kind())))?;

        let endpoint = match protocol {
            Protocol::Stream => {
                socket
                    .listen(backlog)
                    .map_err(|e| self.fail(epoch, Error::Listen(e.kind())))?;
                Endpoint::Listener(socket.into())
            }
            Protocol::Datagram => Endpoint::Datagram(socket.into()),
        };

        if let Some(bound) = endpoint.local_port() {
            lock(&self.inner.meta).port = bound;
        }

        self.install(epoch, endpoint)?;
        debug!(?protocol, port = self.port(), "connection hosting");
        Ok(())
    }

    /// Blocks until a peer connects to this stream listener.
    ///
    /// Returns an empty, unusable connection on failure.
    pub fn accept(&self) -> Connection {
        match self.try_accept() {
            Ok(conn) => conn,
            Err(Error::Closed) | Err(Error::NotUsable) => Connection::new(),
            Err(e) => {
                warn!(error = %e, "accept failed");
                Connection::new()
            }
        }
    }

    pub fn try_accept(&self) -> Result<Connection> {
        let epoch = self.epoch();
        let endpoint = self.usable_endpoint()?;
        let Endpoint::Listener(listener) = &*endpoint else {
            return Err(Error::WrongProtocol);
        };

        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted connection");
                Ok(Connection::accepted(stream, peer))
            }
            Err(_) if self.epoch() != epoch => Err(Error::Closed),
            Err(e) => Err(Error::Accept(e.kind())),
        }
    }

    /// Writes all of `bytes` to the peer.
    ///
    /// Datagram listeners have no peer and must use `send_to`.
    /// Any failure marks the connection `Error`.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        let epoch = self.epoch();
        let endpoint = self.usable_endpoint()?;
        if bytes.is_empty() {
            return Err(self.fail(epoch, Error::EmptyPayload));
        }

        let result = match &*endpoint {
            Endpoint::Stream(stream) => {
                let mut stream: &TcpStream = stream;
                stream.write_all(bytes).map_err(|e| Error::Send(e.kind()))
            }
            Endpoint::Datagram(socket) if self.role() == Some(Role::Initiator) => {
                check_sent(socket.send(bytes), bytes.len())
            }
            Endpoint::Datagram(_) | Endpoint::Listener(_) => Err(Error::WrongProtocol),
        };

        result.map_err(|e| self.fail(epoch, e))
    }

    /// Sends one datagram to `dest`.
    pub fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<()> {
        let epoch = self.epoch();
        let endpoint = self.usable_endpoint()?;
        if bytes.is_empty() {
            return Err(self.fail(epoch, Error::EmptyPayload));
        }

        let result = match &*endpoint {
            Endpoint::Datagram(socket) => check_sent(socket.send_to(bytes, dest), bytes.len()),
            _ => Err(Error::WrongProtocol),
        };

        result.map_err(|e| self.fail(epoch, e))
    }

    /// Performs one blocking read of up to `max_size` bytes.
    ///
    /// Returns the bytes read, or an empty buffer on failure. There is no
    /// accumulation across reads: one call is one read.
    pub fn recv(&self, max_size: usize) -> Vec<u8> {
        self.try_recv(max_size).unwrap_or_default()
    }

    pub fn try_recv(&self, max_size: usize) -> Result<Vec<u8>> {
        let epoch = self.epoch();
        let endpoint = self.usable_endpoint()?;
        let mut buf = vec![0u8; max_size.max(1)];

        let read = match &*endpoint {
            Endpoint::Stream(stream) => {
                let mut stream: &TcpStream = stream;
                stream.read(&mut buf)
            }
            Endpoint::Datagram(socket) => socket.recv(&mut buf),
            Endpoint::Listener(_) => return Err(self.fail(epoch, Error::WrongProtocol)),
        };

        let n = self.check_read(epoch, read)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Receives one datagram and reports its sender.
    pub fn recv_from(&self, max_size: usize) -> Result<(Vec<u8>, SocketAddr)> {
        let epoch = self.epoch();
        let endpoint = self.usable_endpoint()?;
        let Endpoint::Datagram(socket) = &*endpoint else {
            return Err(self.fail(epoch, Error::WrongProtocol));
        };

        let mut buf = vec![0u8; max_size.max(1)];
        match socket.recv_from(&mut buf) {
            Ok((n, sender)) => {
                buf.truncate(n);
                Ok((buf, sender))
            }
            Err(e) => Err(self.fail(epoch, Error::Recv(e.kind()))),
        }
    }

    /// Releases the socket and resets the handle to `Closed`.
    ///
    /// Threads blocked on this socket through any clone are woken and their
    /// calls fail. Closing an already closed connection does nothing.
    pub fn close(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        let endpoint = self.write_endpoint().take();
        if let Some(endpoint) = endpoint {
            endpoint.shutdown();
            debug!(port = self.port(), "connection closed");
        }

        *lock(&self.inner.meta) = Meta::default();
        *lock(&self.inner.status) = Status::default();
    }

    // ---- Internals ----

    fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::SeqCst)
    }

    fn read_endpoint(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<Endpoint>>> {
        self.inner.endpoint.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_endpoint(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<Endpoint>>> {
        self.inner.endpoint.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clones the socket out of the lock so blocking calls never hold it.
    fn usable_endpoint(&self) -> Result<Arc<Endpoint>> {
        if !self.is_usable() {
            return Err(Error::NotUsable);
        }
        self.read_endpoint().clone().ok_or(Error::Closed)
    }

    /// Moves to `next` unless the connection was closed in the meantime.
    fn advance(&self, epoch: u64, next: State) -> Result<()> {
        let mut status = lock(&self.inner.status);
        if self.epoch() != epoch {
            return Err(Error::Closed);
        }
        debug_assert!(status.state.can_advance_to(next), "{:?} -> {:?}", status.state, next);
        status.state = next;
        Ok(())
    }

    /// Records `error` and moves to `State::Error`, unless the connection
    /// was closed in the meantime. Returns the error for propagation.
    fn fail(&self, epoch: u64, error: Error) -> Error {
        let mut status = lock(&self.inner.status);
        if self.epoch() != epoch {
            return Error::Closed;
        }
        status.state = State::Error;
        status.failure = Some(error.clone());
        error
    }

    /// Publishes a ready endpoint. Takes the endpoint lock before the status
    /// lock, the same order as `close`.
    fn install(&self, epoch: u64, endpoint: Endpoint) -> Result<()> {
        let mut slot = self.write_endpoint();
        let mut status = lock(&self.inner.status);
        if self.epoch() != epoch {
            return Err(Error::Closed);
        }
        *slot = Some(Arc::new(endpoint));
        status.state = State::Ready;
        status.failure = None;
        Ok(())
    }

    fn check_read(&self, epoch: u64, read: std::io::Result<usize>) -> Result<usize> {
        match read {
            Ok(0) => Err(self.fail(epoch, Error::PeerClosed)),
            Ok(n) => Ok(n),
            Err(e) => Err(self.fail(epoch, Error::Recv(e.kind()))),
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let meta = lock(&self.inner.meta).clone();
        let status = lock(&self.inner.status).clone();
        f.debug_struct("Connection")
            .field("state", &status.state)
            .field("failure", &status.failure)
            .field("protocol", &meta.protocol)
            .field("role", &meta.role)
            .field("address", &meta.address)
            .field("port", &meta.port)
            .finish()
    }
}

fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = (address, port)
        .to_socket_addrs()
        .map_err(|_| Error::Resolve(address.to_string()))?;
    addrs.next().ok_or_else(|| Error::Resolve(address.to_string()))
}

fn create(protocol: Protocol, addr: &SocketAddr) -> Result<Socket> {
    let (ty, proto) = match protocol {
        Protocol::Stream => (Type::STREAM, socket2::Protocol::TCP),
        Protocol::Datagram => (Type::DGRAM, socket2::Protocol::UDP),
    };
    Socket::new(Domain::for_address(*addr), ty, Some(proto)).map_err(|e| Error::Create(e.kind()))
}

fn is_retryable(kind: std::io::ErrorKind) -> bool {
    matches!(kind, std::io::ErrorKind::TimedOut | std::io::ErrorKind::ConnectionRefused)
}

fn check_sent(sent: std::io::Result<usize>, expected: usize) -> Result<()> {
    match sent {
        Ok(n) if n == expected => Ok(()),
        Ok(_) => Err(Error::Send(std::io::ErrorKind::WriteZero)),
        Err(e) => Err(Error::Send(e.kind())),
    }
}
