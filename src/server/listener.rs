//! TCP listener with worker-pool backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Enforce the worker-pool maximum via semaphore
//!
//! # Design Decisions
//! - The socket is built by hand so bind options are explicit: address
//!   reuse for fast restart, but never port sharing, so a second server on
//!   the same port fails at bind instead of silently splitting traffic

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ListenerConfig;
use crate::server::ServerError;

const ACCEPT_BACKLOG: i32 = 128;

/// A bounded TCP listener.
///
/// Accepting is gated on a semaphore sized to the worker-pool maximum: once
/// every worker slot is busy, new connections queue in the kernel backlog
/// until a slot frees.
pub struct Listener {
    inner: TcpListener,
    worker_limit: Arc<Semaphore>,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to the configured address.
    ///
    /// Must be called from within a runtime. Port 0 requests an ephemeral
    /// port; the chosen port is available through [`Listener::local_addr`]
    /// once this returns.
    pub fn bind(config: &ListenerConfig, max_workers: usize) -> Result<Self, ServerError> {
        let bind_address = config.bind_address();
        let bind_err = |source: std::io::Error| ServerError::Bind {
            addr: bind_address.clone(),
            source,
        };

        let addr = bind_address
            .to_socket_addrs()
            .map_err(bind_err)?
            .next()
            .ok_or_else(|| {
                bind_err(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "address resolved to nothing",
                ))
            })?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
            .map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(ACCEPT_BACKLOG).map_err(bind_err)?;

        let inner = TcpListener::from_std(socket.into()).map_err(bind_err)?;
        let local_addr = inner.local_addr().map_err(bind_err)?;

        Ok(Self {
            inner,
            worker_limit: Arc::new(Semaphore::new(max_workers)),
            local_addr,
        })
    }

    /// Wrap an already-bound listener supplied by the embedder.
    pub fn from_std(
        listener: std::net::TcpListener,
        max_workers: usize,
    ) -> Result<Self, ServerError> {
        listener.set_nonblocking(true)?;
        let inner = TcpListener::from_std(listener)?;
        let local_addr = inner.local_addr()?;

        Ok(Self {
            inner,
            worker_limit: Arc::new(Semaphore::new(max_workers)),
            local_addr,
        })
    }

    /// Accept a connection, waiting for a worker slot first.
    ///
    /// The returned permit must be held for the connection's lifetime; it
    /// releases the slot on drop, including on panic.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, WorkerPermit), ServerError> {
        let permit = self
            .worker_limit
            .clone()
            .acquire_owned()
            .await
            .expect("worker semaphore closed unexpectedly");

        let (stream, addr) = self.inner.accept().await.map_err(ServerError::Io)?;

        tracing::debug!(
            peer_addr = %addr,
            available_workers = self.worker_limit.available_permits(),
            "connection accepted"
        );

        Ok((stream, addr, WorkerPermit { _permit: permit }))
    }

    /// The address this listener actually bound, ephemeral port resolved.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// A held worker-pool slot, released back on drop.
#[derive(Debug)]
pub struct WorkerPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}
