//! # Accept Loop
//! src/server/tcp.rs
//!
//! Dueño del socket de escucha. Dos modos, elegidos al arrancar:
//!
//! - **single**: cada conexión se atiende completa antes de aceptar la
//!   siguiente. Solo un handler corre a la vez.
//! - **multi**: un thread por conexión aceptada, sin join ni supervisión.
//!   El número de threads no está acotado; un cliente lento ocupa su
//!   thread indefinidamente.
//!
//! Un error al aceptar o al atender una conexión se registra y el loop
//! continúa.

use crate::config::{Config, ServerMode};
use crate::error::{Result, ServerError};
use crate::server::handler::ConnectionHandler;
use crate::state::SharedState;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Servidor HTTP de archivos
pub struct Server {
    mode: ServerMode,
    listener: TcpListener,
    handler: Arc<ConnectionHandler>,
    /// Threads de conexión vivos (modo multi)
    active: Arc<AtomicUsize>,
    next_id: AtomicU64,
}

/// Decrementa el contador de threads activos al terminar, incluso con panic
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Crea el socket de escucha con el backlog configurado
    pub fn bind(config: &Config, state: SharedState) -> Result<Self> {
        config.validate().map_err(ServerError::Config)?;

        let listener = bind_listener(&config.address(), config.backlog as i32)?;
        let handler = Arc::new(ConnectionHandler::new(config, state));

        info!(
            address = %listener.local_addr()?,
            mode = %config.mode,
            backlog = config.backlog,
            "listening"
        );

        Ok(Self {
            mode: config.mode,
            listener,
            handler,
            active: Arc::new(AtomicUsize::new(0)),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handler(&self) -> Arc<ConnectionHandler> {
        Arc::clone(&self.handler)
    }

    /// Threads de conexión que siguen corriendo
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Acepta conexiones para siempre
    pub fn run(&self) -> Result<()> {
        let mut consecutive_failures = 0u32;
        loop {
            match self.accept_next() {
                Ok(()) => consecutive_failures = 0,
                Err(e) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    let wait = accept_backoff(consecutive_failures);
                    error!(
                        error = %e,
                        failures = consecutive_failures,
                        retry_in_ms = wait.as_millis() as u64,
                        "failed to accept connection"
                    );
                    thread::sleep(wait);
                }
            }
        }
    }

    /// Acepta una conexión y la despacha según el modo
    pub fn accept_next(&self) -> Result<()> {
        let (stream, peer) = self.listener.accept()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, peer = %peer, "accepted");

        match self.mode {
            ServerMode::Single => serve_connection(stream, peer, &self.handler),
            ServerMode::Multi => self.spawn_worker(id, stream, peer),
        }
        Ok(())
    }

    fn spawn_worker(&self, id: u64, stream: TcpStream, peer: SocketAddr) {
        let handler = Arc::clone(&self.handler);
        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard(Arc::clone(&self.active));

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", id))
            .spawn(move || {
                let _guard = guard;
                serve_connection(stream, peer, &handler);
            });

        // Si el thread no se pudo crear, el closure (y el stream) se sueltan aquí
        if let Err(e) = spawned {
            error!(id, error = %e, "failed to spawn connection thread");
        }
    }
}

/// Espera tras `failures` errores seguidos de `accept` (ej: EMFILE).
/// Empieza en 10 ms y se duplica hasta 1 s.
fn accept_backoff(failures: u32) -> Duration {
    let exponent = failures.saturating_sub(1).min(7);
    (ACCEPT_BACKOFF_BASE * 2u32.pow(exponent)).min(ACCEPT_BACKOFF_MAX)
}

/// Atiende una conexión y la cierra al soltar el stream
fn serve_connection(mut stream: TcpStream, peer: SocketAddr, handler: &ConnectionHandler) {
    let start = Instant::now();
    let peer_ip = peer.ip().to_string();

    match handler.handle(&mut stream, &peer_ip) {
        Ok(Some(outcome)) => {
            info!(
                peer = %peer,
                identity = outcome.identity.as_deref().unwrap_or("-"),
                path = outcome.path.as_deref().unwrap_or("-"),
                status = outcome.status.as_u16(),
                hits = outcome.hits.unwrap_or(0),
                bytes = outcome.body_bytes,
                latency_ms = start.elapsed().as_secs_f64() * 1000.0,
                "served"
            );
        }
        Ok(None) => {}
        Err(e) => {
            warn!(peer = %peer, error = %e, "connection aborted");
        }
    }
}

/// `TcpListener` con `SO_REUSEADDR` y backlog explícito
fn bind_listener(address: &str, backlog: i32) -> io::Result<TcpListener> {
    let addr = address.to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("could not resolve {}", address),
        )
    })?;

    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    Ok(socket.into())
}
