//! Server core
//!
//! Binds the HTTP listener and runs the accept loop. Each connection gets its
//! own task, holds a permit from the connection semaphore, and serves a single
//! request. Connections beyond the limit are answered with 503.

use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::error::{ProtocolError, ServerError};
use crate::protocol::responses::{HttpResponse, SERVICE_UNAVAILABLE};
use crate::protocol::{handle_request, protocol_error_response, read_request};
use crate::server::state::AppState;

/// Bounds on discarding unread input after a rejected request.
const DRAIN_LIMIT: u64 = 1024 * 1024;
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Limits applied to every connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub max_connections: usize,
    pub max_header_bytes: usize,
    pub max_body_bytes: u64,
}

impl ConnectionLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_connections: config.max_connections,
            max_header_bytes: config.max_header_bytes,
            max_body_bytes: config.max_request_body_bytes(),
        }
    }
}

pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
    connections: Arc<Semaphore>,
    limits: ConnectionLimits,
}

impl Server {
    /// Validate the configured directories and bind the listener.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let state = AppState::from_config(config)?;
        Self::with_state(&config.listen_address(), state, ConnectionLimits::from_config(config)).await
    }

    pub async fn with_state(
        addr: &str,
        state: AppState,
        limits: ConnectionLimits,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        info!("Server bound to {}", listener.local_addr()?);

        Ok(Self {
            listener,
            state: Arc::new(state),
            connections: Arc::new(Semaphore::new(limits.max_connections)),
            limits,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) {
        info!(
            "Starting RAX file browser on {} (max {} connections)",
            self.local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "unknown address".into()),
            self.limits.max_connections
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let Ok(permit) = Arc::clone(&self.connections).try_acquire_owned() else {
                        warn!("Too many connections, rejecting {addr}");
                        tokio::spawn(reject_busy(stream));
                        continue;
                    };

                    let state = Arc::clone(&self.state);
                    let limits = self.limits;

                    // Spawn a task per connection so the accept loop never blocks
                    tokio::spawn(async move {
                        let _permit = permit;
                        if let Err(e) = handle_connection(stream, addr, state, limits).await {
                            warn!("Failed to handle connection {addr}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }
}

/// Serves exactly one request on `stream`, then closes it.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    state: Arc<AppState>,
    limits: ConnectionLimits,
) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut rejected = false;

    let response = match read_request(&mut reader, limits.max_header_bytes, limits.max_body_bytes).await {
        Ok(request) => {
            let response = handle_request(&request, &state).await;
            info!(
                "{peer} {} {} -> {}",
                request.method.as_str(),
                request.path,
                response.status
            );
            response
        }
        Err(ProtocolError::ConnectionClosed) => {
            debug!("Connection closed by client {peer}");
            return Ok(());
        }
        Err(ProtocolError::Io(e)) => return Err(e),
        Err(e) => {
            warn!("Rejected request from {peer}: {e}");
            rejected = true;
            protocol_error_response(&e)
        }
    };

    response.write_to(&mut write_half).await?;
    write_half.shutdown().await?;

    if rejected {
        drain(&mut reader).await;
    }

    Ok(())
}

async fn reject_busy(mut stream: TcpStream) {
    let response = HttpResponse::error(SERVICE_UNAVAILABLE, "Too many connections. Try again later.");
    if let Err(e) = response.write_to(&mut stream).await {
        debug!("Failed to send busy response: {e}");
        return;
    }
    let _ = stream.shutdown().await;
    drain(&mut stream).await;
}

/// Discards input the client already sent, so closing the socket does not
/// reset the connection before the response is read.
async fn drain<R>(reader: &mut R)
where
    R: AsyncRead + Unpin,
{
    let mut limited = (&mut *reader).take(DRAIN_LIMIT);
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, tokio::io::copy(&mut limited, &mut tokio::io::sink())).await;
}
