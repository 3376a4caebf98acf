//! The listening side: accepts transport connections and runs one
//! [`HttpConnection`] task per connection.
//!
//! Each [`Server`] owns its own listener, so several can run in one
//! process. [`Server::terminate`] stops accepting, lets in-flight
//! connections finish their current request/response cycle, and aborts
//! whatever is still running once the grace period elapses.

mod config;
mod error;

pub use config::ServerConfig;
pub use error::ServerError;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::Application;
use crate::connection::{ConnectionOptions, HttpConnection};
use crate::protocol::ConnectionInfo;

/// A running server.
///
/// Dropping a `Server` signals shutdown without waiting for it; call
/// [`terminate`](Server::terminate) to wait until every connection is gone.
#[derive(Debug)]
pub struct Server {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Binds `config`'s address and starts accepting connections for `app`.
    ///
    /// Fails before returning when the address is invalid or already in use.
    pub async fn start<A>(config: ServerConfig, app: A) -> Result<Self, ServerError>
    where
        A: Application + 'static,
    {
        let addr = config.resolve().await?;
        let listener = TcpListener::bind(addr).await.map_err(|e| ServerError::bind(addr, e))?;
        let local_addr = listener.local_addr().map_err(|e| ServerError::bind(addr, e))?;
        info!(%local_addr, "start listening");

        let shutdown = CancellationToken::new();
        let acceptor = Acceptor {
            listener,
            local_addr,
            app: Arc::new(app),
            options: config.connection_options(),
            grace_period: config.shutdown_grace_period(),
            shutdown: shutdown.clone(),
        };
        let accept_task = tokio::spawn(acceptor.run());

        Ok(Self { local_addr, shutdown, accept_task: Mutex::new(Some(accept_task)) })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Stops accepting, releases the listener and waits for open connections
    /// to drain. Calling it again is a no-op.
    pub async fn terminate(&self) {
        self.shutdown.cancel();

        let accept_task = self.accept_task.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(accept_task) = accept_task else {
            return;
        };

        if let Err(e) = accept_task.await {
            error!(cause = %e, "accept loop ended abnormally");
        }
        info!(local_addr = %self.local_addr, "server terminated");
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct Acceptor<A> {
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Arc<A>,
    options: ConnectionOptions,
    grace_period: Duration,
    shutdown: CancellationToken,
}

impl<A> Acceptor<A>
where
    A: Application + 'static,
{
    async fn run(self) {
        let Acceptor { listener, local_addr, app, options, grace_period, shutdown } = self;
        let mut connections = JoinSet::new();

        loop {
            select! {
                biased;

                () = shutdown.cancelled() => break,

                Some(joined) = connections.join_next() => {
                    if let Err(e) = joined {
                        error!(cause = %e, "connection task failed");
                    }
                }

                accepted = listener.accept() => {
                    let (tcp_stream, remote_addr) = match accepted {
                        Ok(stream_and_addr) => stream_and_addr,
                        Err(e) => {
                            warn!(cause = %e, "failed to accept");
                            continue;
                        }
                    };

                    debug!(%remote_addr, "accept connection");
                    let info = ConnectionInfo::new(Some(local_addr), Some(remote_addr));
                    connections.spawn(serve(tcp_stream, info, Arc::clone(&app), options, shutdown.clone()));
                }
            }
        }

        drop(listener);
        info!(%local_addr, connections = connections.len(), "stopped accepting, draining connections");

        let drained = timeout(grace_period, async {
            while connections.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            warn!(remaining = connections.len(), grace_period = ?grace_period, "grace period elapsed, aborting connections");
            connections.shutdown().await;
        }
    }
}

async fn serve<A>(tcp_stream: TcpStream, info: ConnectionInfo, app: Arc<A>, options: ConnectionOptions, shutdown: CancellationToken)
where
    A: Application,
{
    if let Err(e) = tcp_stream.set_nodelay(true) {
        debug!(cause = %e, "can't set TCP_NODELAY");
    }

    let (reader, writer) = tcp_stream.into_split();
    let connection = HttpConnection::with_options(reader, writer, info, options);
    match connection.process(app, shutdown).await {
        Ok(()) => debug!(remote_addr = ?info.remote_addr, "finished process, connection shutdown"),
        Err(e) => warn!(remote_addr = ?info.remote_addr, cause = %e, "connection closed with error"),
    }
}
