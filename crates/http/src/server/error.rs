use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// The "bind error" of [`Server::start`](crate::server::Server::start): the
/// server never entered its running state.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("can't bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("invalid bind address: {reason}")]
    InvalidAddress { reason: String },
}

impl ServerError {
    pub fn bind(addr: SocketAddr, source: io::Error) -> Self {
        Self::Bind { addr, source }
    }

    pub fn invalid_address<S: ToString>(str: S) -> Self {
        Self::InvalidAddress { reason: str.to_string() }
    }
}
