use std::net::SocketAddr;

use peerchat_server::ChatError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Error: User '{0}' already exists on the server!")]
    DuplicateUser(String),

    #[error("Could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server replied with an invalid port: {0}")]
    InvalidPort(String),

    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
