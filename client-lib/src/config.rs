use std::net::IpAddr;

use clap::Parser;

pub const DEFAULT_SERVER: &str = "localhost:8080";

/// Command line and environment configuration for a chat client.
#[derive(Debug, Clone, Parser)]
#[command(name = "chat-client", version, about = "Terminal client for peerchat")]
pub struct ClientConfig {
    /// Name to register with the server
    #[arg(default_value = "default_user")]
    pub username: String,

    /// Directory server address (host:port)
    #[arg(env = "PEERCHAT_SERVER", default_value = DEFAULT_SERVER)]
    pub server: String,

    /// Address to bind the inbound listener on. Defaults to the local address
    /// of the connection used to register.
    #[arg(long, env = "PEERCHAT_LISTEN_HOST")]
    pub listen_host: Option<IpAddr>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ClientConfig {
    pub fn new(username: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            server: server.into(),
            listen_host: None,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::try_parse_from(["chat-client"]).unwrap();
        assert_eq!(config.username, "default_user");
        assert_eq!(config.server, DEFAULT_SERVER);
        assert!(config.listen_host.is_none());
    }

    #[test]
    fn test_positional_arguments() {
        let config = ClientConfig::try_parse_from(["chat-client", "alice", "10.0.0.2:9000"]).unwrap();
        assert_eq!(config.username, "alice");
        assert_eq!(config.server, "10.0.0.2:9000");
    }
}
