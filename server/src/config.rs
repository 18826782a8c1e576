use clap::Parser;

pub const DEFAULT_PORT: u16 = 8080;

/// Command line and environment configuration for the directory server.
#[derive(Debug, Clone, Parser)]
#[command(name = "chat-server", version, about = "Directory server for peerchat")]
pub struct ServerConfig {
    /// Port to accept client connections on
    #[arg(value_name = "PORT")]
    port_arg: Option<u16>,

    /// Port to accept client connections on (same as the positional form)
    #[arg(long = "port", value_name = "PORT", env = "PEERCHAT_PORT")]
    port_flag: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "PEERCHAT_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServerConfig {
    /// The positional port wins over `--port` and `PEERCHAT_PORT`.
    pub fn port(&self) -> u16 {
        self.port_arg.or(self.port_flag).unwrap_or(DEFAULT_PORT)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["chat-server"]).unwrap();
        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.listen_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_port_argument() {
        let config = ServerConfig::try_parse_from(["chat-server", "9000", "--host", "0.0.0.0"]).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_port_flag() {
        let config = ServerConfig::try_parse_from(["chat-server", "--port", "9001"]).unwrap();
        assert_eq!(config.port(), 9001);

        let config = ServerConfig::try_parse_from(["chat-server", "9000", "--port", "9001"]).unwrap();
        assert_eq!(config.port(), 9000);
    }
}
