//! Protocol constants and small environment-driven overrides.

/// Length in hex characters of a block hash (SHA-256 digest).
pub const BLOCK_HASH_LENGTH: usize = 64;
/// Target time between mined blocks, in milliseconds.
pub const BLOCK_MINING_RATE_MS: i64 = 10 * 1000;
/// Expected decimal digit count of a millisecond UTC timestamp.
pub const BLOCK_TIMESTAMP_LENGTH: usize = 13;

/// Mining reward paid out per mined block.
pub const MINING_REWARD: u64 = 50;
/// Sentinel sender address used by mining-reward transactions.
pub const MINING_REWARD_ADDRESS: &str = "*--mining-reward--*";

/// Seconds between peer heartbeat/liveness checks.
pub const HEARTBEAT_RATE_SEC: u64 = 5;

/// P2P wire channel names.
pub const CHANNEL_NODE: &str = "node";
pub const CHANNEL_CHAIN: &str = "chain";
pub const CHANNEL_SYNC: &str = "sync";
pub const CHANNEL_TRANSACT: &str = "transact";

/// Default P2P bind host, overridable with `KNOTCHAIN_P2P_HOST`.
pub const P2P_HOST_DEFAULT: &str = "127.0.0.1";
/// Default P2P bind port, overridable with `KNOTCHAIN_P2P_PORT`.
pub const P2P_PORT_DEFAULT: u16 = 9000;
/// Default HTTP collaborator bind port, overridable with `KNOTCHAIN_HTTP_PORT`.
pub const HTTP_PORT_DEFAULT: u16 = 9001;

/// Node runtime configuration, assembled from defaults plus env overrides.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub p2p_host: String,
    pub p2p_port: u16,
    pub http_port: u16,
    pub peers: Vec<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            p2p_host: P2P_HOST_DEFAULT.to_string(),
            p2p_port: P2P_PORT_DEFAULT,
            http_port: HTTP_PORT_DEFAULT,
            peers: Vec::new(),
        }
    }
}

impl NodeConfig {
    /// Build configuration from defaults, applying `KNOTCHAIN_*` env overrides.
    pub fn from_env() -> Self {
        let mut config = NodeConfig::default();

        if let Ok(host) = std::env::var("KNOTCHAIN_P2P_HOST")
            && !host.trim().is_empty()
        {
            config.p2p_host = host;
        }
        if let Ok(p) = std::env::var("KNOTCHAIN_P2P_PORT")
            && let Ok(port) = p.parse()
        {
            config.p2p_port = port;
        }
        if let Ok(p) = std::env::var("KNOTCHAIN_HTTP_PORT")
            && let Ok(port) = p.parse()
        {
            config.http_port = port;
        }
        if let Ok(peers) = std::env::var("KNOTCHAIN_PEERS") {
            config.peers = peers
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.p2p_host, P2P_HOST_DEFAULT);
        assert_eq!(config.p2p_port, P2P_PORT_DEFAULT);
        assert!(config.peers.is_empty());
    }
}
