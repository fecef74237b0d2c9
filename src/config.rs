use serde::Deserialize;

/// Per-node settings.
///
/// Deserializable so it can be embedded in the configuration file of the
/// application running the node; missing fields fall back to [Default].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Address other nodes know us by. Sent with every request so the
    /// counterparty can look us up in its peer directory.
    pub address: String,
    /// Version written into refund and commitment transactions.
    pub version: u32,
    /// Relative lock (in blocks) on the owner's output of every commitment.
    /// The counterparty has this long to use a revocation key.
    pub revocation_delay: u32,
    /// Lock time written into refund and commitment transactions.
    pub lock_time: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:8333"),
            version: 1,
            revocation_delay: 144,
            lock_time: 0,
        }
    }
}

impl NodeConfig {
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}
