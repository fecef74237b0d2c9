use crate::wire::RemoteNode;
use std::sync::Arc;

/// A node we know how to reach.
#[derive(Debug, Clone)]
pub struct Peer {
    pub address: String,
    pub remote: Arc<dyn RemoteNode>,
}

/// Lookup of known peers by address.
///
/// Requests from addresses the directory does not know are rejected before
/// any channel state is touched.
pub trait PeerDirectory: Send + Sync {
    fn lookup(&self, address: &str) -> Option<Peer>;
}
