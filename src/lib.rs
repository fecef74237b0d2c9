//! Two-party payment channels with revocable commitments.
//!
//! A [LightningNode] opens channels with its peers, advances them to new
//! balance splits and keeps the revocation keys that make superseded
//! commitments punishable. Transport, peer discovery and the wallet are
//! supplied by the application through [wire::BytesBus],
//! [peer::PeerDirectory] and [ledger::Wallet].

pub mod channel;
pub mod config;
mod error;
pub mod ledger;
pub mod messages;
mod node;
pub mod peer;
pub mod sig;
mod types;
pub mod wire;

#[cfg(test)]
mod test_utils;

pub use error::{Error, TransactionKind};
pub use node::LightningNode;
pub use types::{ByteLengthMismatch, Hash, KeyPair, PrivateKey, PublicKey, Signature};

// Public so applications can route frames themselves; the typed messages in
// [messages] are what the node works with.
pub mod lnwire;
