use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    channel::{ChannelPhase, ChannelRecord, ChannelTable, SharedRecord},
    config::NodeConfig,
    error::Error,
    ledger::{BroadcastSink, Transaction, Wallet},
    peer::{Peer, PeerDirectory},
    sig::Signer,
    types::PublicKey,
};

/// One party of any number of payment channels.
///
/// The handshakes are implemented in [crate::channel]: the funder side of
/// Open in [LightningNode::create_channel], the updater side of Advance in
/// [LightningNode::update_state] and the responder side of both in the
/// handlers named after the remote procedures they serve.
///
/// Note: An application usually has one peer directory and one wallet type,
/// so both are generics instead of trait objects.
#[derive(Debug)]
pub struct LightningNode<D: PeerDirectory, W: Wallet> {
    pub(crate) config: NodeConfig,
    pub(crate) signer: Signer,
    pub(crate) peers: D,
    pub(crate) wallet: W,
    pub(crate) channels: Arc<ChannelTable>,
    broadcast: Mutex<BroadcastSink>,
}

impl<D: PeerDirectory, W: Wallet> LightningNode<D, W> {
    pub fn new(
        config: NodeConfig,
        signer: Signer,
        peers: D,
        wallet: W,
        channels: Arc<ChannelTable>,
        broadcast: BroadcastSink,
    ) -> Self {
        Self {
            config,
            signer,
            peers,
            wallet,
            channels,
            broadcast: Mutex::new(broadcast),
        }
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn public_key(&self) -> PublicKey {
        self.signer.public_key()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn channels(&self) -> &Arc<ChannelTable> {
        &self.channels
    }

    /// Copy of the channel with `address`.
    pub fn channel(&self, address: &str) -> Option<ChannelRecord> {
        self.channels.get(address).map(|r| r.lock().clone())
    }

    pub fn channel_phase(&self, address: &str) -> Option<ChannelPhase> {
        self.channels.get(address).map(|r| r.lock().phase())
    }

    /// Tell the node the funding transaction of the channel with `address` is
    /// confirmed on the ledger. Only then can the channel advance.
    pub fn mark_funding_confirmed(&self, address: &str) -> Result<(), Error> {
        self.record(address)?.lock().confirm_funding()
    }

    pub(crate) fn lookup_peer(&self, address: &str) -> Result<Peer, Error> {
        self.peers
            .lookup(address)
            .ok_or_else(|| Error::UnknownPeer(address.to_owned()))
    }

    pub(crate) fn record(&self, address: &str) -> Result<SharedRecord, Error> {
        self.channels
            .get(address)
            .ok_or_else(|| Error::NoChannel(address.to_owned()))
    }

    pub(crate) fn broadcast(&self, tx: Transaction) -> Result<(), Error> {
        self.broadcast.lock().send(tx).map_err(|_| Error::Broadcast)
    }
}
