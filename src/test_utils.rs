//! In-process doubles for the collaborators of a node.

use std::{
    collections::HashMap,
    sync::{
        mpsc::{self, Receiver},
        Arc, Weak,
    },
};

use parking_lot::{Mutex, RwLock};

use crate::{
    channel::ChannelTable,
    config::NodeConfig,
    ledger::{
        script, Transaction, TransactionInput, TransactionOutput, Wallet, WalletError,
        WalletRequest,
    },
    lnwire::envelope,
    node::LightningNode,
    peer::{Peer, PeerDirectory},
    sig::Signer,
    types::{Hash, PublicKey},
    wire::{decode_frame, serve, BytesBus, ProtoBufEncodingLayer, RemoteNode, TransportError},
};

pub type TestNode = LightningNode<TestDirectory, TestWallet>;

/// Funds every channel from a fresh coin and remembers what it was asked.
#[derive(Debug)]
pub struct TestWallet {
    public_key: PublicKey,
    pub requests: Arc<Mutex<Vec<WalletRequest>>>,
}

impl TestWallet {
    pub fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            requests: Arc::default(),
        }
    }
}

impl Wallet for TestWallet {
    fn generate_funding_transaction(
        &self,
        request: WalletRequest,
    ) -> Result<Transaction, WalletError> {
        self.requests.lock().push(request);
        let coin: Hash = rand::random();
        Ok(Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                reference_transaction_hash: coin.to_vec(),
                output_index: 0,
                unlocking_script: vec![],
            }],
            outputs: vec![
                TransactionOutput {
                    locking_script: script::multisig(
                        &self.public_key,
                        &request.counterparty_public_key,
                    ),
                    amount: request.amount + request.fee / 2,
                },
                TransactionOutput {
                    locking_script: script::pay_to_public_key(&self.public_key),
                    amount: 5_000,
                },
            ],
            witnesses: vec![],
            lock_time: 0,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestDirectory {
    peers: Arc<RwLock<HashMap<String, Peer>>>,
}

impl TestDirectory {
    pub fn register(&self, address: &str, remote: Arc<dyn RemoteNode>) {
        self.peers.write().insert(
            address.to_owned(),
            Peer {
                address: address.to_owned(),
                remote,
            },
        );
    }
}

impl PeerDirectory for TestDirectory {
    fn lookup(&self, address: &str) -> Option<Peer> {
        self.peers.read().get(address).cloned()
    }
}

/// Remote procedure a failure is injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    OpenChannel,
    UpdateTransactions,
    GetRevocationKey,
}

#[derive(Debug, Clone, Copy)]
struct Failure {
    call: Call,
    /// Whether the request still reaches the peer and only the answer is
    /// lost.
    delivered: bool,
}

/// Hands frames straight to [serve] on the target node.
#[derive(Debug)]
pub struct InProcessBus {
    target: Weak<TestNode>,
    failure: Mutex<Option<Failure>>,
}

impl InProcessBus {
    pub fn new(target: &Arc<TestNode>) -> Self {
        Self {
            target: Arc::downgrade(target),
            failure: Mutex::new(None),
        }
    }

    /// Fail the next `call`. If `delivered` the peer handles the request but
    /// the answer is dropped.
    pub fn fail_next(&self, call: Call, delivered: bool) {
        *self.failure.lock() = Some(Failure { call, delivered });
    }

    fn take_failure(&self, frame: &[u8]) -> Option<Failure> {
        let call = match decode_frame(frame).ok()?.msg? {
            envelope::Msg::OpenChannelRequest(_) => Call::OpenChannel,
            envelope::Msg::UpdateTransactions(_) => Call::UpdateTransactions,
            envelope::Msg::GetRevocationKey(_) => Call::GetRevocationKey,
            _ => return None,
        };
        let mut failure = self.failure.lock();
        match *failure {
            Some(f) if f.call == call => failure.take(),
            _ => None,
        }
    }
}

impl BytesBus for InProcessBus {
    fn request(&self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        let failure = self.take_failure(frame);
        if matches!(failure, Some(Failure { delivered: false, .. })) {
            return Err(TransportError("connection refused".into()));
        }

        let target = self
            .target
            .upgrade()
            .ok_or_else(|| TransportError("peer is gone".into()))?;
        let reply = serve(&target, frame).map_err(|e| TransportError(e.to_string()))?;

        match failure {
            Some(_) => Err(TransportError("connection reset".into())),
            None => Ok(reply),
        }
    }
}

type Link = ProtoBufEncodingLayer<InProcessBus>;

pub struct TestPeer {
    pub node: Arc<TestNode>,
    pub directory: TestDirectory,
    pub wallet_requests: Arc<Mutex<Vec<WalletRequest>>>,
    pub broadcasts: Receiver<Transaction>,
    links: Mutex<HashMap<String, Arc<Link>>>,
}

impl TestPeer {
    pub fn new(address: &str) -> Self {
        let signer = Signer::new(&mut rand::thread_rng());
        let wallet = TestWallet::new(signer.public_key());
        let wallet_requests = wallet.requests.clone();
        let directory = TestDirectory::default();
        let (tx, broadcasts) = mpsc::channel();
        let node = LightningNode::new(
            NodeConfig::with_address(address),
            signer,
            directory.clone(),
            wallet,
            Arc::new(ChannelTable::new()),
            tx,
        );

        Self {
            node: Arc::new(node),
            directory,
            wallet_requests,
            broadcasts,
            links: Mutex::default(),
        }
    }

    pub fn address(&self) -> &str {
        self.node.address()
    }

    /// Add `other` to our peer directory.
    pub fn connect(&self, other: &TestPeer) {
        let link = Arc::new(ProtoBufEncodingLayer::new(InProcessBus::new(&other.node)));
        self.directory.register(other.address(), link.clone());
        self.links.lock().insert(other.address().to_owned(), link);
    }

    /// The transport we use to reach `address`.
    pub fn link(&self, address: &str) -> Arc<Link> {
        self.links.lock()[address].clone()
    }
}

/// Two nodes, "alice" and "bob", that know each other.
pub fn pair() -> (TestPeer, TestPeer) {
    let alice = TestPeer::new("alice");
    let bob = TestPeer::new("bob");
    alice.connect(&bob);
    bob.connect(&alice);
    (alice, bob)
}

/// Open a channel from `funder` to `fundee` and confirm its funding on both
/// sides.
pub fn open(funder: &TestPeer, fundee: &TestPeer, amount: u64, fee: u64) {
    funder
        .node
        .create_channel(fundee.address(), fundee.node.public_key(), amount, fee)
        .unwrap();
    funder.node.mark_funding_confirmed(fundee.address()).unwrap();
    fundee.node.mark_funding_confirmed(funder.address()).unwrap();
}
