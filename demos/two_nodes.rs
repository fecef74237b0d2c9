//! Walkthrough: Alice funds a channel with Bob, both advance it twice.
//!
//! Each node answers the other's requests from a blocking tokio task. Frames
//! reach that task over a [std::sync::mpsc] channel and are printed as they
//! pass.

use lightning_channel::{
    channel::ChannelTable,
    config::NodeConfig,
    ledger::{
        script, Transaction, TransactionInput, TransactionOutput, Wallet, WalletError,
        WalletRequest,
    },
    peer::{Peer, PeerDirectory},
    sig::Signer,
    wire::{serve, BytesBus, ProtoBufEncodingLayer, TransportError},
    LightningNode, PublicKey,
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{mpsc, Arc, Weak},
};
use tokio::task::JoinHandle;

type Request = (Vec<u8>, mpsc::Sender<Vec<u8>>);
type Node = LightningNode<Directory, DemoWallet>;

/// Connection to the task serving one node.
#[derive(Debug)]
struct Bus {
    from: &'static str,
    to: &'static str,
    tx: Mutex<mpsc::Sender<Request>>,
}

impl BytesBus for Bus {
    fn request(&self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        println!("{}->{}: {} bytes", self.from, self.to, frame.len());
        let (reply_tx, reply_rx) = mpsc::channel();
        self.tx
            .lock()
            .send((frame.to_vec(), reply_tx))
            .map_err(|_| TransportError(format!("{} is offline", self.to)))?;
        let reply = reply_rx
            .recv()
            .map_err(|_| TransportError(format!("{} hung up", self.to)))?;
        println!("{}->{}: {} bytes", self.to, self.from, reply.len());
        Ok(reply)
    }
}

#[derive(Debug)]
struct Directory(HashMap<String, Peer>);

impl PeerDirectory for Directory {
    fn lookup(&self, address: &str) -> Option<Peer> {
        self.0.get(address).cloned()
    }
}

/// Funds channels out of thin air.
#[derive(Debug)]
struct DemoWallet(PublicKey);

impl Wallet for DemoWallet {
    fn generate_funding_transaction(
        &self,
        request: WalletRequest,
    ) -> Result<Transaction, WalletError> {
        Ok(Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                reference_transaction_hash: rand::random::<[u8; 32]>().to_vec(),
                output_index: 0,
                unlocking_script: vec![],
            }],
            outputs: vec![TransactionOutput {
                locking_script: script::multisig(&self.0, &request.counterparty_public_key),
                amount: request.amount + request.fee / 2,
            }],
            witnesses: vec![],
            lock_time: 0,
        })
    }
}

/// Helper macro to print significant places in the protocol.
macro_rules! print_bold {
    ($($arg:tt)*) => {
        print!("\x1b[1m");
        print!($($arg)*);
        println!("\x1b[0m");
    };
}

fn node(
    address: &'static str,
    peer: &'static str,
    to_peer: mpsc::Sender<Request>,
) -> (Node, mpsc::Receiver<Transaction>) {
    let signer = Signer::new(&mut rand::thread_rng());
    let bus = Bus {
        from: address,
        to: peer,
        tx: Mutex::new(to_peer),
    };
    let mut peers = HashMap::new();
    peers.insert(
        peer.to_string(),
        Peer {
            address: peer.to_string(),
            remote: Arc::new(ProtoBufEncodingLayer::new(bus)),
        },
    );
    let wallet = DemoWallet(signer.public_key());
    let (broadcast_tx, broadcast_rx) = mpsc::channel();
    let node = LightningNode::new(
        NodeConfig::with_address(address),
        signer,
        Directory(peers),
        wallet,
        Arc::new(ChannelTable::new()),
        broadcast_tx,
    );
    (node, broadcast_rx)
}

/// Answer requests for `node` until every sender is gone.
///
/// Only holds a weak reference: each node owns the sender to the other
/// node's server, so strong ones would keep both alive forever.
fn spawn_server(node: Weak<Node>, rx: mpsc::Receiver<Request>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        for (frame, reply) in rx {
            let Some(node) = node.upgrade() else {
                break;
            };
            match serve(&node, &frame) {
                Ok(answer) => {
                    let _ = reply.send(answer);
                }
                Err(e) => println!("{}: dropping malformed frame: {}", node.address(), e),
            }
        }
    })
}

fn print_ledger(node: &Node, peer: &str) {
    let Some(record) = node.channel(peer) else {
        return;
    };
    println!(
        "{}: state {}, {} commitments each side",
        node.address(),
        record.state(),
        record.my_commitments().len()
    );
    for (state, _) in record.revocations().my_keys() {
        println!("  own revocation key for state {}", state);
    }
    for info in record.revocations().received() {
        println!(
            "  can punish {:?} output {} ({:?}, {} units) from state {}",
            info.transaction_hash,
            info.output_index,
            info.script_type,
            info.punished_output.amount,
            info.state
        );
    }
}

#[tokio::main]
async fn main() {
    let (to_alice, alice_rx) = mpsc::channel();
    let (to_bob, bob_rx) = mpsc::channel();

    let (alice, alice_broadcasts) = node("alice", "bob", to_bob);
    let (bob, _) = node("bob", "alice", to_alice);
    let alice = Arc::new(alice);
    let bob = Arc::new(bob);
    let servers = [
        spawn_server(Arc::downgrade(&alice), alice_rx),
        spawn_server(Arc::downgrade(&bob), bob_rx),
    ];

    let bob_key = bob.public_key();
    let a = alice.clone();
    let b = bob.clone();
    tokio::task::spawn_blocking(move || {
        print_bold!("Alice opens a channel with 1000 units, fee 10");
        a.create_channel("bob", bob_key, 1000, 10).unwrap();
        let funding = alice_broadcasts.recv().unwrap();
        println!("Alice broadcasts funding {:?}", funding.hash());

        print_bold!("Funding confirmed");
        a.mark_funding_confirmed("bob").unwrap();
        b.mark_funding_confirmed("alice").unwrap();
        print_ledger(&a, "bob");
        print_ledger(&b, "alice");

        print_bold!("Alice pays Bob 300");
        let tx = a.build_commitment("bob", 700).unwrap();
        a.update_state("bob", tx).unwrap();
        print_ledger(&a, "bob");
        print_ledger(&b, "alice");

        print_bold!("Bob pays Alice 100");
        let tx = b.build_commitment("alice", 200).unwrap();
        b.update_state("alice", tx).unwrap();
        print_ledger(&a, "bob");
        print_ledger(&b, "alice");
    })
    .await
    .unwrap();

    // Dropping the nodes closes the buses, which ends the servers.
    drop(alice);
    drop(bob);
    for server in servers {
        server.await.unwrap();
    }
}
