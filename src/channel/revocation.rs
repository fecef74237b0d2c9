use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::{
    ledger::{ScriptType, TransactionOutput},
    sig,
    types::{Hash, KeyPair, PrivateKey},
};

/// Draw a fresh revocation key pair.
///
/// Uses the thread-local, OS-seeded CSPRNG. A repeated key would let the
/// counterparty punish a state it was never given the key for, so keys are
/// never derived from each other.
pub fn generate_revocation_key_pair() -> KeyPair {
    sig::generate_key_pair(&mut rand::thread_rng())
}

/// Everything needed to claim one output of a superseded counterparty
/// commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevocationInfo {
    pub revocation_private_key: PrivateKey,
    /// Superseded state the key belongs to.
    pub state: u64,
    #[serde(skip)]
    pub punished_output: TransactionOutput,
    pub output_index: u32,
    pub transaction_hash: Hash,
    pub script_type: ScriptType,
}

/// Both halves of the revocation bookkeeping of one channel.
///
/// There is no way to remove an entry: once a key has been handed out or
/// received it stays valid for as long as the channel exists.
#[derive(Debug, Clone, Default)]
pub struct RevocationLedger {
    mine: BTreeMap<u64, PrivateKey>,
    theirs: HashMap<Hash, RevocationInfo>,
}

impl RevocationLedger {
    /// Our private revocation key for `state`.
    pub fn mine(&self, state: u64) -> Option<&PrivateKey> {
        self.mine.get(&state)
    }

    pub fn my_keys(&self) -> impl Iterator<Item = (u64, &PrivateKey)> {
        self.mine.iter().map(|(state, key)| (*state, key))
    }

    /// Revocation material for the counterparty commitment with the given
    /// content hash.
    pub fn punishment_for(&self, transaction_hash: &Hash) -> Option<&RevocationInfo> {
        self.theirs.get(transaction_hash)
    }

    pub fn received(&self) -> impl Iterator<Item = &RevocationInfo> {
        self.theirs.values()
    }

    pub fn received_len(&self) -> usize {
        self.theirs.len()
    }

    /// Keys are generated exactly once per state.
    pub(super) fn insert_mine(&mut self, state: u64, key: PrivateKey) {
        let previous = self.mine.insert(state, key);
        debug_assert!(previous.is_none(), "revocation key for state {state} replaced");
    }

    pub(super) fn insert_theirs(&mut self, info: RevocationInfo) {
        self.theirs.entry(info.transaction_hash).or_insert(info);
    }
}
