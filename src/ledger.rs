//! The parts of the base ledger the channel needs: transactions, locking
//! scripts and the wallet that funds new channels.

pub mod script;
mod transaction;

pub use script::{determine_script_type, ScriptError, ScriptType};
pub use transaction::{
    decode_transaction, encode_transaction, validate, OutPoint, Transaction, TransactionInput,
    TransactionOutput, ValidationError,
};

use crate::types::PublicKey;
use std::sync::mpsc;

/// Asks the wallet for a funding transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletRequest {
    /// Amount locked into the channel.
    pub amount: u64,
    /// Fee budget the wallet has to reserve.
    pub fee: u64,
    pub counterparty_public_key: PublicKey,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("wallet could not fund the channel: {0}")]
pub struct WalletError(pub String);

/// Selects coins for new channels.
pub trait Wallet: Send + Sync {
    /// Build an unsigned transaction whose output 0 is a 2-of-2 multisig of
    /// our key and `request.counterparty_public_key`.
    ///
    /// The output has to hold `request.amount` plus whatever share of
    /// `request.fee` is not spent on the funding transaction itself; the
    /// refund transaction pays its fee out of it.
    fn generate_funding_transaction(&self, request: WalletRequest)
        -> Result<Transaction, WalletError>;
}

/// Queue of fully signed transactions that should be submitted to the
/// network.
pub type BroadcastSink = mpsc::Sender<Transaction>;
