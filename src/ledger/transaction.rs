use crate::types::Hash;
use prost::{DecodeError, Message};
use sha3::{Digest, Sha3_256};
use std::collections::HashSet;

/// A base-ledger transaction.
///
/// Witnesses hold the signatures and are excluded from [Transaction::hash],
/// so co-signing a transaction does not change its identity.
#[derive(Clone, PartialEq, Message)]
pub struct Transaction {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(message, repeated, tag = "2")]
    pub inputs: Vec<TransactionInput>,
    #[prost(message, repeated, tag = "3")]
    pub outputs: Vec<TransactionOutput>,
    #[prost(bytes = "vec", repeated, tag = "4")]
    pub witnesses: Vec<Vec<u8>>,
    #[prost(uint32, tag = "5")]
    pub lock_time: u32,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TransactionInput {
    #[prost(bytes = "vec", tag = "1")]
    pub reference_transaction_hash: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub output_index: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub unlocking_script: Vec<u8>,
}

#[derive(Clone, PartialEq, Eq, Message)]
pub struct TransactionOutput {
    #[prost(bytes = "vec", tag = "1")]
    pub locking_script: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub amount: u64,
}

/// Reference to a single output of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

impl Transaction {
    /// Content hash: SHA3-256 over the encoding without witnesses.
    pub fn hash(&self) -> Hash {
        let mut content = self.clone();
        content.witnesses.clear();
        Hash(Sha3_256::digest(content.encode_to_vec()).into())
    }

    pub fn outpoint(&self, index: u32) -> OutPoint {
        OutPoint {
            hash: self.hash(),
            index,
        }
    }

    /// Whether this transaction has exactly one input and it spends `outpoint`.
    pub fn spends_only(&self, outpoint: &OutPoint) -> bool {
        match self.inputs.as_slice() {
            [input] => {
                input.reference_transaction_hash == outpoint.hash.0
                    && input.output_index == outpoint.index
            }
            _ => false,
        }
    }

    /// Sum of all output amounts, `None` on overflow.
    pub fn total_output(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
    }
}

impl TransactionInput {
    pub fn spending(outpoint: &OutPoint) -> Self {
        Self {
            reference_transaction_hash: outpoint.hash.to_vec(),
            output_index: outpoint.index,
            unlocking_script: vec![],
        }
    }
}

pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    tx.encode_to_vec()
}

pub fn decode_transaction(bytes: &[u8]) -> Result<Transaction, DecodeError> {
    Transaction::decode(bytes)
}

/// Structural rules every transaction we sign has to follow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("transaction has no inputs")]
    NoInputs,
    #[error("transaction has no outputs")]
    NoOutputs,
    #[error("output {0} is spent twice")]
    DuplicateInput(u32),
    #[error("output amounts overflow")]
    AmountOverflow,
    #[error("transaction does not spend the channel funding output")]
    WrongFundingOutpoint,
    #[error("funding output is not a 2-of-2 multisig of both channel parties")]
    NotChannelFunding,
    #[error("expected {expected} outputs, got {actual}")]
    OutputCount { expected: usize, actual: usize },
    #[error("outputs add up to {actual}, channel capacity is {expected}")]
    CapacityMismatch { expected: u64, actual: u64 },
    #[error("output {0} does not pay the expected key")]
    WrongRecipient(u32),
    #[error("output {0} is not revocable")]
    NotRevocable(u32),
    #[error("output {0} commits to a revocation key we do not hold")]
    UnknownRevocationKey(u32),
    #[error("balances differ from the proposed commitment")]
    SplitMismatch,
    #[error("transaction content was altered by the counterparty")]
    Altered,
    #[error("transaction is missing the counterparty signature")]
    MissingSignature,
}

/// Check the rules that do not depend on the ledger state.
///
/// Spending and script execution against the UTXO set is left to the base
/// ledger.
pub fn validate(tx: &Transaction) -> Result<(), ValidationError> {
    if tx.inputs.is_empty() {
        return Err(ValidationError::NoInputs);
    }
    if tx.outputs.is_empty() {
        return Err(ValidationError::NoOutputs);
    }

    let mut spent = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !spent.insert((input.reference_transaction_hash.as_slice(), input.output_index)) {
            return Err(ValidationError::DuplicateInput(input.output_index));
        }
    }

    tx.total_output().ok_or(ValidationError::AmountOverflow)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                reference_transaction_hash: vec![0xaa; 32],
                output_index: 1,
                unlocking_script: vec![],
            }],
            outputs: vec![
                TransactionOutput {
                    locking_script: vec![1, 2, 3],
                    amount: 600,
                },
                TransactionOutput {
                    locking_script: vec![4, 5, 6],
                    amount: 400,
                },
            ],
            witnesses: vec![],
            lock_time: 0,
        }
    }

    #[test]
    fn hash_ignores_witnesses() {
        let mut signed = tx();
        signed.witnesses.push(vec![9; 64]);
        assert_eq!(signed.hash(), tx().hash());

        let mut changed = tx();
        changed.outputs[1].amount += 1;
        assert_ne!(changed.hash(), tx().hash());
    }

    #[test]
    fn decode_keeps_content_hash() {
        let mut signed = tx();
        signed.witnesses.push(vec![9; 64]);
        let decoded = decode_transaction(&encode_transaction(&signed)).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.hash(), signed.hash());
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_transaction(&[0xff, 0xff, 0xff]).is_err());
    }

    #[test]
    fn validation() {
        assert_eq!(validate(&tx()), Ok(()));

        let mut t = tx();
        t.inputs.clear();
        assert_eq!(validate(&t), Err(ValidationError::NoInputs));

        let mut t = tx();
        t.outputs.clear();
        assert_eq!(validate(&t), Err(ValidationError::NoOutputs));

        let mut t = tx();
        t.inputs.push(t.inputs[0].clone());
        assert_eq!(validate(&t), Err(ValidationError::DuplicateInput(1)));

        let mut t = tx();
        t.outputs[0].amount = u64::MAX;
        assert_eq!(validate(&t), Err(ValidationError::AmountOverflow));
    }

    #[test]
    fn spends_only_checks_the_single_input() {
        let t = tx();
        let outpoint = OutPoint {
            hash: Hash([0xaa; 32]),
            index: 1,
        };
        assert!(t.spends_only(&outpoint));
        assert!(!t.spends_only(&OutPoint { index: 0, ..outpoint }));

        let mut two = tx();
        two.inputs.push(TransactionInput::spending(&OutPoint {
            hash: Hash([0xbb; 32]),
            index: 0,
        }));
        assert!(!two.spends_only(&outpoint));
    }

    #[test]
    fn total_output() {
        assert_eq!(tx().total_output(), Some(1000));
    }
}
