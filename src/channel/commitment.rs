//! Building and checking the transactions that spend the funding output.
//!
//! Every commitment has exactly two outputs: output 0 holds the funder's
//! balance, output 1 the fundee's. In each party's own version its balance is
//! locked by a revocable script, the other balance pays straight to the
//! counterparty key.

use crate::{
    config::NodeConfig,
    error::{Error, TransactionKind},
    ledger::{
        script, validate, OutPoint, Transaction, TransactionInput, TransactionOutput,
        ValidationError,
    },
    types::PublicKey,
};

const OUTPUTS: usize = 2;

/// Balances of a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub funder: u64,
    pub fundee: u64,
}

impl Split {
    /// Split in which `mine` belongs to us and the rest of `capacity` to the
    /// counterparty.
    pub fn from_balance(is_funder: bool, mine: u64, capacity: u64) -> Result<Self, Error> {
        let theirs = capacity.checked_sub(mine).ok_or(Error::InvalidBalance {
            balance: mine,
            capacity,
        })?;
        Ok(if is_funder {
            Split {
                funder: mine,
                fundee: theirs,
            }
        } else {
            Split {
                funder: theirs,
                fundee: mine,
            }
        })
    }

    pub fn balance(&self, is_funder: bool) -> u64 {
        if is_funder {
            self.funder
        } else {
            self.fundee
        }
    }
}

/// Index of the output holding the balance of the funder (`true`) or the
/// fundee (`false`).
pub fn output_index(is_funder: bool) -> u32 {
    if is_funder {
        0
    } else {
        1
    }
}

/// The commitment `owner` can publish, with its own balance revocable through
/// `revocation`.
pub fn commitment_transaction(
    config: &NodeConfig,
    funding: &OutPoint,
    owner_is_funder: bool,
    owner: &PublicKey,
    other: &PublicKey,
    revocation: &PublicKey,
    split: Split,
) -> Transaction {
    let own = TransactionOutput {
        locking_script: script::revocable(owner, revocation, config.revocation_delay),
        amount: split.balance(owner_is_funder),
    };
    let others = TransactionOutput {
        locking_script: script::pay_to_public_key(other),
        amount: split.balance(!owner_is_funder),
    };

    Transaction {
        version: config.version,
        inputs: vec![TransactionInput::spending(funding)],
        outputs: if owner_is_funder {
            vec![own, others]
        } else {
            vec![others, own]
        },
        witnesses: vec![],
        lock_time: config.lock_time,
    }
}

/// The state 0 commitment of the funder: everything but `fee` goes back to
/// the funder.
pub fn refund_transaction(
    config: &NodeConfig,
    funding: &Transaction,
    funder: &PublicKey,
    fundee: &PublicKey,
    revocation: &PublicKey,
    fee: u64,
) -> Result<Transaction, Error> {
    let locked = funding
        .outputs
        .first()
        .ok_or_else(|| Error::invalid(TransactionKind::Funding, ValidationError::NoOutputs))?
        .amount;
    let split = Split {
        funder: locked.checked_sub(fee).ok_or(Error::InvalidBalance {
            balance: fee,
            capacity: locked,
        })?,
        fundee: 0,
    };

    Ok(commitment_transaction(
        config,
        &funding.outpoint(0),
        true,
        funder,
        fundee,
        revocation,
        split,
    ))
}

/// Output 0 of the funding transaction has to lock the channel funds to both
/// parties.
pub fn check_funding(
    funding: &Transaction,
    funder: &PublicKey,
    fundee: &PublicKey,
) -> Result<(), ValidationError> {
    validate(funding)?;
    let output = &funding.outputs[0];
    match script::multisig_keys(&output.locking_script) {
        Some((a, b)) if (a == *funder && b == *fundee) || (a == *fundee && b == *funder) => Ok(()),
        _ => Err(ValidationError::NotChannelFunding),
    }
}

/// Check a refund offered by the funder and return the channel capacity it
/// establishes.
pub fn check_refund(
    refund: &Transaction,
    funding: &Transaction,
    funder: &PublicKey,
    fundee: &PublicKey,
) -> Result<u64, ValidationError> {
    let capacity = refund
        .total_output()
        .ok_or(ValidationError::AmountOverflow)?;
    let locked = funding.outputs.first().map_or(0, |o| o.amount);
    if capacity > locked {
        return Err(ValidationError::CapacityMismatch {
            expected: locked,
            actual: capacity,
        });
    }

    check_commitment(refund, &funding.outpoint(0), capacity, true, funder, fundee)?;
    Ok(capacity)
}

/// Check that `tx` is a well formed commitment `owner` can publish and return
/// its split.
pub fn check_commitment(
    tx: &Transaction,
    funding: &OutPoint,
    capacity: u64,
    owner_is_funder: bool,
    owner: &PublicKey,
    other: &PublicKey,
) -> Result<Split, ValidationError> {
    validate(tx)?;
    if !tx.spends_only(funding) {
        return Err(ValidationError::WrongFundingOutpoint);
    }
    if tx.outputs.len() != OUTPUTS {
        return Err(ValidationError::OutputCount {
            expected: OUTPUTS,
            actual: tx.outputs.len(),
        });
    }
    let total = tx.total_output().ok_or(ValidationError::AmountOverflow)?;
    if total != capacity {
        return Err(ValidationError::CapacityMismatch {
            expected: capacity,
            actual: total,
        });
    }

    let own_index = output_index(owner_is_funder);
    match script::revocable_owner(&tx.outputs[own_index as usize].locking_script) {
        None => return Err(ValidationError::NotRevocable(own_index)),
        Some(key) if key != *owner => return Err(ValidationError::WrongRecipient(own_index)),
        Some(_) => {}
    }

    let other_index = output_index(!owner_is_funder);
    if tx.outputs[other_index as usize].locking_script != script::pay_to_public_key(other) {
        return Err(ValidationError::WrongRecipient(other_index));
    }

    Ok(Split {
        funder: tx.outputs[0].amount,
        fundee: tx.outputs[1].amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash;

    fn key(b: u8) -> PublicKey {
        PublicKey([b; 33])
    }

    fn funding() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput::spending(&OutPoint {
                hash: Hash([9; 32]),
                index: 3,
            })],
            outputs: vec![TransactionOutput {
                locking_script: script::multisig(&key(1), &key(2)),
                amount: 1010,
            }],
            witnesses: vec![],
            lock_time: 0,
        }
    }

    #[test]
    fn refund_returns_funds_minus_fee() {
        let config = NodeConfig::default();
        let refund =
            refund_transaction(&config, &funding(), &key(1), &key(2), &key(7), 10).unwrap();

        assert!(refund.spends_only(&funding().outpoint(0)));
        assert_eq!(refund.outputs[0].amount, 1000);
        assert_eq!(refund.outputs[1].amount, 0);
        assert_eq!(
            script::revocation_public_key(&refund.outputs[0].locking_script),
            Some(key(7))
        );
        assert_eq!(check_refund(&refund, &funding(), &key(1), &key(2)), Ok(1000));
    }

    #[test]
    fn refund_larger_than_funding_is_rejected() {
        let config = NodeConfig::default();
        let mut refund =
            refund_transaction(&config, &funding(), &key(1), &key(2), &key(7), 10).unwrap();
        refund.outputs[1].amount = 11;
        assert_eq!(
            check_refund(&refund, &funding(), &key(1), &key(2)),
            Err(ValidationError::CapacityMismatch {
                expected: 1010,
                actual: 1011
            })
        );
    }

    #[test]
    fn funding_must_lock_to_both_parties() {
        assert_eq!(check_funding(&funding(), &key(2), &key(1)), Ok(()));
        assert_eq!(
            check_funding(&funding(), &key(1), &key(3)),
            Err(ValidationError::NotChannelFunding)
        );
    }

    #[test]
    fn fundee_commitment_layout() {
        let config = NodeConfig::default();
        let outpoint = funding().outpoint(0);
        let split = Split::from_balance(false, 300, 1000).unwrap();
        let tx = commitment_transaction(&config, &outpoint, false, &key(2), &key(1), &key(8), split);

        assert_eq!(tx.outputs[0].amount, 700);
        assert_eq!(tx.outputs[0].locking_script, script::pay_to_public_key(&key(1)));
        assert_eq!(tx.outputs[1].amount, 300);
        assert_eq!(
            check_commitment(&tx, &outpoint, 1000, false, &key(2), &key(1)),
            Ok(split)
        );

        // Checked as if it was the funder's commitment, the owner output is
        // a plain payment.
        assert_eq!(
            check_commitment(&tx, &outpoint, 1000, true, &key(1), &key(2)),
            Err(ValidationError::NotRevocable(0))
        );
    }

    #[test]
    fn commitment_checks() {
        let config = NodeConfig::default();
        let outpoint = funding().outpoint(0);
        let split = Split::from_balance(true, 600, 1000).unwrap();
        let tx = commitment_transaction(&config, &outpoint, true, &key(1), &key(2), &key(8), split);

        assert_eq!(
            check_commitment(&tx, &outpoint, 999, true, &key(1), &key(2)),
            Err(ValidationError::CapacityMismatch {
                expected: 999,
                actual: 1000
            })
        );
        assert_eq!(
            check_commitment(&tx, &OutPoint { index: 1, ..outpoint }, 1000, true, &key(1), &key(2)),
            Err(ValidationError::WrongFundingOutpoint)
        );
        assert_eq!(
            check_commitment(&tx, &outpoint, 1000, true, &key(3), &key(2)),
            Err(ValidationError::WrongRecipient(0))
        );
        assert_eq!(
            check_commitment(&tx, &outpoint, 1000, true, &key(1), &key(3)),
            Err(ValidationError::WrongRecipient(1))
        );
    }

    #[test]
    fn balance_above_capacity() {
        assert!(matches!(
            Split::from_balance(true, 1001, 1000),
            Err(Error::InvalidBalance {
                balance: 1001,
                capacity: 1000
            })
        ));
    }
}
