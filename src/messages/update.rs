use super::ConversionError;
use crate::{
    ledger::{decode_transaction, encode_transaction, Transaction},
    lnwire,
    types::PrivateKey,
};

/// A new commitment proposed by the updater, which is the updater's own
/// version for the next state.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionWithAddress {
    pub address: String,
    pub transaction: Transaction,
}

impl TryFrom<lnwire::TransactionWithAddressMsg> for TransactionWithAddress {
    type Error = ConversionError;

    fn try_from(value: lnwire::TransactionWithAddressMsg) -> Result<Self, Self::Error> {
        Ok(Self {
            address: value.address,
            transaction: decode_transaction(&value.transaction)?,
        })
    }
}

impl From<TransactionWithAddress> for lnwire::TransactionWithAddressMsg {
    fn from(value: TransactionWithAddress) -> Self {
        Self {
            address: value.address,
            transaction: encode_transaction(&value.transaction),
        }
    }
}

/// Answer to [TransactionWithAddress].
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedTransactions {
    /// The proposed commitment, co-signed by the responder.
    pub signed_transaction: Transaction,
    /// The responder's own commitment for the same state, waiting for the
    /// updater's signature.
    pub unsigned_transaction: Transaction,
}

impl TryFrom<lnwire::UpdatedTransactionsMsg> for UpdatedTransactions {
    type Error = ConversionError;

    fn try_from(value: lnwire::UpdatedTransactionsMsg) -> Result<Self, Self::Error> {
        Ok(Self {
            signed_transaction: decode_transaction(&value.signed_transaction)?,
            unsigned_transaction: decode_transaction(&value.unsigned_transaction)?,
        })
    }
}

impl From<UpdatedTransactions> for lnwire::UpdatedTransactionsMsg {
    fn from(value: UpdatedTransactions) -> Self {
        Self {
            signed_transaction: encode_transaction(&value.signed_transaction),
            unsigned_transaction: encode_transaction(&value.unsigned_transaction),
        }
    }
}

/// Returns the responder's commitment with both signatures together with the
/// updater's revocation key for the state being replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransactionWithKey {
    pub address: String,
    pub signed_transaction: Transaction,
    pub revocation_key: PrivateKey,
}

impl TryFrom<lnwire::SignedTransactionWithKeyMsg> for SignedTransactionWithKey {
    type Error = ConversionError;

    fn try_from(value: lnwire::SignedTransactionWithKeyMsg) -> Result<Self, Self::Error> {
        Ok(Self {
            address: value.address,
            signed_transaction: decode_transaction(&value.signed_transaction)?,
            revocation_key: value.revocation_key.try_into()?,
        })
    }
}

impl From<SignedTransactionWithKey> for lnwire::SignedTransactionWithKeyMsg {
    fn from(value: SignedTransactionWithKey) -> Self {
        Self {
            address: value.address,
            signed_transaction: encode_transaction(&value.signed_transaction),
            revocation_key: value.revocation_key.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RevocationKey {
    pub key: PrivateKey,
}

impl TryFrom<lnwire::RevocationKeyMsg> for RevocationKey {
    type Error = ConversionError;

    fn try_from(value: lnwire::RevocationKeyMsg) -> Result<Self, Self::Error> {
        Ok(Self {
            key: value.key.try_into()?,
        })
    }
}

impl From<RevocationKey> for lnwire::RevocationKeyMsg {
    fn from(value: RevocationKey) -> Self {
        Self {
            key: value.key.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revocation_key_length_is_checked() {
        let msg = lnwire::RevocationKeyMsg { key: vec![1; 31] };
        assert!(matches!(
            RevocationKey::try_from(msg),
            Err(ConversionError::ByteLengthMismatch(_))
        ));
    }

    #[test]
    fn undecodable_transaction_is_reported() {
        let msg = lnwire::TransactionWithAddressMsg {
            address: "bob".into(),
            transaction: vec![0xff, 0xff, 0xff],
        };
        assert!(matches!(
            TransactionWithAddress::try_from(msg),
            Err(ConversionError::Transaction(_))
        ));
    }
}
