mod open;
mod update;

pub use open::{OpenChannelRequest, OpenChannelResponse};
pub use update::{RevocationKey, SignedTransactionWithKey, TransactionWithAddress, UpdatedTransactions};

use crate::types::ByteLengthMismatch;

/// Returned when a wire message cannot be turned into its typed form.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("field has the wrong length: {0}")]
    ByteLengthMismatch(#[from] ByteLengthMismatch),
    #[error("could not decode transaction: {0}")]
    Transaction(#[from] prost::DecodeError),
    #[error("envelope without a message")]
    ExpectedSome,
    #[error("message is not a request")]
    UnexpectedMessage,
}
