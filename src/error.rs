use crate::{
    ledger::{ScriptError, ValidationError, WalletError},
    messages::ConversionError,
    wire::RemoteError,
};
use core::fmt::Display;

/// Which of the channel transactions failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Funding,
    Refund,
    Commitment,
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            TransactionKind::Funding => "funding",
            TransactionKind::Refund => "refund",
            TransactionKind::Commitment => "commitment",
        })
    }
}

/// Errors returned by the channel handshakes.
///
/// Local checks (unknown peer, duplicate channel, busy or not yet open
/// channel, invalid transactions, undetermined script types) are done before
/// anything is written to the channel record.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown peer {0}")]
    UnknownPeer(String),
    #[error("a channel with {0} already exists")]
    ChannelAlreadyExists(String),
    #[error("no channel with {0}")]
    NoChannel(String),
    #[error("channel with {0} is not open yet")]
    ChannelNotOpen(String),
    #[error("channel with {0} is in the middle of another handshake")]
    ChannelBusy(String),
    #[error("no interrupted handshake with {0}")]
    NothingToResume(String),
    #[error("{0} did not propose an update")]
    NoPendingUpdate(String),
    #[error("{kind} transaction failed validation: {source}")]
    TransactionValidationFailed {
        kind: TransactionKind,
        #[source]
        source: ValidationError,
    },
    #[error("could not determine script type: {0}")]
    ScriptTypeUndetermined(#[from] ScriptError),
    #[error("revocation key for state {state} does not match the key the commitment was bound to")]
    RevocationKeyMismatch { state: u64 },
    #[error("no revocation key stored for state {0}")]
    MissingRevocationKey(u64),
    #[error("balance {balance} exceeds the channel capacity {capacity}")]
    InvalidBalance { balance: u64, capacity: u64 },
    #[error("remote call failed: {0}")]
    RemoteCallFailed(#[from] RemoteError),
    #[error("malformed message: {0}")]
    Conversion(#[from] ConversionError),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("broadcast queue is closed")]
    Broadcast,
}

impl Error {
    pub(crate) fn invalid(kind: TransactionKind, source: ValidationError) -> Self {
        Self::TransactionValidationFailed { kind, source }
    }
}
