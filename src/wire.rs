mod encoding;

use core::fmt::Debug;

pub use encoding::{decode_frame, encode_frame, serve, FrameError, ProtoBufEncodingLayer};

use crate::{
    lnwire::RejectCode,
    messages::{
        OpenChannelRequest, OpenChannelResponse, RevocationKey, SignedTransactionWithKey,
        TransactionWithAddress, UpdatedTransactions,
    },
};

/// Error of the byte transport below [ProtoBufEncodingLayer].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Low-level abstraction over the network: send one frame, get one frame
/// back.
pub trait BytesBus: Debug + Send + Sync {
    fn request(&self, frame: &[u8]) -> Result<Vec<u8>, TransportError>;
}

/// The remote procedures a node offers to its peers.
///
/// Every call blocks until the peer answered or the transport gave up.
pub trait RemoteNode: Debug + Send + Sync {
    fn open_channel(&self, req: OpenChannelRequest) -> Result<OpenChannelResponse, RemoteError>;
    fn update_transactions(
        &self,
        req: TransactionWithAddress,
    ) -> Result<UpdatedTransactions, RemoteError>;
    fn get_revocation_key(&self, req: SignedTransactionWithKey)
        -> Result<RevocationKey, RemoteError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),
    #[error("peer rejected the request ({code:?}): {reason}")]
    Rejected { code: RejectCode, reason: String },
    #[error("malformed reply: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// The code the peer rejected the request with, if it did.
    pub fn reject_code(&self) -> Option<RejectCode> {
        match self {
            RemoteError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}
