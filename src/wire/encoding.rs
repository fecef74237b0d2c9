use log::warn;
use prost::{bytes::BufMut, DecodeError, EncodeError, Message};

use super::{BytesBus, RemoteError, RemoteNode};
use crate::{
    error::{Error, TransactionKind},
    ledger::Wallet,
    lnwire::{envelope, Envelope, RejectCode, RejectMsg},
    messages::{
        ConversionError, OpenChannelRequest, OpenChannelResponse, RevocationKey,
        SignedTransactionWithKey, TransactionWithAddress, UpdatedTransactions,
    },
    node::LightningNode,
    peer::PeerDirectory,
};

const LENGTH_PREFIX: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("message of {0} bytes does not fit a frame")]
    TooLarge(usize),
    #[error("frame shorter than its length prefix")]
    Truncated,
    #[error("frame announces {declared} bytes but carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Prefix the protobuf encoding of `msg` with its length as a big-endian u16.
///
/// This is not `encode_length_delimited`, which writes a LEB128 varint.
pub fn encode_frame<T: Message>(msg: &T) -> Result<Vec<u8>, FrameError> {
    let len = msg.encoded_len();
    if len >= (1 << 16) {
        return Err(FrameError::TooLarge(len));
    }

    let mut buf = Vec::with_capacity(LENGTH_PREFIX + len);
    buf.put_slice(&(len as u16).to_be_bytes());
    msg.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_frame(frame: &[u8]) -> Result<Envelope, FrameError> {
    if frame.len() < LENGTH_PREFIX {
        return Err(FrameError::Truncated);
    }
    let (prefix, body) = frame.split_at(LENGTH_PREFIX);
    let declared = u16::from_be_bytes([prefix[0], prefix[1]]) as usize;
    if declared != body.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }
    Ok(Envelope::decode(body)?)
}

/// Implements [RemoteNode] on top of any [BytesBus] by sending every request
/// as one [Envelope] frame.
#[derive(Debug)]
pub struct ProtoBufEncodingLayer<B: BytesBus> {
    pub bus: B,
}

impl<B: BytesBus> ProtoBufEncodingLayer<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    fn call(&self, msg: envelope::Msg) -> Result<envelope::Msg, RemoteError> {
        let frame = encode_frame(&Envelope { msg: Some(msg) })
            .map_err(|e| RemoteError::Malformed(e.to_string()))?;
        let reply = self.bus.request(&frame)?;
        let envelope = decode_frame(&reply).map_err(|e| RemoteError::Malformed(e.to_string()))?;

        match envelope.msg {
            Some(envelope::Msg::Rejected(RejectMsg { code, reason })) => {
                Err(RemoteError::Rejected {
                    code: RejectCode::from_i32(code).unwrap_or(RejectCode::Unspecified),
                    reason,
                })
            }
            Some(msg) => Ok(msg),
            None => Err(RemoteError::Malformed("empty envelope".into())),
        }
    }
}

fn unexpected() -> RemoteError {
    RemoteError::Malformed("reply does not answer the request".into())
}

fn malformed(e: ConversionError) -> RemoteError {
    RemoteError::Malformed(e.to_string())
}

impl<B: BytesBus> RemoteNode for ProtoBufEncodingLayer<B> {
    fn open_channel(&self, req: OpenChannelRequest) -> Result<OpenChannelResponse, RemoteError> {
        match self.call(envelope::Msg::OpenChannelRequest(req.into()))? {
            envelope::Msg::OpenChannelResponse(msg) => msg.try_into().map_err(malformed),
            _ => Err(unexpected()),
        }
    }

    fn update_transactions(
        &self,
        req: TransactionWithAddress,
    ) -> Result<UpdatedTransactions, RemoteError> {
        match self.call(envelope::Msg::UpdateTransactions(req.into()))? {
            envelope::Msg::UpdatedTransactions(msg) => msg.try_into().map_err(malformed),
            _ => Err(unexpected()),
        }
    }

    fn get_revocation_key(
        &self,
        req: SignedTransactionWithKey,
    ) -> Result<RevocationKey, RemoteError> {
        match self.call(envelope::Msg::GetRevocationKey(req.into()))? {
            envelope::Msg::RevocationKey(msg) => msg.try_into().map_err(malformed),
            _ => Err(unexpected()),
        }
    }
}

impl From<&Error> for RejectCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::UnknownPeer(_) => RejectCode::UnknownPeer,
            Error::ChannelAlreadyExists(_) => RejectCode::ChannelAlreadyExists,
            Error::NoChannel(_) => RejectCode::NoChannel,
            Error::ChannelNotOpen(_) => RejectCode::ChannelNotOpen,
            Error::ChannelBusy(_) => RejectCode::ChannelBusy,
            Error::NoPendingUpdate(_) => RejectCode::NoPendingUpdate,
            Error::TransactionValidationFailed { kind, .. } => match kind {
                TransactionKind::Funding => RejectCode::InvalidFunding,
                TransactionKind::Refund => RejectCode::InvalidRefund,
                TransactionKind::Commitment => RejectCode::InvalidCommitment,
            },
            Error::ScriptTypeUndetermined(_) => RejectCode::ScriptTypeUndetermined,
            Error::RevocationKeyMismatch { .. } => RejectCode::RevocationKeyMismatch,
            Error::Conversion(_) => RejectCode::Malformed,
            _ => RejectCode::Unspecified,
        }
    }
}

fn reply<T, M>(result: Result<T, Error>, wrap: fn(M) -> envelope::Msg) -> envelope::Msg
where
    M: From<T>,
{
    match result {
        Ok(res) => wrap(res.into()),
        Err(e) => reject(&e),
    }
}

fn reject(e: &Error) -> envelope::Msg {
    warn!("Rejecting request: {}", e);
    envelope::Msg::Rejected(RejectMsg {
        code: RejectCode::from(e) as i32,
        reason: e.to_string(),
    })
}

/// Decode one inbound frame, run the matching handler of `node` and encode
/// its answer.
///
/// Handler errors are answered with a [RejectMsg]; only frames that cannot be
/// parsed at all make this function fail.
pub fn serve<D: PeerDirectory, W: Wallet>(
    node: &LightningNode<D, W>,
    frame: &[u8],
) -> Result<Vec<u8>, FrameError> {
    let envelope = decode_frame(frame)?;

    let msg = match envelope.msg {
        Some(envelope::Msg::OpenChannelRequest(msg)) => reply(
            OpenChannelRequest::try_from(msg)
                .map_err(Error::from)
                .and_then(|req| node.open_channel(req)),
            envelope::Msg::OpenChannelResponse,
        ),
        Some(envelope::Msg::UpdateTransactions(msg)) => reply(
            TransactionWithAddress::try_from(msg)
                .map_err(Error::from)
                .and_then(|req| node.update_transactions(req)),
            envelope::Msg::UpdatedTransactions,
        ),
        Some(envelope::Msg::GetRevocationKey(msg)) => reply(
            SignedTransactionWithKey::try_from(msg)
                .map_err(Error::from)
                .and_then(|req| node.get_revocation_key(req)),
            envelope::Msg::RevocationKey,
        ),
        Some(_) => reject(&Error::Conversion(ConversionError::UnexpectedMessage)),
        None => reject(&Error::Conversion(ConversionError::ExpectedSome)),
    };

    encode_frame(&Envelope { msg: Some(msg) })
}
