use super::ConversionError;
use crate::{
    ledger::{decode_transaction, encode_transaction, Transaction},
    lnwire,
    types::PublicKey,
};

/// Sent by the funder to open a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenChannelRequest {
    /// Address of the funder, looked up in the responder's peer directory.
    pub address: String,
    pub public_key: PublicKey,
    pub funding_transaction: Transaction,
    pub refund_transaction: Transaction,
}

impl TryFrom<lnwire::OpenChannelRequestMsg> for OpenChannelRequest {
    type Error = ConversionError;

    fn try_from(value: lnwire::OpenChannelRequestMsg) -> Result<Self, Self::Error> {
        Ok(Self {
            address: value.address,
            public_key: value.public_key.try_into()?,
            funding_transaction: decode_transaction(&value.funding_transaction)?,
            refund_transaction: decode_transaction(&value.refund_transaction)?,
        })
    }
}

impl From<OpenChannelRequest> for lnwire::OpenChannelRequestMsg {
    fn from(value: OpenChannelRequest) -> Self {
        Self {
            address: value.address,
            public_key: value.public_key.to_vec(),
            funding_transaction: encode_transaction(&value.funding_transaction),
            refund_transaction: encode_transaction(&value.refund_transaction),
        }
    }
}

/// Reply of the responder, carrying both transactions with its signature
/// added.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenChannelResponse {
    pub public_key: PublicKey,
    pub signed_funding_transaction: Transaction,
    pub signed_refund_transaction: Transaction,
}

impl TryFrom<lnwire::OpenChannelResponseMsg> for OpenChannelResponse {
    type Error = ConversionError;

    fn try_from(value: lnwire::OpenChannelResponseMsg) -> Result<Self, Self::Error> {
        Ok(Self {
            public_key: value.public_key.try_into()?,
            signed_funding_transaction: decode_transaction(&value.signed_funding_transaction)?,
            signed_refund_transaction: decode_transaction(&value.signed_refund_transaction)?,
        })
    }
}

impl From<OpenChannelResponse> for lnwire::OpenChannelResponseMsg {
    fn from(value: OpenChannelResponse) -> Self {
        Self {
            public_key: value.public_key.to_vec(),
            signed_funding_transaction: encode_transaction(&value.signed_funding_transaction),
            signed_refund_transaction: encode_transaction(&value.signed_refund_transaction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionOutput;

    #[test]
    fn short_public_key_is_rejected() {
        let msg = lnwire::OpenChannelRequestMsg {
            address: "alice".into(),
            public_key: vec![2; 32],
            funding_transaction: vec![],
            refund_transaction: vec![],
        };
        assert!(matches!(
            OpenChannelRequest::try_from(msg),
            Err(ConversionError::ByteLengthMismatch(_))
        ));
    }

    #[test]
    fn request_survives_the_wire() {
        let tx = Transaction {
            outputs: vec![TransactionOutput {
                locking_script: vec![1; 34],
                amount: 5,
            }],
            ..Default::default()
        };
        let req = OpenChannelRequest {
            address: "alice".into(),
            public_key: PublicKey([2; 33]),
            funding_transaction: tx.clone(),
            refund_transaction: tx,
        };
        let msg: lnwire::OpenChannelRequestMsg = req.clone().into();
        assert_eq!(OpenChannelRequest::try_from(msg).unwrap(), req);
    }
}
