//! Protobuf representation of the messages exchanged between two nodes.
//!
//! Transactions travel as their own protobuf encoding inside `bytes` fields,
//! keys as raw bytes. Use the types in [crate::messages] to work with them.

use prost::{Enumeration, Message};

#[derive(Clone, PartialEq, Message)]
pub struct OpenChannelRequestMsg {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(bytes = "vec", tag = "2")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub funding_transaction: Vec<u8>,
    #[prost(bytes = "vec", tag = "4")]
    pub refund_transaction: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct OpenChannelResponseMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub signed_funding_transaction: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub signed_refund_transaction: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TransactionWithAddressMsg {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(bytes = "vec", tag = "2")]
    pub transaction: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct UpdatedTransactionsMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub signed_transaction: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub unsigned_transaction: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignedTransactionWithKeyMsg {
    #[prost(string, tag = "1")]
    pub address: String,
    #[prost(bytes = "vec", tag = "2")]
    pub signed_transaction: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub revocation_key: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct RevocationKeyMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub key: Vec<u8>,
}

/// Why a request was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum RejectCode {
    Unspecified = 0,
    UnknownPeer = 1,
    ChannelAlreadyExists = 2,
    InvalidFunding = 3,
    InvalidRefund = 4,
    InvalidCommitment = 5,
    ScriptTypeUndetermined = 6,
    ChannelBusy = 7,
    ChannelNotOpen = 8,
    NoChannel = 9,
    RevocationKeyMismatch = 10,
    NoPendingUpdate = 11,
    Malformed = 12,
}

#[derive(Clone, PartialEq, Message)]
pub struct RejectMsg {
    #[prost(enumeration = "RejectCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub reason: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Envelope {
    #[prost(oneof = "envelope::Msg", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub msg: Option<envelope::Msg>,
}

pub mod envelope {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Msg {
        #[prost(message, tag = "1")]
        OpenChannelRequest(super::OpenChannelRequestMsg),
        #[prost(message, tag = "2")]
        OpenChannelResponse(super::OpenChannelResponseMsg),
        #[prost(message, tag = "3")]
        UpdateTransactions(super::TransactionWithAddressMsg),
        #[prost(message, tag = "4")]
        UpdatedTransactions(super::UpdatedTransactionsMsg),
        #[prost(message, tag = "5")]
        GetRevocationKey(super::SignedTransactionWithKeyMsg),
        #[prost(message, tag = "6")]
        RevocationKey(super::RevocationKeyMsg),
        #[prost(message, tag = "7")]
        Rejected(super::RejectMsg),
    }
}
