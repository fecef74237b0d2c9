//! The channel state machine.
//!
//! A channel goes through two handshakes, each a fixed sequence of remote
//! calls between an initiator and a responder:
//!
//! - *Open*: the funder sends funding and refund transactions, the fundee
//!   co-signs both. The refund is the first commitment of both parties.
//! - *Advance*: both parties co-sign each other's commitment for the next
//!   state, then trade the revocation keys of the state they replace.
//!
//! Local changes are staged while a handshake waits for the counterparty and
//! only applied once its answer checked out.

pub mod commitment;
mod open;
mod record;
mod revocation;
mod table;
mod update;


pub use record::{ChannelPhase, ChannelRecord};
pub use revocation::{generate_revocation_key_pair, RevocationInfo, RevocationLedger};
pub use table::{ChannelTable, SharedRecord};
