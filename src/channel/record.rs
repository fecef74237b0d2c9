use serde::Serialize;

use super::{
    commitment::output_index,
    revocation::{generate_revocation_key_pair, RevocationInfo, RevocationLedger},
};
use crate::{
    error::{Error, TransactionKind},
    ledger::{script, OutPoint, ScriptType, Transaction, ValidationError},
    messages::OpenChannelRequest,
    sig,
    types::{KeyPair, PrivateKey, PublicKey},
};

/// Where a channel is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelPhase {
    /// The funder reserved the channel and is waiting for the counterparty to
    /// sign the funding and refund transactions.
    Opening,
    /// Both parties hold the signed refund; the funding transaction is not
    /// confirmed on the ledger yet.
    AwaitingFunding,
    /// Funding is confirmed; the channel can advance.
    Open,
}

/// A new commitment pair that is negotiated but not yet part of the record.
#[derive(Debug, Clone)]
pub(crate) struct StagedAdvance {
    pub from_state: u64,
    pub my_commitment: Transaction,
    pub their_commitment: Transaction,
    /// Our revocation key for `from_state + 1`, embedded in `my_commitment`.
    pub next_revocation: KeyPair,
}

/// The handshake a record is currently part of. While one is in flight every
/// other handshake on the record is refused.
#[derive(Debug, Clone)]
pub(crate) enum Handshake {
    /// We sent UpdateTransactions and wait for the answer.
    Updating,
    /// We hold both co-signed commitments and disclosed (or are about to
    /// disclose) our key for the old state.
    AwaitingRevocation(StagedAdvance),
    /// We answered an UpdateTransactions request and wait for the
    /// counterparty's revocation key.
    Responding(StagedAdvance),
}

/// Open request the funder sent without learning whether it arrived.
///
/// Kept in the reservation so the identical request can be sent again.
#[derive(Debug, Clone)]
pub(crate) struct PendingOpen {
    pub request: OpenChannelRequest,
    pub amount: u64,
    pub fee: u64,
    /// Our state 0 revocation key, embedded in the offered refund.
    pub revocation_key: PrivateKey,
}

/// Everything a node knows about its channel with one counterparty.
#[derive(Debug, Clone)]
pub struct ChannelRecord {
    address: String,
    is_funder: bool,
    phase: ChannelPhase,
    funding_transaction: Option<Transaction>,
    capacity: u64,
    state: u64,
    counterparty_public_key: PublicKey,
    my_commitments: Vec<Transaction>,
    their_commitments: Vec<Transaction>,
    revocations: RevocationLedger,
    next_revocation: Option<(u64, KeyPair)>,
    pending_open: Option<PendingOpen>,
    in_flight: Option<Handshake>,
}

impl ChannelRecord {
    fn new(address: &str, is_funder: bool, counterparty_public_key: PublicKey) -> Self {
        Self {
            address: address.to_owned(),
            is_funder,
            phase: ChannelPhase::Opening,
            funding_transaction: None,
            capacity: 0,
            state: 0,
            counterparty_public_key,
            my_commitments: Vec::new(),
            their_commitments: Vec::new(),
            revocations: RevocationLedger::default(),
            next_revocation: None,
            pending_open: None,
            in_flight: None,
        }
    }

    /// Placeholder the funder puts into the table before talking to the
    /// counterparty.
    pub(crate) fn reserve(address: &str, counterparty_public_key: PublicKey) -> Self {
        Self::new(address, true, counterparty_public_key)
    }

    /// Record of the responder of a successful Open.
    pub(crate) fn fundee(
        address: &str,
        counterparty_public_key: PublicKey,
        funding: Transaction,
        refund: Transaction,
        capacity: u64,
        revocation_key: PrivateKey,
    ) -> Self {
        let mut record = Self::new(address, false, counterparty_public_key);
        record.complete_open(funding, refund, capacity, revocation_key);
        record
    }

    pub(crate) fn complete_open(
        &mut self,
        funding: Transaction,
        refund: Transaction,
        capacity: u64,
        revocation_key: PrivateKey,
    ) {
        debug_assert_eq!(self.phase, ChannelPhase::Opening);
        self.pending_open = None;
        self.funding_transaction = Some(funding);
        self.capacity = capacity;
        self.my_commitments.push(refund.clone());
        self.their_commitments.push(refund);
        self.revocations.insert_mine(0, revocation_key);
        self.phase = ChannelPhase::AwaitingFunding;
        self.debug_assert_consistent();
    }

    pub(crate) fn keep_pending_open(&mut self, offer: PendingOpen) {
        debug_assert_eq!(self.phase, ChannelPhase::Opening);
        self.pending_open = Some(offer);
    }

    /// Take the interrupted Open if it was made on the same terms.
    pub(crate) fn take_pending_open(
        &mut self,
        counterparty_public_key: &PublicKey,
        amount: u64,
        fee: u64,
    ) -> Option<PendingOpen> {
        let same_terms = self.pending_open.as_ref().map_or(false, |p| {
            self.counterparty_public_key == *counterparty_public_key
                && p.amount == amount
                && p.fee == fee
        });
        if same_terms {
            self.pending_open.take()
        } else {
            None
        }
    }

    /// The signed funding and refund transactions we answered `req` with, if
    /// it is the request this record was created from.
    pub(crate) fn repeat_open(&self, req: &OpenChannelRequest) -> Option<(Transaction, Transaction)> {
        if self.is_funder
            || self.phase != ChannelPhase::AwaitingFunding
            || self.counterparty_public_key != req.public_key
        {
            return None;
        }
        let funding = self.funding_transaction.as_ref()?;
        let refund = self.my_commitments.first()?;
        if funding.hash() != req.funding_transaction.hash()
            || refund.hash() != req.refund_transaction.hash()
        {
            return None;
        }
        Some((funding.clone(), refund.clone()))
    }

    pub(crate) fn confirm_funding(&mut self) -> Result<(), Error> {
        match self.phase {
            ChannelPhase::Opening => Err(Error::ChannelNotOpen(self.address.clone())),
            ChannelPhase::AwaitingFunding | ChannelPhase::Open => {
                self.phase = ChannelPhase::Open;
                Ok(())
            }
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_funder(&self) -> bool {
        self.is_funder
    }

    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    pub fn funding_transaction(&self) -> Option<&Transaction> {
        self.funding_transaction.as_ref()
    }

    /// Total of every commitment's outputs.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn counterparty_public_key(&self) -> PublicKey {
        self.counterparty_public_key
    }

    pub fn my_commitments(&self) -> &[Transaction] {
        &self.my_commitments
    }

    pub fn their_commitments(&self) -> &[Transaction] {
        &self.their_commitments
    }

    #[cfg(test)]
    pub(crate) fn their_commitments_mut(&mut self) -> &mut Vec<Transaction> {
        &mut self.their_commitments
    }

    #[cfg(test)]
    pub(crate) fn set_in_flight(&mut self, handshake: Option<Handshake>) {
        self.in_flight = handshake;
    }

    pub fn revocations(&self) -> &RevocationLedger {
        &self.revocations
    }

    /// Whether a handshake on this channel is in progress.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Whether this is a funder reservation whose Open request may not have
    /// arrived. Repeating [crate::LightningNode::create_channel] on the same
    /// terms sends it again.
    pub fn has_interrupted_open(&self) -> bool {
        self.phase == ChannelPhase::Opening && self.pending_open.is_some()
    }

    pub(crate) fn handshake(&self) -> Option<&Handshake> {
        self.in_flight.as_ref()
    }

    pub(crate) fn begin_handshake(&mut self, handshake: Handshake) {
        self.in_flight = Some(handshake);
    }

    pub(crate) fn end_handshake(&mut self) {
        self.in_flight = None;
    }

    pub(crate) fn funding_outpoint(&self) -> Result<OutPoint, Error> {
        self.funding_transaction
            .as_ref()
            .map(|tx| tx.outpoint(0))
            .ok_or_else(|| Error::ChannelNotOpen(self.address.clone()))
    }

    pub(crate) fn ensure_open(&self) -> Result<(), Error> {
        match self.phase {
            ChannelPhase::Open => Ok(()),
            _ => Err(Error::ChannelNotOpen(self.address.clone())),
        }
    }

    pub(crate) fn ensure_idle(&self) -> Result<(), Error> {
        match self.in_flight {
            None => Ok(()),
            Some(_) => Err(Error::ChannelBusy(self.address.clone())),
        }
    }

    /// Output of the counterparty's commitments we can punish: its own
    /// balance. Index 1 if we funded the channel, else 0.
    pub fn watched_output_index(&self) -> u32 {
        output_index(!self.is_funder)
    }

    /// Output of our own commitments holding our balance.
    pub fn own_output_index(&self) -> u32 {
        output_index(self.is_funder)
    }

    /// Our revocation key pair for the next state, created on first use.
    pub(crate) fn next_revocation_key(&mut self) -> KeyPair {
        let target = self.state + 1;
        match self.next_revocation {
            Some((state, pair)) if state == target => pair,
            _ => {
                let pair = generate_revocation_key_pair();
                self.next_revocation = Some((target, pair));
                pair
            }
        }
    }

    /// The staged key for the next state if `tx` commits to it.
    pub(crate) fn staged_revocation_for(&self, tx: &Transaction) -> Result<KeyPair, Error> {
        let index = self.own_output_index();
        let embedded = tx
            .outputs
            .get(index as usize)
            .and_then(|o| script::revocation_public_key(&o.locking_script));
        match self.next_revocation {
            Some((state, pair))
                if state == self.state + 1 && embedded == Some(pair.public_key) =>
            {
                Ok(pair)
            }
            _ => Err(Error::invalid(
                TransactionKind::Commitment,
                ValidationError::UnknownRevocationKey(index),
            )),
        }
    }

    /// Our revocation key for the current state, disclosed once the state is
    /// superseded.
    pub(crate) fn current_revocation_key(&self) -> Result<PrivateKey, Error> {
        self.revocations
            .mine(self.state)
            .copied()
            .ok_or(Error::MissingRevocationKey(self.state))
    }

    /// Script type of the output we watch on the counterparty's current
    /// commitment.
    pub(crate) fn watched_script_type(&self) -> Result<ScriptType, Error> {
        let (tx, index) = self.watched_output()?;
        Ok(script::determine_script_type(
            &tx.outputs[index as usize].locking_script,
        )?)
    }

    fn watched_output(&self) -> Result<(&Transaction, u32), Error> {
        let tx = self
            .their_commitments
            .last()
            .ok_or_else(|| Error::ChannelNotOpen(self.address.clone()))?;
        let index = self.watched_output_index();
        if tx.outputs.len() <= index as usize {
            return Err(Error::invalid(
                TransactionKind::Commitment,
                ValidationError::OutputCount {
                    expected: 2,
                    actual: tx.outputs.len(),
                },
            ));
        }
        Ok((tx, index))
    }

    /// Bind a disclosed revocation key to the counterparty commitment it
    /// punishes, which is the current one.
    ///
    /// Fails without touching the record if the script of the watched output
    /// is not recognized, or if the output is revocable and `key` is not the
    /// key it was bound to.
    pub(crate) fn revocation_info(&self, key: PrivateKey) -> Result<RevocationInfo, Error> {
        let (tx, output_index) = self.watched_output()?;
        let output = &tx.outputs[output_index as usize];
        let script_type = script::determine_script_type(&output.locking_script)?;

        if script_type == ScriptType::Revocable {
            let embedded = script::revocation_public_key(&output.locking_script);
            let disclosed = sig::public_key_of(&key).ok();
            if disclosed.is_none() || disclosed != embedded {
                return Err(Error::RevocationKeyMismatch { state: self.state });
            }
        }

        Ok(RevocationInfo {
            revocation_private_key: key,
            state: self.state,
            punished_output: output.clone(),
            output_index,
            transaction_hash: tx.hash(),
            script_type,
        })
    }

    /// Make a staged advance part of the record and end the handshake.
    pub(crate) fn apply_advance(&mut self, staged: StagedAdvance, revoked: RevocationInfo) {
        debug_assert_eq!(staged.from_state, self.state);
        debug_assert_eq!(revoked.state, self.state);

        self.my_commitments.push(staged.my_commitment);
        self.their_commitments.push(staged.their_commitment);
        self.revocations.insert_theirs(revoked);
        self.revocations
            .insert_mine(self.state + 1, staged.next_revocation.private_key);
        self.state += 1;
        self.in_flight = None;
        if matches!(self.next_revocation, Some((state, _)) if state <= self.state) {
            self.next_revocation = None;
        }
        self.debug_assert_consistent();
    }

    pub(crate) fn debug_assert_consistent(&self) {
        debug_assert_eq!(self.my_commitments.len() as u64, self.state + 1);
        debug_assert_eq!(self.their_commitments.len() as u64, self.state + 1);
        debug_assert!(self.revocations.mine(self.state).is_some());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel::commitment::{commitment_transaction, refund_transaction, Split},
        config::NodeConfig,
        ledger::{TransactionInput, TransactionOutput},
        types::Hash,
    };

    fn funding(a: &PublicKey, b: &PublicKey) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput::spending(&OutPoint {
                hash: Hash([4; 32]),
                index: 0,
            })],
            outputs: vec![TransactionOutput {
                locking_script: script::multisig(a, b),
                amount: 110,
            }],
            witnesses: vec![],
            lock_time: 0,
        }
    }

    /// Record of the fundee at state 0, together with the funder's state 0
    /// revocation key pair.
    fn fundee_record() -> (ChannelRecord, KeyPair) {
        let funder = generate_revocation_key_pair().public_key;
        let fundee = generate_revocation_key_pair().public_key;
        let funder_revocation = generate_revocation_key_pair();
        let funding = funding(&funder, &fundee);
        let refund = refund_transaction(
            &NodeConfig::default(),
            &funding,
            &funder,
            &fundee,
            &funder_revocation.public_key,
            10,
        )
        .unwrap();

        let own = generate_revocation_key_pair();
        let record = ChannelRecord::fundee("alice", funder, funding, refund, 100, own.private_key);
        (record, funder_revocation)
    }

    #[test]
    fn new_fundee_record_is_consistent() {
        let (record, _) = fundee_record();
        assert_eq!(record.state(), 0);
        assert_eq!(record.phase(), ChannelPhase::AwaitingFunding);
        assert_eq!(record.my_commitments(), record.their_commitments());
        assert_eq!(record.watched_output_index(), 0);
        assert_eq!(record.own_output_index(), 1);
        assert!(record.revocations().mine(0).is_some());
    }

    #[test]
    fn reserved_record_cannot_be_confirmed() {
        let mut record = ChannelRecord::reserve("bob", PublicKey([2; 33]));
        assert!(matches!(record.confirm_funding(), Err(Error::ChannelNotOpen(_))));
        assert!(matches!(record.ensure_open(), Err(Error::ChannelNotOpen(_))));
        assert!(record.funding_outpoint().is_err());
    }

    #[test]
    fn only_the_original_request_is_answered_again() {
        let (record, _) = fundee_record();
        let req = OpenChannelRequest {
            address: "alice".into(),
            public_key: record.counterparty_public_key(),
            funding_transaction: record.funding_transaction().unwrap().clone(),
            refund_transaction: record.my_commitments()[0].clone(),
        };
        let (funding, refund) = record.repeat_open(&req).unwrap();
        assert_eq!(Some(&funding), record.funding_transaction());
        assert_eq!(refund, record.my_commitments()[0]);

        let stranger = OpenChannelRequest {
            public_key: PublicKey([9; 33]),
            ..req.clone()
        };
        assert!(record.repeat_open(&stranger).is_none());

        let mut open = record.clone();
        open.confirm_funding().unwrap();
        assert!(open.repeat_open(&req).is_none());
    }

    #[test]
    fn interrupted_open_is_taken_on_same_terms_only() {
        let bob = PublicKey([2; 33]);
        let mut record = ChannelRecord::reserve("bob", bob);
        assert!(!record.has_interrupted_open());

        let (fundee, _) = fundee_record();
        record.keep_pending_open(PendingOpen {
            request: OpenChannelRequest {
                address: "alice".into(),
                public_key: PublicKey([1; 33]),
                funding_transaction: fundee.funding_transaction().unwrap().clone(),
                refund_transaction: fundee.my_commitments()[0].clone(),
            },
            amount: 100,
            fee: 10,
            revocation_key: PrivateKey([7; 32]),
        });
        assert!(record.has_interrupted_open());

        assert!(record.take_pending_open(&bob, 100, 20).is_none());
        assert!(record.take_pending_open(&PublicKey([3; 33]), 100, 10).is_none());
        let offer = record.take_pending_open(&bob, 100, 10).unwrap();
        assert_eq!(offer.revocation_key, PrivateKey([7; 32]));
        assert!(!record.has_interrupted_open());
        assert!(record.take_pending_open(&bob, 100, 10).is_none());
    }

    #[test]
    fn disclosed_key_has_to_match_the_script() {
        let (record, funder_revocation) = fundee_record();
        assert_eq!(record.watched_script_type().unwrap(), ScriptType::Revocable);

        let info = record.revocation_info(funder_revocation.private_key).unwrap();
        assert_eq!(info.output_index, 0);
        assert_eq!(info.state, 0);
        assert_eq!(info.transaction_hash, record.their_commitments()[0].hash());
        assert_eq!(info.punished_output.amount, 100);

        let other = generate_revocation_key_pair();
        assert!(matches!(
            record.revocation_info(other.private_key),
            Err(Error::RevocationKeyMismatch { state: 0 })
        ));
    }

    #[test]
    fn advance_appends_and_increments() {
        let (mut record, funder_revocation) = fundee_record();
        record.confirm_funding().unwrap();

        let next = record.next_revocation_key();
        assert_eq!(record.next_revocation_key(), next);

        let config = NodeConfig::default();
        let outpoint = record.funding_outpoint().unwrap();
        let me = PublicKey([3; 33]);
        let split = Split {
            funder: 60,
            fundee: 40,
        };
        let mine = commitment_transaction(
            &config,
            &outpoint,
            false,
            &me,
            &record.counterparty_public_key(),
            &next.public_key,
            split,
        );
        assert_eq!(record.staged_revocation_for(&mine).unwrap(), next);

        let theirs = commitment_transaction(
            &config,
            &outpoint,
            true,
            &record.counterparty_public_key(),
            &me,
            &PublicKey([5; 33]),
            split,
        );
        let info = record.revocation_info(funder_revocation.private_key).unwrap();
        record.begin_handshake(Handshake::Updating);
        record.apply_advance(
            StagedAdvance {
                from_state: 0,
                my_commitment: mine,
                their_commitment: theirs,
                next_revocation: next,
            },
            info,
        );

        assert_eq!(record.state(), 1);
        assert_eq!(record.my_commitments().len(), 2);
        assert_eq!(record.their_commitments().len(), 2);
        assert!(!record.is_busy());
        assert_eq!(record.revocations().mine(1), Some(&next.private_key));
        assert!(record
            .revocations()
            .punishment_for(&record.their_commitments()[0].hash())
            .is_some());

        // The staged key was used up.
        assert_ne!(record.next_revocation_key(), next);
    }
}
