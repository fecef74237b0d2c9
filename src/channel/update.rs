use log::{debug, info, warn};

use super::{
    commitment::{check_commitment, commitment_transaction, Split},
    record::{Handshake, StagedAdvance},
    revocation::generate_revocation_key_pair,
    table::SharedRecord,
};
use crate::{
    error::{Error, TransactionKind},
    ledger::{OutPoint, Transaction, ValidationError, Wallet},
    lnwire::RejectCode,
    messages::{
        RevocationKey, SignedTransactionWithKey, TransactionWithAddress, UpdatedTransactions,
    },
    node::LightningNode,
    peer::{Peer, PeerDirectory},
    sig::is_signed_by,
    types::KeyPair,
};

fn commitment_error(e: ValidationError) -> Error {
    Error::invalid(TransactionKind::Commitment, e)
}

/// What the updater checked before the first remote call.
struct Proposal {
    from_state: u64,
    funding: OutPoint,
    capacity: u64,
    is_funder: bool,
    split: Split,
    next_revocation: KeyPair,
}

impl<D: PeerDirectory, W: Wallet> LightningNode<D, W> {
    /// Our commitment for the next state of the channel with `address`, in
    /// which we hold `balance` and the counterparty the rest of the capacity.
    ///
    /// The commitment embeds the revocation key for the next state, so it is
    /// the transaction to pass to [LightningNode::update_state].
    pub fn build_commitment(&self, address: &str, balance: u64) -> Result<Transaction, Error> {
        let shared = self.record(address)?;
        let mut record = shared.lock();
        record.ensure_open()?;
        record.ensure_idle()?;

        let is_funder = record.is_funder();
        let split = Split::from_balance(is_funder, balance, record.capacity())?;
        let funding = record.funding_outpoint()?;
        let next = record.next_revocation_key();

        Ok(commitment_transaction(
            &self.config,
            &funding,
            is_funder,
            &self.public_key(),
            &record.counterparty_public_key(),
            &next.public_key,
            split,
        ))
    }

    /// Advance the channel with `address` to the next state, with `tx` as our
    /// new commitment.
    ///
    /// Our revocation key for the current state is only sent once both new
    /// commitments are co-signed. If that last exchange fails the channel
    /// stays busy until [LightningNode::resume_update] completes it.
    pub fn update_state(&self, address: &str, tx: Transaction) -> Result<(), Error> {
        let peer = self.lookup_peer(address)?;
        let shared = self.record(address)?;

        let proposal = {
            let mut record = shared.lock();
            record.ensure_open()?;
            record.ensure_idle()?;

            let is_funder = record.is_funder();
            let funding = record.funding_outpoint()?;
            let split = check_commitment(
                &tx,
                &funding,
                record.capacity(),
                is_funder,
                &self.public_key(),
                &record.counterparty_public_key(),
            )
            .map_err(commitment_error)?;
            let next_revocation = record.staged_revocation_for(&tx)?;
            // Refuse before anything is disclosed if we could not punish the
            // commitment we are about to revoke.
            record.watched_script_type()?;
            record.current_revocation_key()?;

            record.begin_handshake(Handshake::Updating);
            Proposal {
                from_state: record.state(),
                funding,
                capacity: record.capacity(),
                is_funder,
                split,
                next_revocation,
            }
        };

        let staged = match self.propose(&peer, &shared, tx, proposal) {
            Ok(staged) => staged,
            Err(e) => {
                shared.lock().end_handshake();
                return Err(e);
            }
        };
        shared
            .lock()
            .begin_handshake(Handshake::AwaitingRevocation(staged.clone()));

        self.disclose(&peer, &shared, staged)
    }

    /// Send UpdateTransactions and check the answer.
    fn propose(
        &self,
        peer: &Peer,
        shared: &SharedRecord,
        tx: Transaction,
        proposal: Proposal,
    ) -> Result<StagedAdvance, Error> {
        let me = self.public_key();
        let them = shared.lock().counterparty_public_key();

        debug!(
            "Proposing state {} to {}: {:?}",
            proposal.from_state + 1,
            peer.address,
            proposal.split
        );
        let res = peer.remote.update_transactions(TransactionWithAddress {
            address: self.config.address.clone(),
            transaction: tx.clone(),
        })?;

        let mut mine = res.signed_transaction;
        if mine.hash() != tx.hash() {
            return Err(commitment_error(ValidationError::Altered));
        }
        if !is_signed_by(&mine, &them) {
            return Err(commitment_error(ValidationError::MissingSignature));
        }
        self.signer.sign_transaction(&mut mine);

        let mut theirs = res.unsigned_transaction;
        let their_split = check_commitment(
            &theirs,
            &proposal.funding,
            proposal.capacity,
            !proposal.is_funder,
            &them,
            &me,
        )
        .map_err(commitment_error)?;
        if their_split != proposal.split {
            return Err(commitment_error(ValidationError::SplitMismatch));
        }
        self.signer
            .validate_and_sign(&mut theirs)
            .map_err(commitment_error)?;

        Ok(StagedAdvance {
            from_state: proposal.from_state,
            my_commitment: mine,
            their_commitment: theirs,
            next_revocation: proposal.next_revocation,
        })
    }

    /// Trade our revocation key for the staged state against the
    /// counterparty's and apply the advance.
    ///
    /// If the counterparty no longer holds the proposal and never applied it,
    /// the update is dropped and the channel stays at the old state.
    fn disclose(&self, peer: &Peer, shared: &SharedRecord, staged: StagedAdvance) -> Result<(), Error> {
        let key = shared.lock().current_revocation_key()?;

        debug!(
            "Revoking state {} with {}",
            staged.from_state, peer.address
        );
        let res = match peer.remote.get_revocation_key(SignedTransactionWithKey {
            address: self.config.address.clone(),
            signed_transaction: staged.their_commitment.clone(),
            revocation_key: key,
        }) {
            Ok(res) => res,
            Err(e) => {
                if e.reject_code() == Some(RejectCode::NoPendingUpdate) {
                    let mut record = shared.lock();
                    if matches!(
                        record.handshake(),
                        Some(Handshake::AwaitingRevocation(s)) if s.from_state == staged.from_state
                    ) {
                        record.end_handshake();
                        warn!(
                            "{} dropped the update to state {}, staying at state {}",
                            peer.address,
                            staged.from_state + 1,
                            record.state()
                        );
                    }
                }
                return Err(e.into());
            }
        };

        let mut record = shared.lock();
        match record.handshake() {
            Some(Handshake::AwaitingRevocation(s)) if s.from_state == staged.from_state => {}
            // A concurrent resume got there first.
            _ => return Ok(()),
        }
        let revoked = record.revocation_info(res.key)?;
        record.apply_advance(staged, revoked);
        info!(
            "Channel with {} advanced to state {}",
            peer.address,
            record.state()
        );
        Ok(())
    }

    /// Repeat the revocation exchange of an update whose last step failed.
    pub fn resume_update(&self, address: &str) -> Result<(), Error> {
        let peer = self.lookup_peer(address)?;
        let shared = self.record(address)?;
        let staged = match shared.lock().handshake() {
            Some(Handshake::AwaitingRevocation(staged)) => staged.clone(),
            _ => return Err(Error::NothingToResume(address.to_owned())),
        };
        self.disclose(&peer, &shared, staged)
    }

    /// Handle UpdateTransactions: co-sign the updater's new commitment and
    /// answer with our own version for the same split.
    ///
    /// Nothing is added to the record until the revocation keys are traded.
    /// A repeated request replaces the previous answer.
    pub fn update_transactions(
        &self,
        req: TransactionWithAddress,
    ) -> Result<UpdatedTransactions, Error> {
        self.lookup_peer(&req.address)?;
        let shared = self.record(&req.address)?;
        let mut record = shared.lock();
        record.ensure_open()?;
        if let Some(Handshake::Updating | Handshake::AwaitingRevocation(_)) = record.handshake() {
            return Err(Error::ChannelBusy(req.address));
        }

        let me = self.public_key();
        let them = record.counterparty_public_key();
        let is_funder = record.is_funder();
        let funding = record.funding_outpoint()?;

        let mut theirs = req.transaction;
        let split = check_commitment(&theirs, &funding, record.capacity(), !is_funder, &them, &me)
            .map_err(commitment_error)?;
        self.signer
            .validate_and_sign(&mut theirs)
            .map_err(commitment_error)?;

        let next_revocation = generate_revocation_key_pair();
        let mine = commitment_transaction(
            &self.config,
            &funding,
            is_funder,
            &me,
            &them,
            &next_revocation.public_key,
            split,
        );

        debug!(
            "Co-signed state {} from {}: {:?}",
            record.state() + 1,
            req.address,
            split
        );
        let from_state = record.state();
        record.begin_handshake(Handshake::Responding(StagedAdvance {
            from_state,
            my_commitment: mine.clone(),
            their_commitment: theirs.clone(),
            next_revocation,
        }));

        Ok(UpdatedTransactions {
            signed_transaction: theirs,
            unsigned_transaction: mine,
        })
    }

    /// Handle GetRevocationKey: take the updater's key for the old state,
    /// apply the staged advance and disclose our own key for the old state.
    ///
    /// A request for the commitment we already applied gets the same key
    /// again, so the updater can repeat it after losing our answer.
    pub fn get_revocation_key(&self, req: SignedTransactionWithKey) -> Result<RevocationKey, Error> {
        self.lookup_peer(&req.address)?;
        let shared = self.record(&req.address)?;
        let mut record = shared.lock();

        let hash = req.signed_transaction.hash();
        let staged = match record.handshake() {
            Some(Handshake::Responding(staged)) if staged.my_commitment.hash() == hash => {
                staged.clone()
            }
            _ => {
                let applied = record.my_commitments().last().map(|tx| tx.hash());
                if record.state() > 0 && applied == Some(hash) {
                    let key = record
                        .revocations()
                        .mine(record.state() - 1)
                        .copied()
                        .ok_or(Error::MissingRevocationKey(record.state() - 1))?;
                    debug!("Repeating revocation key for {}", req.address);
                    return Ok(RevocationKey { key });
                }
                return Err(Error::NoPendingUpdate(req.address));
            }
        };

        let them = record.counterparty_public_key();
        if !is_signed_by(&req.signed_transaction, &them) {
            return Err(commitment_error(ValidationError::MissingSignature));
        }
        let revoked = record.revocation_info(req.revocation_key)?;
        let key = record.current_revocation_key()?;

        let mut my_commitment = req.signed_transaction;
        self.signer.sign_transaction(&mut my_commitment);
        record.apply_advance(
            StagedAdvance {
                my_commitment,
                ..staged
            },
            revoked,
        );
        info!(
            "Channel with {} advanced to state {}",
            req.address,
            record.state()
        );

        Ok(RevocationKey { key })
    }

    /// Forget an UpdateTransactions we answered but whose revocation exchange
    /// never came, so the channel can be used again.
    ///
    /// An updater still waiting to disclose its key gets
    /// [RejectCode::NoPendingUpdate] on its next attempt and drops the update
    /// as well.
    pub fn abandon_pending(&self, address: &str) -> Result<(), Error> {
        let shared = self.record(address)?;
        let mut record = shared.lock();
        match record.handshake() {
            Some(Handshake::Responding(_)) => {
                record.end_handshake();
                debug!("Abandoned pending update from {}", address);
                Ok(())
            }
            None => Err(Error::NoPendingUpdate(address.to_owned())),
            Some(_) => Err(Error::ChannelBusy(address.to_owned())),
        }
    }
}
