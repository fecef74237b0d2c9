use log::{debug, info, warn};

use super::{
    commitment::{check_funding, check_refund, refund_transaction},
    record::{ChannelRecord, PendingOpen},
    revocation::generate_revocation_key_pair,
    table::SharedRecord,
};
use crate::{
    error::{Error, TransactionKind},
    ledger::{ValidationError, Wallet, WalletRequest},
    messages::{OpenChannelRequest, OpenChannelResponse},
    node::LightningNode,
    peer::{Peer, PeerDirectory},
    sig::is_signed_by,
    types::PublicKey,
    wire::RemoteError,
};

fn funding_error(e: ValidationError) -> Error {
    Error::invalid(TransactionKind::Funding, e)
}

fn refund_error(e: ValidationError) -> Error {
    Error::invalid(TransactionKind::Refund, e)
}

impl<D: PeerDirectory, W: Wallet> LightningNode<D, W> {
    /// Open a channel with `address`, locking `amount` into it.
    ///
    /// The wallet is asked for twice `fee`: one half pays for the funding
    /// transaction, the other stays in the channel to pay for the refund.
    ///
    /// The channel is reserved in the table for the duration of the
    /// handshake. If the transport fails, the counterparty may or may not have
    /// accepted, so the reservation keeps the offer and calling this again
    /// with the same terms repeats the identical request. Any other failure
    /// before the counterparty signed drops the reservation. Once the signed
    /// funding transaction is installed the channel stays, even if handing it
    /// to the broadcast queue fails.
    pub fn create_channel(
        &self,
        address: &str,
        their_public_key: PublicKey,
        amount: u64,
        fee: u64,
    ) -> Result<(), Error> {
        let peer = self.lookup_peer(address)?;
        let reservation = ChannelRecord::reserve(address, their_public_key);
        let (record, offer) = match self.channels.insert_new(address, reservation) {
            Ok(record) => match self.offer_channel(their_public_key, amount, fee) {
                Ok(offer) => (record, offer),
                Err(e) => {
                    self.drop_reservation(address);
                    return Err(e);
                }
            },
            Err(Error::ChannelAlreadyExists(_)) => self
                .interrupted_open(address, &their_public_key, amount, fee)
                .ok_or_else(|| Error::ChannelAlreadyExists(address.to_owned()))?,
            Err(e) => return Err(e),
        };

        match self.fund_channel(&peer, &record, &offer) {
            Ok(()) => Ok(()),
            Err(e @ Error::RemoteCallFailed(RemoteError::Transport(_))) => {
                warn!("Open with {} interrupted: {}", address, e);
                record.lock().keep_pending_open(offer);
                Err(e)
            }
            Err(e) => {
                self.drop_reservation(address);
                Err(e)
            }
        }
    }

    /// Give up on an Open that was interrupted by the transport.
    ///
    /// If the request did arrive, the counterparty keeps its record and
    /// refuses every other Open from us.
    pub fn abandon_open(&self, address: &str) -> Result<(), Error> {
        if self
            .channels
            .remove_if(address, ChannelRecord::has_interrupted_open)
        {
            debug!("Abandoned open with {}", address);
            Ok(())
        } else {
            Err(Error::NothingToResume(address.to_owned()))
        }
    }

    fn drop_reservation(&self, address: &str) {
        if self.channels.remove_if_opening(address) {
            debug!("Dropped reservation for channel with {}", address);
        }
    }

    /// The reservation and offer of an earlier Open with the same terms, if
    /// the transport cut it short.
    fn interrupted_open(
        &self,
        address: &str,
        their_public_key: &PublicKey,
        amount: u64,
        fee: u64,
    ) -> Option<(SharedRecord, PendingOpen)> {
        let record = self.channels.get(address)?;
        let offer = record
            .lock()
            .take_pending_open(their_public_key, amount, fee)?;
        debug!("Repeating open with {}", address);
        Some((record, offer))
    }

    /// Funding and signed refund for a new channel.
    fn offer_channel(
        &self,
        their_public_key: PublicKey,
        amount: u64,
        fee: u64,
    ) -> Result<PendingOpen, Error> {
        let me = self.public_key();
        let funding = self.wallet.generate_funding_transaction(WalletRequest {
            amount,
            fee: fee.checked_mul(2).ok_or(Error::InvalidBalance {
                balance: fee,
                capacity: amount,
            })?,
            counterparty_public_key: their_public_key,
        })?;
        check_funding(&funding, &me, &their_public_key).map_err(funding_error)?;

        let revocation = generate_revocation_key_pair();
        let mut refund = refund_transaction(
            &self.config,
            &funding,
            &me,
            &their_public_key,
            &revocation.public_key,
            fee,
        )?;
        self.signer.sign_transaction(&mut refund);

        Ok(PendingOpen {
            request: OpenChannelRequest {
                address: self.config.address.clone(),
                public_key: me,
                funding_transaction: funding,
                refund_transaction: refund,
            },
            amount,
            fee,
            revocation_key: revocation.private_key,
        })
    }

    fn fund_channel(
        &self,
        peer: &Peer,
        record: &SharedRecord,
        offer: &PendingOpen,
    ) -> Result<(), Error> {
        let their_public_key = record.lock().counterparty_public_key();
        let funding = &offer.request.funding_transaction;
        let refund = &offer.request.refund_transaction;

        debug!(
            "Proposing channel to {}: funding {:?}, refund {:?}",
            peer.address,
            funding.hash(),
            refund.hash()
        );
        let res = peer.remote.open_channel(offer.request.clone())?;

        let mut signed_funding = res.signed_funding_transaction;
        if signed_funding.hash() != funding.hash() {
            return Err(funding_error(ValidationError::Altered));
        }
        if res.public_key != their_public_key || !is_signed_by(&signed_funding, &their_public_key)
        {
            return Err(funding_error(ValidationError::MissingSignature));
        }

        let mut signed_refund = res.signed_refund_transaction;
        if signed_refund.hash() != refund.hash() {
            return Err(refund_error(ValidationError::Altered));
        }
        if !is_signed_by(&signed_refund, &their_public_key) {
            return Err(refund_error(ValidationError::MissingSignature));
        }
        self.signer.sign_transaction(&mut signed_refund);
        let capacity = signed_refund
            .total_output()
            .ok_or_else(|| refund_error(ValidationError::AmountOverflow))?;

        self.signer.sign_transaction(&mut signed_funding);
        record.lock().complete_open(
            signed_funding.clone(),
            signed_refund,
            capacity,
            offer.revocation_key,
        );
        info!("Opened channel with {}, capacity {}", peer.address, capacity);

        self.broadcast(signed_funding)
    }

    /// Handle an Open request: co-sign the offered funding and refund
    /// transactions and create the fundee's record.
    ///
    /// The request the record was created from gets the same answer again
    /// for as long as funding is unconfirmed, in case the funder lost it.
    pub fn open_channel(&self, req: OpenChannelRequest) -> Result<OpenChannelResponse, Error> {
        self.lookup_peer(&req.address)?;
        if let Some(existing) = self.channels.get(&req.address) {
            let repeated = existing.lock().repeat_open(&req);
            return match repeated {
                Some((funding, refund)) => {
                    debug!("Repeating open answer for {}", req.address);
                    Ok(OpenChannelResponse {
                        public_key: self.public_key(),
                        signed_funding_transaction: funding,
                        signed_refund_transaction: refund,
                    })
                }
                None => Err(Error::ChannelAlreadyExists(req.address)),
            };
        }

        let me = self.public_key();
        let them = req.public_key;

        let mut funding = req.funding_transaction;
        check_funding(&funding, &them, &me).map_err(funding_error)?;
        self.signer
            .validate_and_sign(&mut funding)
            .map_err(funding_error)?;

        let mut refund = req.refund_transaction;
        let capacity = check_refund(&refund, &funding, &them, &me).map_err(refund_error)?;
        self.signer
            .validate_and_sign(&mut refund)
            .map_err(refund_error)?;
        debug!(
            "Signed funding {:?} and refund {:?} from {}",
            funding.hash(),
            refund.hash(),
            req.address
        );

        let revocation = generate_revocation_key_pair();
        let record = ChannelRecord::fundee(
            &req.address,
            them,
            funding.clone(),
            refund.clone(),
            capacity,
            revocation.private_key,
        );
        self.channels.insert_new(&req.address, record)?;
        info!("Accepted channel from {}, capacity {}", req.address, capacity);

        Ok(OpenChannelResponse {
            public_key: me,
            signed_funding_transaction: funding,
            signed_refund_transaction: refund,
        })
    }
}
