//! Node identities, revocation keys and transaction signatures.
//!
//! Both backends produce compressed SEC1 public keys and compact (r, s) ECDSA
//! signatures over a 32-byte prehash, so keys and signatures created with one
//! backend can be checked with the other.

use crate::{
    ledger::{self, Transaction, ValidationError},
    types::{PublicKey, Signature},
};

#[cfg(feature = "secp256k1")]
mod secp256k1;
#[cfg(feature = "secp256k1")]
pub use self::secp256k1::{generate_key_pair, public_key_of, verify, Error, Signer};

#[cfg(feature = "k256")]
mod k256;
#[cfg(all(feature = "k256", not(feature = "secp256k1")))]
pub use self::k256::{generate_key_pair, public_key_of, verify, Error, Signer};

#[cfg(not(any(feature = "k256", feature = "secp256k1")))]
compile_error!("select a signature backend: enable either the 'k256' or the 'secp256k1' feature");

#[cfg(test)]
mod tests;

impl Signer {
    /// Add our signature over the content hash of `tx`.
    ///
    /// Signing a transaction we already signed is a no-op.
    pub fn sign_transaction(&self, tx: &mut Transaction) {
        if is_signed_by(tx, &self.public_key()) {
            return;
        }
        let sig = self.sign(tx.hash());
        tx.witnesses.push(sig.to_vec());
    }

    /// Check `tx` against the structural ledger rules, then sign it.
    pub fn validate_and_sign(&self, tx: &mut Transaction) -> Result<(), ValidationError> {
        ledger::validate(tx)?;
        self.sign_transaction(tx);
        Ok(())
    }
}

/// Whether one of the witnesses of `tx` is a valid signature by `public_key`.
pub fn is_signed_by(tx: &Transaction, public_key: &PublicKey) -> bool {
    let hash = tx.hash();
    tx.witnesses
        .iter()
        .filter_map(|w| Signature::try_from(w.as_slice()).ok())
        .any(|sig| verify(public_key, hash, &sig).is_ok())
}
