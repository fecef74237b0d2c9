//! Signer using the k256 Rust crate (implementation of ecdsa in Rust).

use crate::types::{Hash, KeyPair, PrivateKey, PublicKey, Signature};
use k256::{
    ecdsa::{
        signature::{
            hazmat::{PrehashSigner, PrehashVerifier},
            Signature as k256Signature,
        },
        Signature as EcdsaSignature, SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
};

pub use k256::ecdsa::Error;

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        // The compressed encoding is always 33 bytes: a parity byte followed
        // by the x coordinate.
        let mut pk = PublicKey::default();
        pk.0.copy_from_slice(key.to_encoded_point(true).as_bytes());
        pk
    }
}

fn private_key_bytes(key: &SigningKey) -> PrivateKey {
    let mut sk = PrivateKey::default();
    sk.0.copy_from_slice(&key.to_bytes());
    sk
}

/// Draw a fresh key pair from `rng`.
pub fn generate_key_pair<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> KeyPair {
    let key = SigningKey::random(rng);
    KeyPair {
        public_key: key.verifying_key().into(),
        private_key: private_key_bytes(&key),
    }
}

/// Derive the public key belonging to `private_key`.
pub fn public_key_of(private_key: &PrivateKey) -> Result<PublicKey, Error> {
    let key = SigningKey::from_bytes(&private_key.0)?;
    Ok(key.verifying_key().into())
}

pub fn verify(public_key: &PublicKey, msg: Hash, sig: &Signature) -> Result<(), Error> {
    let key = VerifyingKey::from_sec1_bytes(&public_key.0)?;
    let sig = EcdsaSignature::from_bytes(&sig.0)?;
    key.verify_prehash(&msg.0, &sig)
}

#[derive(Debug)]
pub struct Signer {
    key: SigningKey,
    public_key: PublicKey,
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let key = SigningKey::random(rng);
        let public_key = key.verifying_key().into();
        Self { key, public_key }
    }

    pub fn from_private_key(private_key: &PrivateKey) -> Result<Self, Error> {
        let key = SigningKey::from_bytes(&private_key.0)?;
        let public_key = key.verifying_key().into();
        Ok(Self { key, public_key })
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn sign(&self, msg: Hash) -> Signature {
        // Signing a 32 byte prehash with a valid key cannot fail.
        let sig: EcdsaSignature = self
            .key
            .sign_prehash(&msg.0)
            .expect("Unreachable: prehash has the size of the curve order");

        let mut out = Signature::default();
        out.0.copy_from_slice(sig.as_bytes());
        out
    }
}
