use crate::types::{Hash, KeyPair, PrivateKey, PublicKey, Signature};
use secp256k1::{
    self, ecdsa, All, Message, PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey,
};

pub use secp256k1::Error;

impl From<Secp256k1PublicKey> for PublicKey {
    fn from(pk: Secp256k1PublicKey) -> Self {
        PublicKey(pk.serialize())
    }
}

pub fn generate_key_pair<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> KeyPair {
    let secp = Secp256k1::signing_only();
    let sk = SecretKey::new(rng);
    KeyPair {
        public_key: Secp256k1PublicKey::from_secret_key(&secp, &sk).into(),
        private_key: PrivateKey(sk.secret_bytes()),
    }
}

pub fn public_key_of(private_key: &PrivateKey) -> Result<PublicKey, Error> {
    let secp = Secp256k1::signing_only();
    let sk = SecretKey::from_slice(&private_key.0)?;
    Ok(Secp256k1PublicKey::from_secret_key(&secp, &sk).into())
}

/// Verify a compact signature over the prehash `msg`.
///
/// Only low-S signatures are accepted, which is what both backends produce.
pub fn verify(public_key: &PublicKey, msg: Hash, sig: &Signature) -> Result<(), Error> {
    let secp = Secp256k1::verification_only();
    let pk = Secp256k1PublicKey::from_slice(&public_key.0)?;
    let sig = ecdsa::Signature::from_compact(&sig.0)?;
    secp.verify_ecdsa(&Message::from_slice(&msg.0)?, &sig, &pk)
}

#[derive(Debug)]
pub struct Signer {
    secp: Secp256k1<All>,
    sk: SecretKey,
    public_key: PublicKey,
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let secp = Secp256k1::new();
        let sk = SecretKey::new(rng);
        let public_key = Secp256k1PublicKey::from_secret_key(&secp, &sk).into();
        Self {
            secp,
            sk,
            public_key,
        }
    }

    pub fn from_private_key(private_key: &PrivateKey) -> Result<Self, Error> {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&private_key.0)?;
        let public_key = Secp256k1PublicKey::from_secret_key(&secp, &sk).into();
        Ok(Self {
            secp,
            sk,
            public_key,
        })
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn sign(&self, msg: Hash) -> Signature {
        // A 32 byte slice is always a valid message.
        let msg = Message::from_slice(&msg.0)
            .expect("Unreachable: Hash has exactly 32 bytes");
        let sig = self.secp.sign_ecdsa(&msg, &self.sk);
        Signature(sig.serialize_compact())
    }
}
