use super::is_signed_by;
use crate::{
    ledger::{Transaction, TransactionInput, TransactionOutput},
    Hash,
};
use rand::{rngs::StdRng, SeedableRng};
use sha3::{Digest, Sha3_256};

fn data() -> Hash {
    Hash(Sha3_256::digest(b"\xa1\xa2\xa3\xa4").into())
}

fn transaction() -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TransactionInput {
            reference_transaction_hash: vec![0x11; 32],
            output_index: 0,
            unlocking_script: vec![],
        }],
        outputs: vec![TransactionOutput {
            locking_script: vec![0x01; 34],
            amount: 10,
        }],
        witnesses: vec![],
        lock_time: 0,
    }
}

macro_rules! make_a_to_b {
    ($name:ident, $signer:ty, $verify:path) => {
        #[test]
        fn $name() {
            // Do not use that on any real device, this is just for testing.
            let mut rng = StdRng::seed_from_u64(0);
            let signer = <$signer>::new(&mut rng);
            let msg = data();
            let sig = signer.sign(msg);

            $verify(&signer.public_key(), msg, &sig).unwrap();

            let mut other = msg;
            other.0[0] ^= 1;
            assert!($verify(&signer.public_key(), other, &sig).is_err());
        }
    };
}

macro_rules! make_key_pair_roundtrip {
    ($name:ident, $generate:path, $public_key_of:path, $signer:ty) => {
        #[test]
        fn $name() {
            let mut rng = StdRng::seed_from_u64(7);
            let pair = $generate(&mut rng);
            assert_eq!($public_key_of(&pair.private_key).unwrap(), pair.public_key);

            let signer = <$signer>::from_private_key(&pair.private_key).unwrap();
            assert_eq!(signer.public_key(), pair.public_key);
            // Compressed SEC1 encoding.
            assert!(matches!(pair.public_key.0[0], 0x02 | 0x03));
        }
    };
}

#[cfg(feature = "secp256k1")]
make_a_to_b!(
    secp256k1_to_secp256k1,
    super::secp256k1::Signer,
    super::secp256k1::verify
);

#[cfg(feature = "k256")]
make_a_to_b!(k256_to_k256, super::k256::Signer, super::k256::verify);

#[cfg(all(feature = "secp256k1", feature = "k256"))]
make_a_to_b!(secp256k1_to_k256, super::secp256k1::Signer, super::k256::verify);

#[cfg(all(feature = "secp256k1", feature = "k256"))]
make_a_to_b!(k256_to_secp256k1, super::k256::Signer, super::secp256k1::verify);

#[cfg(feature = "secp256k1")]
make_key_pair_roundtrip!(
    secp256k1_key_pair,
    super::secp256k1::generate_key_pair,
    super::secp256k1::public_key_of,
    super::secp256k1::Signer
);

#[cfg(feature = "k256")]
make_key_pair_roundtrip!(
    k256_key_pair,
    super::k256::generate_key_pair,
    super::k256::public_key_of,
    super::k256::Signer
);

#[cfg(all(feature = "secp256k1", feature = "k256"))]
#[test]
fn backends_derive_the_same_public_key() {
    let mut rng = StdRng::seed_from_u64(3);
    let pair = super::k256::generate_key_pair(&mut rng);
    assert_eq!(
        super::secp256k1::public_key_of(&pair.private_key).unwrap(),
        pair.public_key
    );
}

#[test]
fn signing_a_transaction_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(1);
    let signer = super::Signer::new(&mut rng);
    let mut tx = transaction();
    let hash = tx.hash();

    signer.sign_transaction(&mut tx);
    signer.sign_transaction(&mut tx);

    assert_eq!(tx.witnesses.len(), 1);
    // Witnesses are not part of the content hash.
    assert_eq!(tx.hash(), hash);
    assert!(is_signed_by(&tx, &signer.public_key()));
}

#[test]
fn signature_by_other_key_is_not_accepted() {
    let mut rng = StdRng::seed_from_u64(2);
    let alice = super::Signer::new(&mut rng);
    let bob = super::Signer::new(&mut rng);
    let mut tx = transaction();

    alice.sign_transaction(&mut tx);

    assert!(!is_signed_by(&tx, &bob.public_key()));
    bob.sign_transaction(&mut tx);
    assert!(is_signed_by(&tx, &bob.public_key()));
    assert_eq!(tx.witnesses.len(), 2);
}

#[test]
fn validate_and_sign_rejects_transaction_without_inputs() {
    let mut rng = StdRng::seed_from_u64(4);
    let signer = super::Signer::new(&mut rng);
    let mut tx = transaction();
    tx.inputs.clear();

    assert!(signer.validate_and_sign(&mut tx).is_err());
    assert!(tx.witnesses.is_empty());
}
