use core::fmt::Debug;

use rand::{distributions::Standard, prelude::Distribution};
use serde::Serialize;

/// Returned when a byte buffer received over the wire does not have the
/// length of the fixed-size type it is converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("expected {expected} bytes, got {actual}")]
pub struct ByteLengthMismatch {
    pub expected: usize,
    pub actual: usize,
}

macro_rules! impl_hex_debug {
    ($T:ident) => {
        impl Debug for $T {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str("0x")?;
                for b in self.0 {
                    f.write_fmt(format_args!("{:02x}", b))?;
                }
                Ok(())
            }
        }
    };
}

macro_rules! bytesN {
    ( $T:ident, $N:literal ) => {
        #[derive(PartialEq, Eq, Hash, Copy, Clone)]
        pub struct $T(pub [u8; $N]);

        impl $T {
            pub const LEN: usize = $N;

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn to_vec(&self) -> Vec<u8> {
                self.0.to_vec()
            }
        }

        impl Serialize for $T {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_bytes(&self.0)
            }
        }

        impl Default for $T {
            fn default() -> Self {
                Self([0; $N])
            }
        }

        impl TryFrom<&[u8]> for $T {
            type Error = ByteLengthMismatch;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                let bytes: [u8; $N] = value.try_into().or(Err(ByteLengthMismatch {
                    expected: $N,
                    actual: value.len(),
                }))?;
                Ok(Self(bytes))
            }
        }

        impl TryFrom<Vec<u8>> for $T {
            type Error = ByteLengthMismatch;

            fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
                Self::try_from(value.as_slice())
            }
        }
    };
}

bytesN!(Hash, 32);
impl_hex_debug!(Hash);

impl Distribution<Hash> for Standard {
    fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> Hash {
        Hash(rng.gen())
    }
}

// Compressed SEC1 encoding, identical for both signature backends.
bytesN!(PublicKey, 33);
impl_hex_debug!(PublicKey);

bytesN!(PrivateKey, 32);

// Private keys end up in logs through `{:?}` on the channel record, so they
// only print a fingerprint.
impl Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!(
            "PrivateKey({:02x}{:02x}..)",
            self.0[0], self.0[1]
        ))
    }
}

// Compact (r, s) ECDSA signature.
bytesN!(Signature, 64);
impl_hex_debug!(Signature);

/// A public/private key pair, used both for node identities and for
/// revocation keys.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}
