//! Locking script templates used by channel transactions.
//!
//! Every script starts with a one byte template tag followed by fixed-size
//! fields:
//!
//! | template          | layout                                            |
//! |-------------------|---------------------------------------------------|
//! | pay to public key | `0x01 ‖ key`                                      |
//! | 2-of-2 multisig   | `0x02 ‖ key_a ‖ key_b`                            |
//! | revocable         | `0x03 ‖ owner ‖ revocation ‖ delay (u32, BE)`     |
//!
//! The revocable template pays `owner` after `delay` blocks, or immediately
//! to whoever holds the private half of `revocation`.

use crate::types::PublicKey;
use serde::Serialize;

const PAY_TO_PUBLIC_KEY: u8 = 0x01;
const MULTISIG: u8 = 0x02;
const REVOCABLE: u8 = 0x03;

const KEY: usize = PublicKey::LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScriptType {
    PayToPublicKey,
    Multisig,
    Revocable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("empty locking script")]
    Empty,
    #[error("unknown script template {0:#04x}")]
    UnknownTemplate(u8),
    #[error("script of template {template:?} has {actual} bytes, expected {expected}")]
    Length {
        template: ScriptType,
        expected: usize,
        actual: usize,
    },
}

pub fn pay_to_public_key(key: &PublicKey) -> Vec<u8> {
    let mut script = Vec::with_capacity(1 + KEY);
    script.push(PAY_TO_PUBLIC_KEY);
    script.extend_from_slice(&key.0);
    script
}

pub fn multisig(a: &PublicKey, b: &PublicKey) -> Vec<u8> {
    let mut script = Vec::with_capacity(1 + 2 * KEY);
    script.push(MULTISIG);
    script.extend_from_slice(&a.0);
    script.extend_from_slice(&b.0);
    script
}

pub fn revocable(owner: &PublicKey, revocation: &PublicKey, delay: u32) -> Vec<u8> {
    let mut script = Vec::with_capacity(1 + 2 * KEY + 4);
    script.push(REVOCABLE);
    script.extend_from_slice(&owner.0);
    script.extend_from_slice(&revocation.0);
    script.extend_from_slice(&delay.to_be_bytes());
    script
}

impl ScriptType {
    fn script_len(self) -> usize {
        match self {
            ScriptType::PayToPublicKey => 1 + KEY,
            ScriptType::Multisig => 1 + 2 * KEY,
            ScriptType::Revocable => 1 + 2 * KEY + 4,
        }
    }
}

pub fn determine_script_type(locking_script: &[u8]) -> Result<ScriptType, ScriptError> {
    let template = match locking_script.first() {
        None => return Err(ScriptError::Empty),
        Some(&PAY_TO_PUBLIC_KEY) => ScriptType::PayToPublicKey,
        Some(&MULTISIG) => ScriptType::Multisig,
        Some(&REVOCABLE) => ScriptType::Revocable,
        Some(&tag) => return Err(ScriptError::UnknownTemplate(tag)),
    };

    if locking_script.len() != template.script_len() {
        return Err(ScriptError::Length {
            template,
            expected: template.script_len(),
            actual: locking_script.len(),
        });
    }
    Ok(template)
}

fn key_at(script: &[u8], offset: usize) -> PublicKey {
    let mut key = PublicKey::default();
    key.0.copy_from_slice(&script[offset..offset + KEY]);
    key
}

/// The keys a 2-of-2 multisig script locks to.
pub fn multisig_keys(locking_script: &[u8]) -> Option<(PublicKey, PublicKey)> {
    match determine_script_type(locking_script) {
        Ok(ScriptType::Multisig) => Some((
            key_at(locking_script, 1),
            key_at(locking_script, 1 + KEY),
        )),
        _ => None,
    }
}

/// The key a revocable script pays out to once its delay has passed.
pub fn revocable_owner(locking_script: &[u8]) -> Option<PublicKey> {
    match determine_script_type(locking_script) {
        Ok(ScriptType::Revocable) => Some(key_at(locking_script, 1)),
        _ => None,
    }
}

/// The revocation public key embedded in a revocable script.
pub fn revocation_public_key(locking_script: &[u8]) -> Option<PublicKey> {
    match determine_script_type(locking_script) {
        Ok(ScriptType::Revocable) => Some(key_at(locking_script, 1 + KEY)),
        _ => None,
    }
}
