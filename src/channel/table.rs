use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use super::record::{ChannelPhase, ChannelRecord};
use crate::error::Error;

pub type SharedRecord = Arc<Mutex<ChannelRecord>>;

/// All channels of one node, by counterparty address.
///
/// Lock order: the table lock is only ever taken before a record lock, never
/// while one is held.
#[derive(Debug, Default)]
pub struct ChannelTable {
    channels: Mutex<HashMap<String, SharedRecord>>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` unless a channel with `address` exists. Check and
    /// insert happen under one lock.
    pub(crate) fn insert_new(
        &self,
        address: &str,
        record: ChannelRecord,
    ) -> Result<SharedRecord, Error> {
        let mut channels = self.channels.lock();
        if channels.contains_key(address) {
            return Err(Error::ChannelAlreadyExists(address.to_owned()));
        }
        let shared = Arc::new(Mutex::new(record));
        channels.insert(address.to_owned(), shared.clone());
        Ok(shared)
    }

    pub fn get(&self, address: &str) -> Option<SharedRecord> {
        self.channels.lock().get(address).cloned()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.channels.lock().contains_key(address)
    }

    /// Drop a funder reservation whose Open did not complete. Records past
    /// [ChannelPhase::Opening] are never removed.
    pub(crate) fn remove_if_opening(&self, address: &str) -> bool {
        self.remove_if(address, |r| r.phase() == ChannelPhase::Opening)
    }

    /// Remove the record for `address` if `pred` holds for it, deciding and
    /// removing under the table lock.
    pub(crate) fn remove_if(
        &self,
        address: &str,
        pred: impl FnOnce(&ChannelRecord) -> bool,
    ) -> bool {
        let mut channels = self.channels.lock();
        let matched = channels.get(address).map_or(false, |r| pred(&r.lock()));
        if matched {
            channels.remove(address);
        }
        matched
    }

    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.channels.lock().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
