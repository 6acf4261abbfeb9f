//! Nullifier Set
//!
//! Permanent record of every spent nullifier. The ledger checks a batch's
//! nullifiers against it and inserts them only once the whole batch passes.
//!
//! Each record remembers what it was derived from, which is how the note
//! store decides liveness: a note stored with origin `O` is consumed once a
//! nullifier with origin `O` exists.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use shade_privacy::{Address, Commitment, Field, Nullifier};

use super::TxId;
use crate::error::{EngineError, Result};

/// What a nullifier was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NullifierOrigin {
    /// A single note spent with its owner's key or its own secret
    Note(Commitment),
    /// Every note carrying the shared key with this public tag
    SharedKey(Field),
    /// A uniqueness marker; no note is attached
    Marker(Field),
    /// An authorization witness nonce
    Witness(Address),
}

/// A spent nullifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierRecord {
    pub value: Nullifier,
    pub derived_from: NullifierOrigin,
    pub spent_at: TxId,
}

#[derive(Debug, Clone, Default)]
pub struct NullifierSet {
    records: HashMap<Nullifier, NullifierRecord>,
    spent_origins: HashSet<NullifierOrigin>,
}

impl NullifierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a nullifier has been spent
    pub fn exists(&self, nullifier: &Nullifier) -> bool {
        self.records.contains_key(nullifier)
    }

    /// Check if anything derived from `origin` has been spent
    pub fn is_spent(&self, origin: &NullifierOrigin) -> bool {
        self.spent_origins.contains(origin)
    }

    pub fn get(&self, nullifier: &Nullifier) -> Option<&NullifierRecord> {
        self.records.get(nullifier)
    }

    /// Insert the nullifier if absent
    pub fn try_consume(
        &mut self,
        value: Nullifier,
        derived_from: NullifierOrigin,
        spent_at: TxId,
    ) -> Result<()> {
        if self.records.contains_key(&value) {
            return Err(EngineError::AlreadyNullified(value));
        }
        self.restore(NullifierRecord {
            value,
            derived_from,
            spent_at,
        });
        Ok(())
    }

    /// Re-insert a record loaded from persistent storage
    pub fn restore(&mut self, record: NullifierRecord) {
        self.spent_origins.insert(record.derived_from);
        self.records.insert(record.value, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NullifierRecord> {
        self.records.values()
    }
}
