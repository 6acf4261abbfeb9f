//! Note Store
//!
//! Append-only map of commitment → note, indexed by `(slot, derived key)`.
//! Notes are never erased: a note is live until the nullifier origin it was
//! stored with shows up in the nullifier set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use shade_privacy::{Address, Commitment, Field, Note, SlotId};

use super::nullifier_set::{NullifierOrigin, NullifierSet};
use super::TxId;
use crate::error::{EngineError, Result};

/// A note as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredNote {
    pub note: Note,
    /// Derived key the note is indexed under
    pub derived_key: Field,
    /// What has to be spent for this note to count as consumed
    pub origin: NullifierOrigin,
    pub created_at: TxId,
    /// Insertion order
    pub position: u64,
}

/// Handle returned by a successful insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRef {
    pub commitment: Commitment,
    pub slot: SlotId,
    pub position: u64,
}

#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: HashMap<Commitment, StoredNote>,
    by_key: HashMap<(SlotId, Field), Vec<Commitment>>,
    next_position: u64,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a note
    ///
    /// Fails with `DuplicateCommitment` if the commitment is already stored.
    pub fn insert(
        &mut self,
        note: Note,
        derived_key: Field,
        origin: NullifierOrigin,
        created_at: TxId,
    ) -> Result<CommitmentRef> {
        if self.notes.contains_key(&note.commitment) {
            return Err(EngineError::DuplicateCommitment { slot: note.slot });
        }

        let stored = StoredNote {
            derived_key,
            origin,
            created_at,
            position: self.next_position,
            note,
        };
        Ok(self.restore(stored))
    }

    /// Re-insert a note loaded from persistent storage, keeping its position
    pub fn restore(&mut self, stored: StoredNote) -> CommitmentRef {
        let reference = CommitmentRef {
            commitment: stored.note.commitment,
            slot: stored.note.slot,
            position: stored.position,
        };

        self.next_position = self.next_position.max(stored.position + 1);
        // Callers restore in position order, so buckets stay oldest first
        self.by_key
            .entry((stored.note.slot, stored.derived_key))
            .or_default()
            .push(stored.note.commitment);
        self.notes.insert(stored.note.commitment, stored);

        reference
    }

    pub fn contains(&self, commitment: &Commitment) -> bool {
        self.notes.contains_key(commitment)
    }

    pub fn get(&self, commitment: &Commitment) -> Option<&StoredNote> {
        self.notes.get(commitment)
    }

    /// Every stored note under `(slot, key)`, live or not, oldest first
    pub fn candidates(&self, slot: SlotId, key: &Field) -> impl Iterator<Item = &StoredNote> {
        self.by_key
            .get(&(slot, *key))
            .into_iter()
            .flatten()
            .filter_map(|c| self.notes.get(c))
    }

    /// First live note under `(slot, key)`
    pub fn find(&self, slot: SlotId, key: &Field, nullifiers: &NullifierSet) -> Option<&StoredNote> {
        self.candidates(slot, key)
            .find(|stored| !nullifiers.is_spent(&stored.origin))
    }

    /// First live note under `(slot, key)` owned by `owner`
    pub fn find_owned(
        &self,
        owner: &Address,
        slot: SlotId,
        key: &Field,
        nullifiers: &NullifierSet,
    ) -> Option<&StoredNote> {
        self.candidates(slot, key)
            .find(|stored| stored.note.owner == *owner && !nullifiers.is_spent(&stored.origin))
    }

    /// Live notes owned by `owner`, oldest first
    pub fn owned_by<'a>(
        &'a self,
        owner: &'a Address,
        nullifiers: &'a NullifierSet,
    ) -> Vec<&'a StoredNote> {
        let mut notes: Vec<_> = self
            .notes
            .values()
            .filter(|stored| stored.note.owner == *owner && !nullifiers.is_spent(&stored.origin))
            .collect();
        notes.sort_by_key(|stored| stored.position);
        notes
    }

    /// Position the next inserted note will take
    pub fn next_position(&self) -> u64 {
        self.next_position
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// All stored notes, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &StoredNote> {
        let mut notes: Vec<_> = self.notes.values().collect();
        notes.sort_by_key(|stored| stored.position);
        notes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_privacy::{ExclusiveNote, Nullifier, NotePayload};

    fn note(owner: u8, randomness: u64, nonce: u64) -> Note {
        let owner = Address([owner; 32]);
        let payload = NotePayload::Exclusive(ExclusiveNote {
            owner,
            randomness: Field::from_u64(randomness),
        });
        Note::new(owner, SlotId(2), &payload, Field::from_u64(nonce))
    }

    fn insert(store: &mut NoteStore, n: Note) -> Result<CommitmentRef> {
        let key = n.derived_key()?;
        let origin = NullifierOrigin::Note(n.commitment);
        store.insert(n, key, origin, TxId(1))
    }

    #[test]
    fn test_insert_assigns_positions() {
        let mut store = NoteStore::new();
        let a = insert(&mut store, note(1, 1, 1)).unwrap();
        let b = insert(&mut store, note(1, 2, 2)).unwrap();
        assert_eq!((a.position, b.position), (0, 1));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_duplicate_commitment_rejected() {
        let mut store = NoteStore::new();
        insert(&mut store, note(1, 1, 1)).unwrap();
        let err = insert(&mut store, note(1, 1, 1)).unwrap_err();
        assert_eq!(err, EngineError::DuplicateCommitment { slot: SlotId(2) });
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_find_skips_nullified_notes() {
        let mut store = NoteStore::new();
        let mut nullifiers = NullifierSet::new();
        let first = note(1, 1, 1);
        let second = note(1, 1, 2);
        let key = first.derived_key().unwrap();
        let first_commitment = first.commitment;
        let second_commitment = second.commitment;

        insert(&mut store, first).unwrap();
        insert(&mut store, second).unwrap();
        assert_eq!(
            store.find(SlotId(2), &key, &nullifiers).map(|s| s.note.commitment),
            Some(first_commitment)
        );

        nullifiers
            .try_consume(
                Nullifier([9u8; 32]),
                NullifierOrigin::Note(first_commitment),
                TxId(2),
            )
            .unwrap();
        assert_eq!(
            store.find(SlotId(2), &key, &nullifiers).map(|s| s.note.commitment),
            Some(second_commitment)
        );
        // Both are still physically stored
        assert_eq!(store.candidates(SlotId(2), &key).count(), 2);
    }

    #[test]
    fn test_find_owned_filters_by_owner() {
        let mut store = NoteStore::new();
        let nullifiers = NullifierSet::new();
        let n = note(1, 1, 1);
        let key = n.derived_key().unwrap();
        insert(&mut store, n).unwrap();

        assert!(store.find_owned(&Address([1u8; 32]), SlotId(2), &key, &nullifiers).is_some());
        assert!(store.find_owned(&Address([2u8; 32]), SlotId(2), &key, &nullifiers).is_none());
    }
}
