//! Action Staging
//!
//! An action runs against one ledger snapshot and stages every write into a
//! [`Batch`]. Reads see the snapshot with the action's own staged writes laid
//! over it, so a protocol that consumes a note it created earlier in the same
//! action behaves as if the first write had already landed.
//!
//! Nothing reaches the ledger until the batch is submitted; dropping an
//! action discards everything it staged.

use log::debug;

use shade_privacy::poseidon::{domain, hash_with_domain};
use shade_privacy::{
    Address, CommitmentScheme, Field, Note, NotePayload, Nullifier, SlotId, shared_key_tag,
};

use crate::error::{EngineError, Result};
use crate::storage::{
    Batch, LedgerState, NullifierOrigin, PendingNote, PendingNullifier, PublicSlot,
};

pub struct Action<'a> {
    state: &'a LedgerState,
    batch: Batch,
    nonce: Field,
    note_index: u32,
    fresh: u64,
}

impl<'a> Action<'a> {
    pub fn new(state: &'a LedgerState, label: impl Into<String>, nonce: Field) -> Self {
        Self {
            state,
            batch: Batch {
                label: label.into(),
                base_height: state.height(),
                ..Default::default()
            },
            nonce,
            note_index: 0,
            fresh: 0,
        }
    }

    /// Snapshot the action runs against
    pub fn state(&self) -> &'a LedgerState {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.batch.label
    }

    /// Staged writes so far
    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn into_batch(self) -> Batch {
        self.batch
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    fn is_live(&self, origin: &NullifierOrigin) -> bool {
        !self.state.nullifiers().is_spent(origin)
            && !self.batch.nullifiers.iter().any(|n| n.origin == *origin)
    }

    /// Spent in the snapshot or staged by this action
    pub fn is_nullified(&self, value: &Nullifier) -> bool {
        self.state.nullifiers().exists(value)
            || self.batch.nullifiers.iter().any(|n| n.value == *value)
    }

    /// Every live note under `(slot, key)`, optionally restricted to one
    /// owner, oldest first
    pub fn find_all(&self, owner: Option<&Address>, slot: SlotId, key: &Field) -> Vec<Note> {
        let owned = |note: &Note| owner.is_none_or(|o| note.owner == *o);

        let stored = self
            .state
            .notes()
            .candidates(slot, key)
            .filter(|stored| owned(&stored.note) && self.is_live(&stored.origin))
            .map(|stored| stored.note.clone());

        let staged = self
            .batch
            .notes
            .iter()
            .filter(|pending| {
                pending.note.slot == slot
                    && pending.derived_key == *key
                    && owned(&pending.note)
                    && self.is_live(&pending.origin)
            })
            .map(|pending| pending.note.clone());

        stored.chain(staged).collect()
    }

    /// First live note under `(slot, key)`
    pub fn find(&self, owner: Option<&Address>, slot: SlotId, key: &Field) -> Option<Note> {
        self.find_all(owner, slot, key).into_iter().next()
    }

    /// Fail if `owner` holds a live note under `(slot, key)`; otherwise
    /// record the empty read so the ledger re-checks it at commit
    pub fn require_absent(&mut self, owner: &Address, slot: SlotId, key: &Field) -> Result<()> {
        if self.find(Some(owner), slot, key).is_some() {
            return Err(EngineError::DuplicateCommitment { slot });
        }
        let read = (*owner, slot, *key);
        if !self.batch.absent.contains(&read) {
            self.batch.absent.push(read);
        }
        Ok(())
    }

    /// Whether any note was ever stored under `(slot, key)` for `owner`,
    /// live or not
    pub fn has_history(&self, owner: &Address, slot: SlotId, key: &Field) -> bool {
        self.state
            .notes()
            .candidates(slot, key)
            .any(|stored| stored.note.owner == *owner)
            || self.batch.notes.iter().any(|pending| {
                pending.note.slot == slot
                    && pending.derived_key == *key
                    && pending.note.owner == *owner
            })
    }

    /// Live notes owned by `owner` in `slot`, oldest first
    pub fn notes_owned(&self, owner: &Address, slot: SlotId) -> Vec<Note> {
        let stored = self
            .state
            .notes()
            .owned_by(owner, self.state.nullifiers())
            .into_iter()
            .filter(|stored| stored.note.slot == slot && self.is_live(&stored.origin))
            .map(|stored| stored.note.clone());

        let staged = self
            .batch
            .notes
            .iter()
            .filter(|pending| {
                pending.note.owner == *owner
                    && pending.note.slot == slot
                    && self.is_live(&pending.origin)
            })
            .map(|pending| pending.note.clone());

        stored.chain(staged).collect()
    }

    /// Read a public slot and record the version seen
    pub fn read_public(&mut self, slot: PublicSlot) -> Option<Vec<Field>> {
        if !self.batch.public_reads.iter().any(|(s, _)| *s == slot) {
            let version = self.state.public().version(&slot);
            self.batch.public_reads.push((slot, version));
        }
        self.peek_public(&slot)
    }

    /// Read a public slot without recording a dependency on it
    pub fn peek_public(&self, slot: &PublicSlot) -> Option<Vec<Field>> {
        self.batch
            .public_writes
            .iter()
            .rev()
            .find(|(s, _)| s == slot)
            .map(|(_, value)| value.clone())
            .or_else(|| self.state.public().read(slot).map(|e| e.value.clone()))
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Randomness unique within this action
    pub fn fresh_randomness(&mut self) -> Field {
        self.fresh += 1;
        Field::from_fr(hash_with_domain(
            domain::RANDOMNESS,
            &[self.nonce.to_fr(), Field::from_u64(self.fresh).to_fr()],
        ))
    }

    /// Stage a new note owned by `owner`
    ///
    /// Notes carrying a shared key are tied to that key's nullifier; every
    /// other note is tied to its own commitment.
    pub fn insert_note(
        &mut self,
        owner: Address,
        slot: SlotId,
        payload: &NotePayload,
    ) -> Result<Note> {
        let nonce = CommitmentScheme::new().note_nonce(&self.nonce, self.note_index);
        self.note_index += 1;

        let note = Note::new(owner, slot, payload, nonce);
        if self.state.notes().contains(&note.commitment)
            || self
                .batch
                .notes
                .iter()
                .any(|p| p.note.commitment == note.commitment)
        {
            return Err(EngineError::DuplicateCommitment { slot });
        }

        let origin = match payload.shared_key() {
            Some(key) => NullifierOrigin::SharedKey(shared_key_tag(&key)),
            None => NullifierOrigin::Note(note.commitment),
        };
        debug!(
            "[{}] stage note {} in slot {} for {}",
            self.batch.label, note.commitment, slot, owner
        );
        self.batch.notes.push(PendingNote {
            note: note.clone(),
            derived_key: payload.derived_key(),
            origin,
        });
        Ok(note)
    }

    /// Stage a nullifier, failing if it is already spent or staged
    pub fn try_consume(&mut self, value: Nullifier, origin: NullifierOrigin) -> Result<()> {
        if self.is_nullified(&value) {
            return Err(EngineError::AlreadyNullified(value));
        }
        debug!("[{}] stage nullifier {}", self.batch.label, value);
        self.batch.nullifiers.push(PendingNullifier { value, origin });
        Ok(())
    }

    pub fn write_public(&mut self, slot: PublicSlot, value: Vec<Field>) {
        debug!("[{}] stage public write {}", self.batch.label, slot);
        self.batch.public_writes.push((slot, value));
    }
}
