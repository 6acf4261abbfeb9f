//! Ledger Submission
//!
//! A batch carries everything one action wants to write: note insertions,
//! nullifier insertions and public writes, plus the public versions it read.
//! The ledger validates the whole batch against current state and then
//! applies it, or applies nothing.
//!
//! ```text
//!   Action ──► Batch ──► validate(state) ──► apply ──► Receipt
//!                             │
//!                             └── DuplicateCommitment | AlreadyNullified
//!                                 | Unauthorized(Replayed)
//!                                 | Rejected(StaleRead | BatchTooLarge)
//! ```
//!
//! Reads are re-checked too: a public slot read at an older version, or an
//! `(owner, slot, key)` that was empty when the action looked and has since
//! gained a live note, rejects the batch.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use shade_privacy::{Address, Field, Note, Nullifier, SlotId};

use super::note_store::{CommitmentRef, NoteStore, StoredNote};
use super::nullifier_set::{NullifierOrigin, NullifierRecord, NullifierSet};
use super::public_state::{PublicEntry, PublicSlot, PublicState};
use crate::error::{AuthFailure, EngineError, RejectReason, Result};

/// Sequential id of a committed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub u64);

/// Note staged for insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNote {
    pub note: Note,
    pub derived_key: Field,
    pub origin: NullifierOrigin,
}

/// Nullifier staged for insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingNullifier {
    pub value: Nullifier,
    pub origin: NullifierOrigin,
}

/// Everything one action commits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub label: String,
    /// Height of the snapshot the action ran against
    pub base_height: u64,
    pub notes: Vec<PendingNote>,
    pub nullifiers: Vec<PendingNullifier>,
    pub public_reads: Vec<(PublicSlot, u64)>,
    pub public_writes: Vec<(PublicSlot, Vec<Field>)>,
    /// `(owner, slot, key)` lookups that found no live note
    #[serde(default)]
    pub absent: Vec<(Address, SlotId, Field)>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.nullifiers.is_empty() && self.public_writes.is_empty()
    }
}

/// Proof that a batch was committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_id: TxId,
    pub label: String,
    pub commitments: Vec<CommitmentRef>,
    pub nullifiers: Vec<Nullifier>,
    pub public_writes: Vec<PublicSlot>,
}

/// Records a validated batch adds, ready to be installed or persisted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Writes {
    pub tx_id: TxId,
    pub label: String,
    pub notes: Vec<StoredNote>,
    pub nullifiers: Vec<NullifierRecord>,
    /// Final entry per written slot
    pub public: Vec<(PublicSlot, PublicEntry)>,
}

/// Per-batch size limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_notes: usize,
    pub max_nullifiers: usize,
    pub max_public_writes: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_notes: 64,
            max_nullifiers: 64,
            max_public_writes: 16,
        }
    }
}

impl BatchLimits {
    fn check(&self, batch: &Batch) -> Result<()> {
        let checks = [
            ("notes", batch.notes.len(), self.max_notes),
            ("nullifiers", batch.nullifiers.len(), self.max_nullifiers),
            ("public writes", batch.public_writes.len(), self.max_public_writes),
        ];
        for (what, count, limit) in checks {
            if count > limit {
                return Err(RejectReason::BatchTooLarge { what, count, limit }.into());
            }
        }
        Ok(())
    }
}

/// Ledger snapshot
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    notes: NoteStore,
    nullifiers: NullifierSet,
    public: PublicState,
    height: u64,
}

impl LedgerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes(&self) -> &NoteStore {
        &self.notes
    }

    pub fn nullifiers(&self) -> &NullifierSet {
        &self.nullifiers
    }

    pub fn public(&self) -> &PublicState {
        &self.public
    }

    /// Number of committed batches
    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn is_live(&self, stored: &StoredNote) -> bool {
        !self.nullifiers.is_spent(&stored.origin)
    }

    /// Live note under `(slot, key)` owned by `owner`
    pub fn query_note(&self, owner: &Address, slot: SlotId, key: &Field) -> Option<&Note> {
        self.notes
            .find_owned(owner, slot, key, &self.nullifiers)
            .map(|stored| &stored.note)
    }

    /// Check a batch against this snapshot without applying it
    pub fn validate(&self, batch: &Batch, limits: &BatchLimits) -> Result<()> {
        limits.check(batch)?;

        let mut commitments = HashSet::new();
        for pending in &batch.notes {
            let commitment = pending.note.commitment;
            if self.notes.contains(&commitment) || !commitments.insert(commitment) {
                return Err(EngineError::DuplicateCommitment {
                    slot: pending.note.slot,
                });
            }
        }

        // Notes this batch spends do not count against its empty reads
        let spent_here =
            |origin: &NullifierOrigin| batch.nullifiers.iter().any(|n| n.origin == *origin);
        for (owner, slot, key) in &batch.absent {
            let taken = self.notes.candidates(*slot, key).any(|stored| {
                stored.note.owner == *owner
                    && self.is_live(stored)
                    && !spent_here(&stored.origin)
            });
            if taken {
                return Err(EngineError::DuplicateCommitment { slot: *slot });
            }
        }

        let mut nullifiers = HashSet::new();
        for pending in &batch.nullifiers {
            if self.nullifiers.exists(&pending.value) || !nullifiers.insert(pending.value) {
                return Err(match pending.origin {
                    NullifierOrigin::Witness(_) => AuthFailure::Replayed.into(),
                    _ => EngineError::AlreadyNullified(pending.value),
                });
            }
        }

        for (slot, version) in &batch.public_reads {
            if self.public.version(slot) != *version {
                return Err(RejectReason::StaleRead(*slot).into());
            }
        }

        Ok(())
    }

    /// Validate a batch and compute the records it would add
    pub fn writes(&self, batch: Batch, limits: &BatchLimits) -> Result<Writes> {
        if let Err(err) = self.validate(&batch, limits) {
            warn!("Rejected batch '{}': {}", batch.label, err);
            return Err(err);
        }

        let tx_id = TxId(self.height + 1);
        let base = self.notes.next_position();
        let notes = batch
            .notes
            .into_iter()
            .zip(base..)
            .map(|(pending, position)| StoredNote {
                note: pending.note,
                derived_key: pending.derived_key,
                origin: pending.origin,
                created_at: tx_id,
                position,
            })
            .collect();

        let nullifiers = batch
            .nullifiers
            .into_iter()
            .map(|pending| NullifierRecord {
                value: pending.value,
                derived_from: pending.origin,
                spent_at: tx_id,
            })
            .collect();

        let mut public: Vec<(PublicSlot, PublicEntry)> = Vec::new();
        for (slot, value) in batch.public_writes {
            match public.iter_mut().find(|(s, _)| *s == slot) {
                Some((_, entry)) => {
                    entry.value = value;
                    entry.version += 1;
                }
                None => {
                    let version = self.public.version(&slot) + 1;
                    public.push((slot, PublicEntry { value, version }));
                }
            }
        }

        Ok(Writes {
            tx_id,
            label: batch.label,
            notes,
            nullifiers,
            public,
        })
    }

    /// Install records produced by [`LedgerState::writes`] against this
    /// same state
    pub(crate) fn install(&mut self, writes: Writes) -> Receipt {
        let commitments: Vec<CommitmentRef> = writes
            .notes
            .into_iter()
            .map(|stored| self.notes.restore(stored))
            .collect();

        let mut nullifiers = Vec::with_capacity(writes.nullifiers.len());
        for record in writes.nullifiers {
            nullifiers.push(record.value);
            self.nullifiers.restore(record);
        }

        let mut public_writes = Vec::with_capacity(writes.public.len());
        for (slot, entry) in writes.public {
            self.public.restore(slot, entry);
            public_writes.push(slot);
        }

        self.height = writes.tx_id.0;
        info!(
            "Committed '{}' as tx {}: {} notes, {} nullifiers, {} public writes",
            writes.label,
            writes.tx_id.0,
            commitments.len(),
            nullifiers.len(),
            public_writes.len()
        );

        Receipt {
            tx_id: writes.tx_id,
            label: writes.label,
            commitments,
            nullifiers,
            public_writes,
        }
    }

    /// Validate and apply in place; on error nothing changes
    pub fn commit(&mut self, batch: Batch, limits: &BatchLimits) -> Result<Receipt> {
        let writes = self.writes(batch, limits)?;
        Ok(self.install(writes))
    }

    /// Pure form of [`LedgerState::commit`]: (snapshot, batch) → new snapshot
    pub fn apply(&self, batch: Batch, limits: &BatchLimits) -> Result<(LedgerState, Receipt)> {
        let mut next = self.clone();
        let receipt = next.commit(batch, limits)?;
        Ok((next, receipt))
    }

    pub(crate) fn notes_mut(&mut self) -> &mut NoteStore {
        &mut self.notes
    }

    pub(crate) fn nullifiers_mut(&mut self) -> &mut NullifierSet {
        &mut self.nullifiers
    }

    pub(crate) fn public_mut(&mut self) -> &mut PublicState {
        &mut self.public
    }

    pub(crate) fn set_height(&mut self, height: u64) {
        self.height = height;
    }
}

/// Ledger-submission interface
pub trait Ledger {
    /// Current snapshot
    fn state(&self) -> &LedgerState;

    /// Atomically commit a batch or reject all of it
    fn submit(&mut self, batch: Batch) -> Result<Receipt>;
}

/// In-memory ledger
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    state: LedgerState,
    limits: BatchLimits,
}

impl MemoryLedger {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            state: LedgerState::new(),
            limits,
        }
    }
}

impl Ledger for MemoryLedger {
    fn state(&self) -> &LedgerState {
        &self.state
    }

    fn submit(&mut self, batch: Batch) -> Result<Receipt> {
        self.state.commit(batch, &self.limits)
    }
}
