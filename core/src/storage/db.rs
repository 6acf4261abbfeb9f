use anyhow::{Context, Result as AnyResult};
use log::{debug, info};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;

use super::ledger::{Batch, BatchLimits, Ledger, LedgerState, Receipt, Writes};
use super::note_store::StoredNote;
use super::nullifier_set::NullifierRecord;
use super::public_state::{PublicEntry, PublicSlot};
use crate::error::{RejectReason, Result};

const CF_NOTES: &str = "notes";
const CF_NULLIFIERS: &str = "nullifiers";
const CF_PUBLIC: &str = "public";
const CF_META: &str = "meta";

const HEIGHT_KEY: &[u8] = b"height";

/// Ledger persisted in RocksDB
///
/// The full state is loaded on open and kept in memory; each committed batch
/// is validated, written with a single `WriteBatch`, and only then installed
/// into the in-memory state.
#[derive(Clone)]
pub struct RocksLedger {
    db: Arc<DB>,
    state: LedgerState,
    limits: BatchLimits,
}

impl RocksLedger {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P, limits: BatchLimits) -> AnyResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_NOTES, Options::default()),
            ColumnFamilyDescriptor::new(CF_NULLIFIERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_PUBLIC, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        let mut ledger = Self {
            db: Arc::new(db),
            state: LedgerState::new(),
            limits,
        };
        ledger.restore()?;
        info!(
            "Opened ledger at height {} ({} notes, {} nullifiers)",
            ledger.state.height(),
            ledger.state.notes().len(),
            ledger.state.nullifiers().len()
        );
        Ok(ledger)
    }

    /// Load every column family into memory
    fn restore(&mut self) -> AnyResult<()> {
        let cf = self.db.cf_handle(CF_NOTES).context("notes CF missing")?;
        // Keys are big-endian positions, so iteration is insertion order
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let stored: StoredNote =
                serde_json::from_slice(&value).context("invalid stored note")?;
            self.state.notes_mut().restore(stored);
        }

        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let record: NullifierRecord =
                serde_json::from_slice(&value).context("invalid nullifier record")?;
            self.state.nullifiers_mut().restore(record);
        }

        let cf = self.db.cf_handle(CF_PUBLIC).context("public CF missing")?;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let slot: [u8; 32] = key
                .as_ref()
                .try_into()
                .context("invalid public slot length")?;
            let entry: PublicEntry =
                serde_json::from_slice(&value).context("invalid public entry")?;
            self.state.public_mut().restore(PublicSlot(slot), entry);
        }

        let cf = self.db.cf_handle(CF_META).context("meta CF missing")?;
        if let Some(bytes) = self.db.get_cf(cf, HEIGHT_KEY)? {
            let height: [u8; 8] = bytes
                .as_slice()
                .try_into()
                .context("invalid height length")?;
            self.state.set_height(u64::from_be_bytes(height));
        }

        Ok(())
    }

    /// Write a batch's records in one atomic `WriteBatch`
    fn persist(&self, writes: &Writes) -> AnyResult<()> {
        let mut batch = WriteBatch::default();

        let cf_notes = self.db.cf_handle(CF_NOTES).context("notes CF missing")?;
        let cf_nullifiers = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;
        let cf_public = self.db.cf_handle(CF_PUBLIC).context("public CF missing")?;
        let cf_meta = self.db.cf_handle(CF_META).context("meta CF missing")?;

        for stored in &writes.notes {
            batch.put_cf(
                cf_notes,
                stored.position.to_be_bytes(),
                serde_json::to_vec(stored)?,
            );
        }

        for record in &writes.nullifiers {
            batch.put_cf(cf_nullifiers, record.value.0, serde_json::to_vec(record)?);
        }

        for (slot, entry) in &writes.public {
            batch.put_cf(cf_public, slot.0, serde_json::to_vec(entry)?);
        }

        batch.put_cf(cf_meta, HEIGHT_KEY, writes.tx_id.0.to_be_bytes());

        self.db.write(batch)?;
        Ok(())
    }
}

impl Ledger for RocksLedger {
    fn state(&self) -> &LedgerState {
        &self.state
    }

    fn submit(&mut self, batch: Batch) -> Result<Receipt> {
        let writes = self.state.writes(batch, &self.limits)?;
        self.persist(&writes)
            .map_err(|e| RejectReason::Storage(e.to_string()))?;
        debug!("Persisted tx {}", writes.tx_id.0);
        Ok(self.state.install(writes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NullifierOrigin, PendingNote, PendingNullifier};
    use shade_privacy::{Address, ExclusiveNote, Field, Note, NotePayload, Nullifier, SlotId};
    use tempfile::TempDir;

    fn batch(randomness: u64) -> Batch {
        let owner = Address([3u8; 32]);
        let payload = NotePayload::Exclusive(ExclusiveNote {
            owner,
            randomness: Field::from_u64(randomness),
        });
        let note = Note::new(owner, SlotId(2), &payload, Field::from_u64(randomness));
        let slot = PublicSlot::derive("counter", &Field::ZERO);
        Batch {
            label: "persist".into(),
            notes: vec![PendingNote {
                derived_key: payload.derived_key(),
                origin: NullifierOrigin::Note(note.commitment),
                note,
            }],
            nullifiers: vec![PendingNullifier {
                value: Nullifier([randomness as u8; 32]),
                origin: NullifierOrigin::Marker(Field::from_u64(randomness)),
            }],
            public_writes: vec![(slot, vec![Field::from_u64(randomness)])],
            ..Default::default()
        }
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let mut ledger = RocksLedger::open(dir.path(), BatchLimits::default()).unwrap();
            ledger.submit(batch(1)).unwrap();
            ledger.submit(batch(2)).unwrap();
        }

        let ledger = RocksLedger::open(dir.path(), BatchLimits::default()).unwrap();
        let state = ledger.state();
        assert_eq!(state.height(), 2);
        assert_eq!(state.notes().len(), 2);
        assert!(state.nullifiers().exists(&Nullifier([1u8; 32])));
        assert!(state.nullifiers().exists(&Nullifier([2u8; 32])));

        let slot = PublicSlot::derive("counter", &Field::ZERO);
        assert_eq!(state.public().version(&slot), 2);
        let positions: Vec<u64> = state.notes().iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn test_rejected_batch_not_persisted() {
        let dir = TempDir::new().unwrap();

        {
            let mut ledger = RocksLedger::open(dir.path(), BatchLimits::default()).unwrap();
            ledger.submit(batch(1)).unwrap();
            assert!(ledger.submit(batch(1)).is_err());
        }

        let ledger = RocksLedger::open(dir.path(), BatchLimits::default()).unwrap();
        assert_eq!(ledger.state().height(), 1);
        assert_eq!(ledger.state().notes().len(), 1);
    }

    #[test]
    fn test_reopen_matches_live_state() {
        let dir = TempDir::new().unwrap();
        let slot = PublicSlot::derive("counter", &Field::ZERO);
        let mut twice = batch(1);
        twice.public_writes.push((slot, vec![Field::from_u64(9)]));

        let (height, version, positions) = {
            let mut ledger = RocksLedger::open(dir.path(), BatchLimits::default()).unwrap();
            ledger.submit(twice).unwrap();
            ledger.submit(batch(2)).unwrap();
            let state = ledger.state();
            let positions: Vec<u64> = state.notes().iter().map(|s| s.position).collect();
            (state.height(), state.public().version(&slot), positions)
        };

        let ledger = RocksLedger::open(dir.path(), BatchLimits::default()).unwrap();
        let state = ledger.state();
        assert_eq!(state.height(), height);
        assert_eq!(state.public().version(&slot), version);
        assert_eq!(version, 3);
        let reopened: Vec<u64> = state.notes().iter().map(|s| s.position).collect();
        assert_eq!(reopened, positions);
    }
}
