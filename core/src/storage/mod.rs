//! Ledger storage: note store, nullifier set, public state and the ledger
//! that commits batches against them.

#[cfg(feature = "rocksdb")]
pub mod db;
pub mod ledger;
pub mod note_store;
pub mod nullifier_set;
pub mod public_state;

#[cfg(feature = "rocksdb")]
pub use db::RocksLedger;
pub use ledger::{
    Batch, BatchLimits, Ledger, LedgerState, MemoryLedger, PendingNote, PendingNullifier, Receipt,
    TxId, Writes,
};
pub use note_store::{CommitmentRef, NoteStore, StoredNote};
pub use nullifier_set::{NullifierOrigin, NullifierRecord, NullifierSet};
pub use public_state::{PublicEntry, PublicSlot, PublicState};
