//! Shade Core
//!
//! Note-based private state with nullifier-gated consumption.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Engine                             │
//! │   one protocol operation = one Action = one Batch            │
//! └──────────────┬───────────────────────────────┬───────────────┘
//!                │                               │
//!   ┌────────────▼────────────┐      ┌───────────▼────────────┐
//!   │  patterns / mirror /    │      │ AuthorizationVerifier  │
//!   │  aggregator             │─────►│ (signed witnesses)     │
//!   └────────────┬────────────┘      └────────────────────────┘
//!                │ stage notes, nullifiers, public writes
//!   ┌────────────▼──────────────────────────────────────────────┐
//!   │  Ledger::submit(batch): validate everything, then apply   │
//!   │  NoteStore │ NullifierSet │ PublicState                   │
//!   └───────────────────────────────────────────────────────────┘
//! ```

pub mod action;
pub mod aggregator;
pub mod auth;
pub mod config;
pub mod engine;
pub mod error;
pub mod mirror;
pub mod patterns;
pub mod storage;

pub use action::Action;
pub use auth::AuthorizationVerifier;
pub use config::EngineConfig;
pub use engine::{Committed, Engine, Prepared};
pub use error::{AuthFailure, EngineError, RejectReason, Result};
pub use patterns::callback::{CallContext, CallbackRegistry, CallbackTarget, Relay, ValueMinter};
pub use patterns::exclusive::NoteState;
#[cfg(feature = "rocksdb")]
pub use storage::RocksLedger;
pub use storage::{Batch, BatchLimits, Ledger, LedgerState, MemoryLedger, Receipt, TxId};
