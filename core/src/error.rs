//! Engine errors
//!
//! Every error is terminal for the action that raised it. Nothing staged by
//! a failed action reaches the ledger.

use shade_privacy::{Address, ElGamalError, Nullifier, PayloadError, SlotId};
use thiserror::Error;

use crate::storage::PublicSlot;

/// Why an authorization check failed
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("witness signature is invalid")]
    BadSignature,
    #[error("witness was signed by a different address")]
    SignerMismatch,
    #[error("witness approves a different agent")]
    AgentMismatch,
    #[error("witness approves a different action")]
    ActionMismatch,
    #[error("witness nonce already consumed")]
    Replayed,
    #[error("caller does not own the note")]
    NotOwner,
    #[error("caller is not a party to the record")]
    NotParty,
    #[error("caller is not the token admin")]
    NotAdmin,
}

/// Why the ledger refused a batch
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("public slot {0} changed since it was read")]
    StaleRead(PublicSlot),
    #[error("batch carries {count} {what}, limit is {limit}")]
    BatchTooLarge {
        what: &'static str,
        count: usize,
        limit: usize,
    },
    #[error("storage failure: {0}")]
    Storage(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("note already exists in slot {slot}")]
    DuplicateCommitment { slot: SlotId },

    #[error("note does not exist in slot {slot}")]
    NoteNotFound { slot: SlotId },

    #[error("nullifier {0} already exists")]
    AlreadyNullified(Nullifier),

    #[error("unauthorized: {0}")]
    Unauthorized(AuthFailure),

    #[error("rejected by ledger: {0}")]
    Rejected(RejectReason),

    #[error("insufficient balance: have {available}, need {needed}")]
    InsufficientBalance { available: u64, needed: u64 },

    #[error("malformed note: {0}")]
    MalformedNote(#[from] PayloadError),

    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(#[from] ElGamalError),

    #[error("no callback target registered at {0}")]
    UnknownCallbackTarget(Address),

    #[error("{0} is not initialized")]
    Uninitialized(&'static str),

    #[error("{0} is already initialized")]
    AlreadyInitialized(&'static str),

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("amount overflow")]
    Overflow,
}

impl From<AuthFailure> for EngineError {
    fn from(failure: AuthFailure) -> Self {
        EngineError::Unauthorized(failure)
    }
}

impl From<RejectReason> for EngineError {
    fn from(reason: RejectReason) -> Self {
        EngineError::Rejected(reason)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
