//! Notes
//!
//! A Note is an immutable committed record owned by an address under a
//! storage slot.
//!
//! ```text
//! Note = {
//!     commitment: [u8; 32],   // Poseidon over everything below
//!     owner:      Address,
//!     slot:       SlotId,
//!     kind:       NoteKind,   // payload variant tag
//!     nonce:      Field,      // unique per inserted note
//!     payload:    Vec<Field>,
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::commitment::{Commitment, CommitmentScheme};
use crate::field::{Address, Field, SlotId};
use crate::payload::{NoteKind, NotePayload, PayloadError};

/// A committed note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub commitment: Commitment,
    pub owner: Address,
    pub slot: SlotId,
    pub kind: NoteKind,
    pub nonce: Field,
    pub payload: Vec<Field>,
}

impl Note {
    /// Build a note and compute its commitment
    pub fn new(owner: Address, slot: SlotId, payload: &NotePayload, nonce: Field) -> Self {
        let kind = payload.kind();
        let fields = payload.to_fields();
        let commitment =
            CommitmentScheme::new().commit(kind.tag(), &owner, slot, &nonce, &fields);

        Self {
            commitment,
            owner,
            slot,
            kind,
            nonce,
            payload: fields,
        }
    }

    /// Recompute the commitment from the note's contents
    pub fn recompute_commitment(&self) -> Commitment {
        CommitmentScheme::new().commit(
            self.kind.tag(),
            &self.owner,
            self.slot,
            &self.nonce,
            &self.payload,
        )
    }

    /// Decode the payload into its tagged variant
    pub fn decode(&self) -> Result<NotePayload, PayloadError> {
        NotePayload::decode(self.kind, &self.payload)
    }

    /// Derived key of the decoded payload
    pub fn derived_key(&self) -> Result<Field, PayloadError> {
        Ok(self.decode()?.derived_key())
    }
}

/// Note value with overflow protection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NoteValue(pub u64);

impl NoteValue {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Checked addition
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }
}
