//! Note Commitments
//!
//! Poseidon commitments binding a note's kind, owner, slot, nonce and
//! payload.
//!
//! ```text
//! nonce      = Poseidon(NNCE, action_nonce, index)
//! Commitment = Poseidon(NOTE, kind, owner, slot, nonce, payload[0], ...)
//! ```
//!
//! The per-note nonce makes two otherwise identical notes (same owner,
//! same payload) commit to different values, so a note can be recreated
//! after its predecessor was nullified.

use ark_bls12_381::Fr;
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::field::{Address, Field, SlotId};
use crate::poseidon::{domain, hash_with_domain};

/// A note commitment (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Commitment(pub [u8; 32]);

impl Commitment {
    /// Create commitment from field element
    pub fn from_field(f: Fr) -> Self {
        let bytes = f.into_bigint().to_bytes_le();
        let mut arr = [0u8; 32];
        arr[..bytes.len()].copy_from_slice(&bytes);
        Self(arr)
    }

    /// Convert to field element
    pub fn to_field(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.0)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AsRef<[u8]> for Commitment {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({}..)", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Commitment scheme using Poseidon hash
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitmentScheme;

impl CommitmentScheme {
    pub fn new() -> Self {
        Self
    }

    /// Commit to a note
    ///
    /// # Arguments
    /// * `kind_tag` - Payload variant tag
    /// * `owner` - Owning address
    /// * `slot` - Storage slot
    /// * `nonce` - Per-note nonce (see [`CommitmentScheme::note_nonce`])
    /// * `payload` - Encoded payload fields, in order
    pub fn commit(
        &self,
        kind_tag: u64,
        owner: &Address,
        slot: SlotId,
        nonce: &Field,
        payload: &[Field],
    ) -> Commitment {
        let mut inputs = Vec::with_capacity(4 + payload.len());
        inputs.push(Fr::from(kind_tag));
        inputs.push(owner.to_fr());
        inputs.push(slot.to_fr());
        inputs.push(nonce.to_fr());
        inputs.extend(payload.iter().map(Field::to_fr));

        Commitment::from_field(hash_with_domain(domain::NOTE_COMMITMENT, &inputs))
    }

    /// Nonce for the `index`-th note inserted by an action
    pub fn note_nonce(&self, action_nonce: &Field, index: u32) -> Field {
        Field::from_fr(hash_with_domain(
            domain::NOTE_NONCE,
            &[action_nonce.to_fr(), Fr::from(index as u64)],
        ))
    }
}
