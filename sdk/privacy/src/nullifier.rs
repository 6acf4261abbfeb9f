//! Nullifiers
//!
//! Nullifier derivation for at-most-once consumption.
//!
//! ```text
//! Owned     = Poseidon(NULL, nk, commitment)        // only the owner
//! SharedKey = Poseidon(SHAR, shared_key)            // every key holder
//! Marker    = Poseidon(MARK, owner, randomness)     // uniqueness marker
//! Escrow    = Poseidon(ESCR, random_id, holder)     // random id holders
//! Witness   = Poseidon(AUTH, signer, nonce)         // authorization replay
//! ```
//!
//! Once a nullifier is published, whatever it was derived from is spent.

use ark_bls12_381::Fr;
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::commitment::Commitment;
use crate::field::{Address, Field};
use crate::poseidon::{domain, hash_with_domain};

/// A nullifier (32 bytes) - unique tag for spent material
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Nullifier(pub [u8; 32]);

impl Nullifier {
    /// Create from field element
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

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({}..)", hex::encode(&self.0[..6]))
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Nullifier derivation key
///
/// Knowledge of this key is required to derive nullifiers for notes that
/// are spent by their owner alone.
#[derive(Clone)]
pub struct NullifierKey {
    key: [u8; 32],
}

impl NullifierKey {
    /// Derive from spending key bytes: nk = Poseidon(NKEY, sk)
    pub fn from_spending_bytes(spending_key: &[u8; 32]) -> Self {
        let f = hash_with_domain(
            domain::NULLIFIER_KEY,
            &[Fr::from_le_bytes_mod_order(spending_key)],
        );
        Self {
            key: Field::from_fr(f).0,
        }
    }

    /// Nullifier for an owned note
    pub fn derive_nullifier(&self, commitment: &Commitment) -> Nullifier {
        derive(NullifierPreimage::Owned {
            key: self,
            commitment,
        })
    }

    fn to_fr(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.key)
    }
}

impl fmt::Debug for NullifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NullifierKey(..)")
    }
}

/// The secret material a nullifier is derived from
#[derive(Debug, Clone, Copy)]
pub enum NullifierPreimage<'a> {
    /// Owner-held nullifier key over a note commitment
    Owned {
        key: &'a NullifierKey,
        commitment: &'a Commitment,
    },
    /// Key shared by every holder of a note copy
    SharedKey(&'a Field),
    /// `(owner, randomness)` pair marking a payload as used
    Marker {
        owner: &'a Address,
        randomness: &'a Field,
    },
    /// One party's half of an escrow record
    Escrow {
        random_id: &'a Field,
        holder: &'a Address,
    },
    /// Authorization witness nonce
    Witness {
        signer: &'a Address,
        nonce: &'a Field,
    },
}

/// Derive a nullifier
pub fn derive(preimage: NullifierPreimage<'_>) -> Nullifier {
    let f = match preimage {
        NullifierPreimage::Owned { key, commitment } => hash_with_domain(
            domain::NOTE_NULLIFIER,
            &[key.to_fr(), commitment.to_field()],
        ),
        NullifierPreimage::SharedKey(key) => {
            hash_with_domain(domain::SHARED_NULLIFIER, &[key.to_fr()])
        }
        NullifierPreimage::Marker { owner, randomness } => hash_with_domain(
            domain::MARKER_NULLIFIER,
            &[owner.to_fr(), randomness.to_fr()],
        ),
        NullifierPreimage::Escrow { random_id, holder } => hash_with_domain(
            domain::ESCROW_NULLIFIER,
            &[random_id.to_fr(), holder.to_fr()],
        ),
        NullifierPreimage::Witness { signer, nonce } => hash_with_domain(
            domain::WITNESS_NULLIFIER,
            &[signer.to_fr(), nonce.to_fr()],
        ),
    };
    Nullifier::from_field(f)
}

/// Public tag identifying a shared key without revealing it
pub fn shared_key_tag(key: &Field) -> Field {
    Field::from_fr(hash_with_domain(domain::KEY_TAG, &[key.to_fr()]))
}
