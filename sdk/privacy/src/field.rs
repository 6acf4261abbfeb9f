//! Field Elements and Addresses
//!
//! Every value carried by a note payload is a 32-byte little-endian
//! encoding. It is reduced into the BLS12-381 scalar field only when it
//! is hashed, so addresses and other raw 32-byte values round-trip exactly.
//!
//! ```text
//! Field   = [u8; 32]   // LE bytes, amounts live in the low 8 bytes
//! Address = [u8; 32]   // SHA-256(signer_pk || viewing_pk) for accounts
//!                      // blake3::derive_key(label) for components
//! ```

use ark_bls12_381::Fr;
use ark_ff::{BigInteger, PrimeField};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A payload element
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Field(pub [u8; 32]);

impl Field {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&value.to_le_bytes());
        Self(bytes)
    }

    /// Returns the value as `u64` if the upper 24 bytes are zero
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[8..].iter().any(|b| *b != 0) {
            return None;
        }
        let mut le = [0u8; 8];
        le.copy_from_slice(&self.0[..8]);
        Some(u64::from_le_bytes(le))
    }

    /// Canonical encoding of a scalar field element
    pub fn from_fr(f: Fr) -> Self {
        let bytes = f.into_bigint().to_bytes_le();
        let mut arr = [0u8; 32];
        arr[..bytes.len()].copy_from_slice(&bytes);
        Self(arr)
    }

    /// Reduce into the scalar field
    pub fn to_fr(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.0)
    }

    /// Uniformly random canonical element
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        Self::from_fr(Fr::from_le_bytes_mod_order(&wide))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<u64> for Field {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({})", short_hex(&self.0))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// An account or component address
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    pub const ZERO: Self = Self([0u8; 32]);

    /// Address of a named component (escrow, manager, callback relay)
    pub fn for_component(label: &str) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("shade-component-address-v1");
        hasher.update(label.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn to_field(&self) -> Field {
        Field(self.0)
    }

    pub fn from_field(field: Field) -> Self {
        Self(field.0)
    }

    pub fn to_fr(&self) -> Fr {
        Fr::from_le_bytes_mod_order(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", short_hex(&self.0))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", short_hex(&self.0))
    }
}

/// Storage slot a note lives under
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u64);

impl SlotId {
    pub fn to_fr(self) -> Fr {
        Fr::from(self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn short_hex(bytes: &[u8; 32]) -> String {
    format!("{}..", hex::encode(&bytes[..6]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_u64_roundtrip_and_range() {
        let f = Field::from_u64(1337);
        assert_eq!(f.to_u64(), Some(1337));

        let mut wide = Field::from_u64(1);
        wide.0[20] = 1;
        assert_eq!(wide.to_u64(), None);
    }

    #[test]
    fn test_random_is_canonical() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..16 {
            let f = Field::random(&mut rng);
            assert_eq!(Field::from_fr(f.to_fr()), f);
        }
    }

    #[test]
    fn test_component_addresses_are_distinct() {
        let escrow = Address::for_component("escrow");
        let manager = Address::for_component("trustless-manager");
        assert_ne!(escrow, manager);
        assert_eq!(escrow, Address::for_component("escrow"));
        assert_eq!(Address::from_field(escrow.to_field()), escrow);
    }
}
