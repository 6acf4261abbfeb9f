//! Public State
//!
//! Versioned public slots. Every write bumps the slot's version; batches
//! that read a slot record the version they saw so the ledger can reject
//! them if the slot moved underneath.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use shade_privacy::{Address, Field};

/// Public storage slot
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicSlot(pub [u8; 32]);

impl PublicSlot {
    /// Slot named `label` within the scope of `scope`
    pub fn derive(label: &str, scope: &Field) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("shade-public-slot-v1");
        hasher.update(label.as_bytes());
        hasher.update(scope.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Slot named `label` owned by `owner`
    pub fn for_owner(label: &str, owner: &Address) -> Self {
        Self::derive(label, &owner.to_field())
    }
}

impl fmt::Debug for PublicSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicSlot({})", self)
    }
}

impl fmt::Display for PublicSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..", hex::encode(&self.0[..6]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicEntry {
    pub value: Vec<Field>,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PublicState {
    slots: HashMap<PublicSlot, PublicEntry>,
}

impl PublicState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self, slot: &PublicSlot) -> Option<&PublicEntry> {
        self.slots.get(slot)
    }

    /// Current version; 0 for a slot never written
    pub fn version(&self, slot: &PublicSlot) -> u64 {
        self.slots.get(slot).map_or(0, |entry| entry.version)
    }

    pub fn write(&mut self, slot: PublicSlot, value: Vec<Field>) -> u64 {
        let version = self.version(&slot) + 1;
        self.slots.insert(slot, PublicEntry { value, version });
        version
    }

    pub fn restore(&mut self, slot: PublicSlot, entry: PublicEntry) {
        self.slots.insert(slot, entry);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PublicSlot, &PublicEntry)> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_increase() {
        let mut state = PublicState::new();
        let slot = PublicSlot::derive("counter", &Field::ZERO);
        assert_eq!(state.version(&slot), 0);
        assert!(state.read(&slot).is_none());

        assert_eq!(state.write(slot, vec![Field::from_u64(1)]), 1);
        assert_eq!(state.write(slot, vec![Field::from_u64(2)]), 2);
        assert_eq!(
            state.read(&slot).map(|e| e.value.clone()),
            Some(vec![Field::from_u64(2)])
        );
    }

    #[test]
    fn test_slots_scoped_by_owner() {
        let a = PublicSlot::for_owner("mirror", &Address([1u8; 32]));
        let b = PublicSlot::for_owner("mirror", &Address([2u8; 32]));
        assert_ne!(a, b);
    }
}
