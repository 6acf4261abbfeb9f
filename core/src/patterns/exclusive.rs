//! Exclusive notes
//!
//! `Uninitialized → Live → Nullified`. At most one live note per
//! `(owner, randomness)`; only the owner's nullifier key can spend it.

use serde::{Deserialize, Serialize};

use shade_privacy::{Address, ExclusiveNote, Field, Note, NotePayload, ShieldedKeyBundle, SlotId};

use super::slots;
use crate::action::Action;
use crate::error::{EngineError, Result};
use crate::storage::NullifierOrigin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteState {
    Uninitialized,
    Live,
    Nullified,
}

pub fn create(action: &mut Action<'_>, owner: Address, randomness: Field) -> Result<Note> {
    let key = ExclusiveNote::key_for(&owner, &randomness);
    action.require_absent(&owner, slots::EXCLUSIVE, &key)?;

    let payload = NotePayload::Exclusive(ExclusiveNote { owner, randomness });
    action.insert_note(owner, slots::EXCLUSIVE, &payload)
}

pub fn consume(action: &mut Action<'_>, owner: &ShieldedKeyBundle, key: &Field) -> Result<Note> {
    consume_in(action, owner, slots::EXCLUSIVE, key)
}

/// Spend the owner's live note under `(slot, key)` with the owner's key
pub(crate) fn consume_in(
    action: &mut Action<'_>,
    owner: &ShieldedKeyBundle,
    slot: SlotId,
    key: &Field,
) -> Result<Note> {
    let note = action
        .find(Some(&owner.address), slot, key)
        .ok_or(EngineError::NoteNotFound { slot })?;

    let nullifier = owner.nullifier_key().derive_nullifier(&note.commitment);
    action.try_consume(nullifier, NullifierOrigin::Note(note.commitment))?;
    Ok(note)
}

pub fn state(action: &Action<'_>, owner: &Address, key: &Field) -> NoteState {
    if action.find(Some(owner), slots::EXCLUSIVE, key).is_some() {
        NoteState::Live
    } else if action.has_history(owner, slots::EXCLUSIVE, key) {
        NoteState::Nullified
    } else {
        NoteState::Uninitialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_lifecycle() {
        let mut rng = StdRng::seed_from_u64(5);
        let owner = ShieldedKeyBundle::random(&mut rng);
        let randomness = Field::from_u64(77);
        let key = ExclusiveNote::key_for(&owner.address, &randomness);
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));

        assert_eq!(super::state(&action, &owner.address, &key), NoteState::Uninitialized);
        create(&mut action, owner.address, randomness).unwrap();
        assert_eq!(super::state(&action, &owner.address, &key), NoteState::Live);
        assert_eq!(
            create(&mut action, owner.address, randomness).unwrap_err(),
            EngineError::DuplicateCommitment {
                slot: slots::EXCLUSIVE
            }
        );

        consume(&mut action, &owner, &key).unwrap();
        assert_eq!(super::state(&action, &owner.address, &key), NoteState::Nullified);
        assert_eq!(
            consume(&mut action, &owner, &key).unwrap_err(),
            EngineError::NoteNotFound {
                slot: slots::EXCLUSIVE
            }
        );
    }

    #[test]
    fn test_other_address_cannot_consume() {
        let mut rng = StdRng::seed_from_u64(6);
        let owner = ShieldedKeyBundle::random(&mut rng);
        let thief = ShieldedKeyBundle::random(&mut rng);
        let randomness = Field::from_u64(1);
        let key = ExclusiveNote::key_for(&owner.address, &randomness);
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));

        create(&mut action, owner.address, randomness).unwrap();
        assert!(matches!(
            consume(&mut action, &thief, &key),
            Err(EngineError::NoteNotFound { .. })
        ));
    }
}
