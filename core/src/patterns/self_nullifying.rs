//! Immediate self-nullification
//!
//! Creating the note also spends the `(owner, randomness)` marker, so the
//! same parameters can never produce a second note, even after the first one
//! is consumed.

use shade_privacy::nullifier::derive;
use shade_privacy::{
    Address, ExclusiveNote, Field, Note, NotePayload, Nullifier, NullifierPreimage,
    ShieldedKeyBundle,
};

use super::{exclusive, slots};
use crate::action::Action;
use crate::error::{EngineError, Result};
use crate::storage::NullifierOrigin;

fn marker(owner: &Address, randomness: &Field) -> Nullifier {
    derive(NullifierPreimage::Marker { owner, randomness })
}

/// Whether `(owner, randomness)` has already been used
pub fn are_parameters_nullified(action: &Action<'_>, owner: &Address, randomness: &Field) -> bool {
    action.is_nullified(&marker(owner, randomness))
}

pub fn create(action: &mut Action<'_>, owner: Address, randomness: Field) -> Result<Note> {
    let nullifier = marker(&owner, &randomness);
    if action.is_nullified(&nullifier) {
        return Err(EngineError::DuplicateCommitment {
            slot: slots::SELF_NULLIFYING,
        });
    }
    action.try_consume(nullifier, NullifierOrigin::Marker(Field(nullifier.0)))?;

    let payload = NotePayload::Exclusive(ExclusiveNote { owner, randomness });
    action.insert_note(owner, slots::SELF_NULLIFYING, &payload)
}

pub fn consume(
    action: &mut Action<'_>,
    owner: &ShieldedKeyBundle,
    randomness: &Field,
) -> Result<Note> {
    let key = ExclusiveNote::key_for(&owner.address, randomness);
    exclusive::consume_in(action, owner, slots::SELF_NULLIFYING, &key)
}
