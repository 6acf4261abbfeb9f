//! Mirror Synchronizer
//!
//! Keeps a public scalar equal to the value of the owner's single live
//! private note. Every update replaces the note and rewrites the public
//! slot in the same action.
//!
//! The first write also spends an initialization marker, so two racing first
//! writers cannot both leave a live note behind.

use shade_privacy::nullifier::derive;
use shade_privacy::{
    Address, Field, MirrorNote, Note, NotePayload, Nullifier, NullifierPreimage,
    ShieldedKeyBundle,
};

use crate::action::Action;
use crate::error::{AuthFailure, EngineError, Result};
use crate::patterns::{exclusive, slots};
use crate::storage::{NullifierOrigin, PublicSlot};

const PUBLIC_LABEL: &str = "mirror";
/// "MIRR"
const INIT_TAG: u64 = 0x4d49_5252;

pub fn public_slot(owner: &Address) -> PublicSlot {
    PublicSlot::for_owner(PUBLIC_LABEL, owner)
}

fn init_marker(owner: &Address) -> Nullifier {
    derive(NullifierPreimage::Marker {
        owner,
        randomness: &Field::from_u64(INIT_TAG),
    })
}

fn stage_marker(action: &mut Action<'_>, owner: &Address) -> Result<()> {
    let marker = init_marker(owner);
    if action.is_nullified(&marker) {
        return Err(EngineError::AlreadyInitialized("mirror"));
    }
    action.try_consume(marker, NullifierOrigin::Marker(Field(marker.0)))
}

fn write(action: &mut Action<'_>, owner: &Address, value: u64) -> Result<Note> {
    let randomness = action.fresh_randomness();
    let payload = NotePayload::Mirror(MirrorNote {
        value,
        owner: *owner,
        randomness,
    });
    let note = action.insert_note(*owner, slots::MIRROR, &payload)?;
    action.write_public(public_slot(owner), vec![Field::from_u64(value)]);
    Ok(note)
}

pub fn init(action: &mut Action<'_>, caller: &Address, owner: &Address) -> Result<Note> {
    if caller != owner {
        return Err(AuthFailure::NotOwner.into());
    }
    stage_marker(action, owner)?;
    write(action, owner, 0)
}

/// Replace the private note with one holding `value` and publish `value`
pub fn update_private(
    action: &mut Action<'_>,
    caller: &ShieldedKeyBundle,
    owner: &Address,
    value: u64,
) -> Result<Note> {
    if caller.address != *owner {
        return Err(AuthFailure::NotOwner.into());
    }

    let key = MirrorNote::key_for(owner);
    if action.find(Some(owner), slots::MIRROR, &key).is_some() {
        exclusive::consume_in(action, caller, slots::MIRROR, &key)?;
    } else {
        stage_marker(action, owner)?;
    }
    write(action, owner, value)
}

pub fn public_value(action: &Action<'_>, owner: &Address) -> Option<u64> {
    action
        .peek_public(&public_slot(owner))
        .and_then(|value| value.first().and_then(Field::to_u64))
}

pub fn private_value(action: &Action<'_>, owner: &Address) -> Result<Option<u64>> {
    let Some(note) = action.find(Some(owner), slots::MIRROR, &MirrorNote::key_for(owner)) else {
        return Ok(None);
    };
    match note.decode()? {
        NotePayload::Mirror(mirror) => Ok(Some(mirror.value)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_public_tracks_private() {
        let mut rng = StdRng::seed_from_u64(51);
        let owner = ShieldedKeyBundle::random(&mut rng);
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));

        update_private(&mut action, &owner, &owner.address, 5).unwrap();
        update_private(&mut action, &owner, &owner.address, 9).unwrap();

        assert_eq!(public_value(&action, &owner.address), Some(9));
        assert_eq!(private_value(&action, &owner.address).unwrap(), Some(9));
        let key = MirrorNote::key_for(&owner.address);
        assert_eq!(action.find_all(Some(&owner.address), slots::MIRROR, &key).len(), 1);
    }

    #[test]
    fn test_init_once() {
        let owner = Address([1u8; 32]);
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));

        init(&mut action, &owner, &owner).unwrap();
        assert_eq!(public_value(&action, &owner), Some(0));
        assert_eq!(
            init(&mut action, &owner, &owner).unwrap_err(),
            EngineError::AlreadyInitialized("mirror")
        );
    }

    #[test]
    fn test_only_owner_updates() {
        let mut rng = StdRng::seed_from_u64(52);
        let owner = ShieldedKeyBundle::random(&mut rng);
        let other = ShieldedKeyBundle::random(&mut rng);
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));

        assert_eq!(
            update_private(&mut action, &other, &owner.address, 1).unwrap_err(),
            EngineError::Unauthorized(AuthFailure::NotOwner)
        );
    }
}
