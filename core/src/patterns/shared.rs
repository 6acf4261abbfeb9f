//! Shared-nullifier delegation
//!
//! Two parties each hold a copy of one note. Both copies carry the same
//! shared key, so either party's consume spends the single nullifier both
//! copies depend on.

use shade_privacy::nullifier::derive;
use shade_privacy::{
    Address, Field, Note, NotePayload, NullifierPreimage, SharedNote, shared_key_tag,
};

use super::slots;
use crate::action::Action;
use crate::error::{EngineError, Result};
use crate::storage::NullifierOrigin;

fn live_pair(action: &Action<'_>, owner: &Address, a: &Address, b: &Address) -> Option<Note> {
    action
        .find(Some(owner), slots::SHARED, &SharedNote::key_for(a, b))
        .or_else(|| action.find(Some(owner), slots::SHARED, &SharedNote::key_for(b, a)))
}

fn shared_payload(note: &Note) -> Result<SharedNote> {
    match note.decode()? {
        NotePayload::Shared(shared) => Ok(shared),
        _ => Err(EngineError::NoteNotFound { slot: note.slot }),
    }
}

/// Spend the shared nullifier behind `shared_key`
pub(crate) fn spend_shared_key(action: &mut Action<'_>, shared_key: &Field) -> Result<()> {
    let nullifier = derive(NullifierPreimage::SharedKey(shared_key));
    action.try_consume(nullifier, NullifierOrigin::SharedKey(shared_key_tag(shared_key)))
}

/// Create the pair of copies; returns the shared key
pub fn create(action: &mut Action<'_>, caller: &Address, counterparty: Address) -> Result<Field> {
    if *caller == counterparty {
        return Err(EngineError::InvalidInput("counterparty must differ from caller"));
    }
    let keys = [
        SharedNote::key_for(caller, &counterparty),
        SharedNote::key_for(&counterparty, caller),
    ];
    for owner in [caller, &counterparty] {
        for key in &keys {
            action.require_absent(owner, slots::SHARED, key)?;
        }
    }

    let shared_key = action.fresh_randomness();
    let payload = NotePayload::Shared(SharedNote {
        alice: *caller,
        bob: counterparty,
        shared_key,
    });
    action.insert_note(*caller, slots::SHARED, &payload)?;
    action.insert_note(counterparty, slots::SHARED, &payload)?;
    Ok(shared_key)
}

/// Consume the note shared between `caller` and `other`, from either side
pub fn consume_with(action: &mut Action<'_>, caller: &Address, other: &Address) -> Result<Note> {
    let note = live_pair(action, caller, caller, other).ok_or(EngineError::NoteNotFound {
        slot: slots::SHARED,
    })?;
    let shared = shared_payload(&note)?;
    spend_shared_key(action, &shared.shared_key)?;
    Ok(note)
}

/// Consume the caller's copy carrying `shared_key`
pub fn consume_by_key(action: &mut Action<'_>, caller: &Address, shared_key: &Field) -> Result<Note> {
    let mut found = None;
    for note in action.notes_owned(caller, slots::SHARED) {
        if shared_payload(&note)?.shared_key == *shared_key {
            found = Some(note);
            break;
        }
    }
    let note = found.ok_or(EngineError::NoteNotFound {
        slot: slots::SHARED,
    })?;
    spend_shared_key(action, shared_key)?;
    Ok(note)
}
