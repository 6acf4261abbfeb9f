//! Broadcast notes
//!
//! One copy per recipient, all carrying a fresh shared key. The first
//! recipient to consume spends the shared nullifier, after which no copy is
//! visible to anyone.

use std::collections::HashSet;

use shade_privacy::{Address, BroadcastNote, Field, Note, NotePayload};

use super::{shared, slots};
use crate::action::Action;
use crate::error::{EngineError, Result};

/// Create one copy per recipient; returns the shared key
pub fn broadcast(
    action: &mut Action<'_>,
    creator: &Address,
    recipients: &[Address],
    max_recipients: usize,
) -> Result<Field> {
    if recipients.is_empty() {
        return Err(EngineError::InvalidInput("broadcast needs at least one recipient"));
    }
    if recipients.len() > max_recipients {
        return Err(EngineError::InvalidInput("too many broadcast recipients"));
    }
    let distinct: HashSet<_> = recipients.iter().collect();
    if distinct.len() != recipients.len() {
        return Err(EngineError::InvalidInput("duplicate broadcast recipient"));
    }

    let shared_key = action.fresh_randomness();
    let payload = NotePayload::Broadcast(BroadcastNote {
        creator: *creator,
        shared_key,
    });
    for recipient in recipients {
        action.insert_note(*recipient, slots::BROADCAST, &payload)?;
    }
    Ok(shared_key)
}

/// The recipient's live copy, if any copy is still unspent
pub fn find(action: &Action<'_>, recipient: &Address, shared_key: &Field) -> Option<Note> {
    action.find(
        Some(recipient),
        slots::BROADCAST,
        &BroadcastNote::key_for(shared_key),
    )
}

pub fn consume(action: &mut Action<'_>, caller: &Address, shared_key: &Field) -> Result<Note> {
    let note = find(action, caller, shared_key).ok_or(EngineError::NoteNotFound {
        slot: slots::BROADCAST,
    })?;
    shared::spend_shared_key(action, shared_key)?;
    Ok(note)
}
