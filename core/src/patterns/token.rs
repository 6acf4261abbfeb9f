//! Note-based balances
//!
//! A balance is the sum of the live value notes under `(owner, token)`.
//! Spending consumes whole notes (oldest first) and writes the change back
//! to the owner as a new note.

use log::debug;

use shade_privacy::{Address, Note, NotePayload, ShieldedKeyBundle, TokenId, ValueNote};

use super::slots;
use crate::action::Action;
use crate::error::{AuthFailure, EngineError, Result};
use crate::storage::NullifierOrigin;

fn amount_of(note: &Note) -> Result<u64> {
    match note.decode()? {
        NotePayload::Value(value) => Ok(value.amount),
        _ => Err(EngineError::NoteNotFound { slot: note.slot }),
    }
}

/// Sum of live value notes
pub fn balance(action: &Action<'_>, owner: &Address, token: &TokenId) -> Result<u64> {
    let key = ValueNote::key_for(owner, token);
    action
        .find_all(Some(owner), slots::VALUE, &key)
        .iter()
        .try_fold(0u64, |total, note| {
            total.checked_add(amount_of(note)?).ok_or(EngineError::Overflow)
        })
}

/// Write a value note for `to`
pub fn credit(action: &mut Action<'_>, to: Address, token: &TokenId, amount: u64) -> Result<Note> {
    let randomness = action.fresh_randomness();
    let payload = NotePayload::Value(ValueNote {
        owner: to,
        token: *token,
        amount,
        randomness,
    });
    action.insert_note(to, slots::VALUE, &payload)
}

/// Consume `amount` from `owner`'s balance, returning change to the owner
pub fn debit(
    action: &mut Action<'_>,
    owner: &ShieldedKeyBundle,
    token: &TokenId,
    amount: u64,
) -> Result<()> {
    let key = ValueNote::key_for(&owner.address, token);
    let notes = action.find_all(Some(&owner.address), slots::VALUE, &key);

    let mut gathered = 0u64;
    let mut spent = Vec::new();
    for note in notes {
        if gathered >= amount {
            break;
        }
        gathered = gathered
            .checked_add(amount_of(&note)?)
            .ok_or(EngineError::Overflow)?;
        spent.push(note);
    }
    if gathered < amount {
        return Err(EngineError::InsufficientBalance {
            available: gathered,
            needed: amount,
        });
    }

    for note in &spent {
        let nullifier = owner.nullifier_key().derive_nullifier(&note.commitment);
        action.try_consume(nullifier, NullifierOrigin::Note(note.commitment))?;
    }

    let change = gathered - amount;
    if change > 0 {
        credit(action, owner.address, token, change)?;
    }
    debug!(
        "Debited {} from {} using {} notes (change {})",
        amount,
        owner.address,
        spent.len(),
        change
    );
    Ok(())
}

/// Mint new supply; only the admin the token id is bound to may call this
pub fn mint(
    action: &mut Action<'_>,
    caller: &Address,
    token: &TokenId,
    symbol: &str,
    to: Address,
    amount: u64,
) -> Result<Note> {
    if TokenId::new(caller, symbol) != *token {
        return Err(AuthFailure::NotAdmin.into());
    }
    if amount == 0 {
        return Err(EngineError::InvalidInput("amount must be non-zero"));
    }
    credit(action, to, token, amount)
}

pub fn transfer(
    action: &mut Action<'_>,
    from: &ShieldedKeyBundle,
    to: Address,
    token: &TokenId,
    amount: u64,
) -> Result<()> {
    if amount == 0 {
        return Err(EngineError::InvalidInput("amount must be non-zero"));
    }
    debit(action, from, token, amount)?;
    credit(action, to, token, amount)?;
    Ok(())
}
