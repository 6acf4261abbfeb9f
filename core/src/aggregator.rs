//! Homomorphic Aggregator
//!
//! An exponential-ElGamal accumulator in public state. Contributions add
//! componentwise, so the accumulator decrypts to the sum of contributed
//! values no matter the order they landed in.
//!
//! Every operation reads the slots it rewrites; two contributions prepared
//! against the same snapshot conflict at commit with a stale read.

use shade_privacy::{Ciphertext, ElGamalPublicKey, Field};

use crate::action::Action;
use crate::error::{EngineError, Result};
use crate::storage::PublicSlot;

const NAME: &str = "aggregator";

fn key_slot(id: &Field) -> PublicSlot {
    PublicSlot::derive("aggregator.pk", id)
}

fn ciphertext_slot(id: &Field) -> PublicSlot {
    PublicSlot::derive("aggregator.ct", id)
}

/// Store the public key and `Enc(0; r0)`
pub fn init(
    action: &mut Action<'_>,
    id: &Field,
    public_key: &ElGamalPublicKey,
    initial_randomness: &Field,
) -> Result<Ciphertext> {
    if action.read_public(key_slot(id)).is_some() {
        return Err(EngineError::AlreadyInitialized(NAME));
    }
    action.read_public(ciphertext_slot(id));

    let accumulator = Ciphertext::encrypt(public_key, 0, initial_randomness);
    action.write_public(key_slot(id), vec![public_key.to_field()?]);
    action.write_public(ciphertext_slot(id), accumulator.to_fields()?.to_vec());
    Ok(accumulator)
}

/// Add `Enc(value; randomness)` into the accumulator
pub fn contribute(
    action: &mut Action<'_>,
    id: &Field,
    value: u64,
    randomness: &Field,
) -> Result<Ciphertext> {
    let key = action
        .read_public(key_slot(id))
        .ok_or(EngineError::Uninitialized(NAME))?;
    let current = action
        .read_public(ciphertext_slot(id))
        .ok_or(EngineError::Uninitialized(NAME))?;

    let public_key = match key.as_slice() {
        [field] => ElGamalPublicKey::from_field(field)?,
        _ => return Err(EngineError::Uninitialized(NAME)),
    };
    let accumulator = Ciphertext::from_fields(&current)?
        + Ciphertext::encrypt(&public_key, value, randomness);
    action.write_public(ciphertext_slot(id), accumulator.to_fields()?.to_vec());
    Ok(accumulator)
}

pub fn read(action: &Action<'_>, id: &Field) -> Result<Option<Ciphertext>> {
    action
        .peek_public(&ciphertext_slot(id))
        .map(|fields| Ciphertext::from_fields(&fields))
        .transpose()
        .map_err(EngineError::from)
}

pub fn public_key(action: &Action<'_>, id: &Field) -> Result<Option<ElGamalPublicKey>> {
    match action.peek_public(&key_slot(id)).as_deref() {
        Some([field]) => Ok(Some(ElGamalPublicKey::from_field(field)?)),
        _ => Ok(None),
    }
}
