//! Note Encryption
//!
//! Encrypts a committed note for its owner so the owner can discover notes
//! other parties created for it.
//!
//! ```text
//! Flow:
//! 1. Sender generates ephemeral keypair (epk, esk)
//! 2. Shared secret = ECDH(esk, recipient_viewing_pk)
//! 3. Encryption key = blake3_derive("shade-note-v1", shared || epk)
//! 4. Ciphertext = ChaCha20-Poly1305(key, nonce, plaintext)
//! 5. Output = (commitment, epk, nonce, ciphertext)
//! ```
//!
//! The recipient recomputes the commitment after decrypting and drops the
//! note if it does not match.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit},
};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::commitment::Commitment;
use crate::field::{Address, Field, SlotId};
use crate::note::Note;
use crate::payload::NoteKind;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("invalid symmetric key length")]
    KeyLength,
    #[error("note encryption failed")]
    Seal,
}

/// An encrypted note delivered alongside a commit receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedNote {
    /// Commitment of the plaintext note
    pub commitment: Commitment,
    /// Ephemeral public key for ECDH
    pub ephemeral_pk: [u8; 32],
    /// Nonce for ChaCha20-Poly1305
    pub nonce: [u8; 12],
    /// Encrypted note data with authentication tag
    pub ciphertext: Vec<u8>,
}

impl EncryptedNote {
    /// Size of encrypted note (fixed overhead)
    pub const OVERHEAD: usize = 32 + 12 + 16; // epk + nonce + tag
}

/// Encrypt a note for the holder of `recipient_pk`
pub fn encrypt_note<R: RngCore + CryptoRng>(
    note: &Note,
    recipient_pk: &[u8; 32],
    rng: &mut R,
) -> Result<EncryptedNote, EncryptionError> {
    let ephemeral_secret = EphemeralSecret::random_from_rng(&mut *rng);
    let ephemeral_pk = PublicKey::from(&ephemeral_secret);

    let recipient_key = PublicKey::from(*recipient_pk);
    let shared_secret = ephemeral_secret.diffie_hellman(&recipient_key);
    let encryption_key = derive_note_key(shared_secret.as_bytes(), ephemeral_pk.as_bytes());

    let mut nonce_bytes = [0u8; 12];
    rng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher =
        ChaCha20Poly1305::new_from_slice(&encryption_key).map_err(|_| EncryptionError::KeyLength)?;
    let ciphertext = cipher
        .encrypt(nonce, serialize_plaintext(note).as_slice())
        .map_err(|_| EncryptionError::Seal)?;

    Ok(EncryptedNote {
        commitment: note.commitment,
        ephemeral_pk: *ephemeral_pk.as_bytes(),
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt a note with the recipient's X25519 secret
///
/// Returns `None` if the key is wrong, the ciphertext was tampered with or
/// the decrypted contents do not match the advertised commitment.
pub fn decrypt_note(encrypted: &EncryptedNote, recipient_sk: &[u8; 32]) -> Option<Note> {
    let secret = StaticSecret::from(*recipient_sk);
    let ephemeral_pk = PublicKey::from(encrypted.ephemeral_pk);
    let shared_secret = secret.diffie_hellman(&ephemeral_pk);
    let decryption_key = derive_note_key(shared_secret.as_bytes(), &encrypted.ephemeral_pk);

    let cipher = ChaCha20Poly1305::new_from_slice(&decryption_key).ok()?;
    let nonce = Nonce::from_slice(&encrypted.nonce);
    let plaintext = cipher.decrypt(nonce, encrypted.ciphertext.as_slice()).ok()?;

    let note = deserialize_plaintext(&plaintext)?;
    (note.commitment == encrypted.commitment).then_some(note)
}

/// Derive encryption key from shared secret
fn derive_note_key(shared_secret: &[u8], ephemeral_pk: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("shade-note-v1");
    hasher.update(shared_secret);
    hasher.update(ephemeral_pk);
    *hasher.finalize().as_bytes()
}

/// kind (8) | slot (8) | owner (32) | nonce (32) | len (2) | fields (32 each)
fn serialize_plaintext(note: &Note) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(82 + note.payload.len() * 32);
    bytes.extend_from_slice(&note.kind.tag().to_le_bytes());
    bytes.extend_from_slice(&note.slot.0.to_le_bytes());
    bytes.extend_from_slice(note.owner.as_bytes());
    bytes.extend_from_slice(note.nonce.as_bytes());
    bytes.extend_from_slice(&(note.payload.len() as u16).to_le_bytes());
    for field in &note.payload {
        bytes.extend_from_slice(field.as_bytes());
    }
    bytes
}

fn deserialize_plaintext(bytes: &[u8]) -> Option<Note> {
    if bytes.len() < 82 {
        return None;
    }

    let kind = NoteKind::from_tag(u64::from_le_bytes(bytes[0..8].try_into().ok()?)).ok()?;
    let slot = SlotId(u64::from_le_bytes(bytes[8..16].try_into().ok()?));
    let owner = Address(bytes[16..48].try_into().ok()?);
    let nonce = Field(bytes[48..80].try_into().ok()?);
    let len = u16::from_le_bytes(bytes[80..82].try_into().ok()?) as usize;

    if bytes.len() != 82 + len * 32 {
        return None;
    }

    let payload = bytes[82..]
        .chunks_exact(32)
        .map(|chunk| chunk.try_into().map(Field))
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    let mut note = Note {
        commitment: Commitment([0u8; 32]),
        owner,
        slot,
        kind,
        nonce,
        payload,
    };
    note.commitment = note.recompute_commitment();
    Some(note)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::ShieldedKeyBundle;
    use crate::payload::{NotePayload, TokenId, ValueNote};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn value_note(owner: Address) -> Note {
        let payload = NotePayload::Value(ValueNote {
            owner,
            token: TokenId::new(&Address([7u8; 32]), "FEE"),
            amount: 1000,
            randomness: Field([42u8; 32]),
        });
        Note::new(owner, SlotId(1), &payload, Field::from_u64(3))
    }

    #[test]
    fn test_encrypt_decrypt_note() {
        let mut rng = StdRng::seed_from_u64(11);
        let bob = ShieldedKeyBundle::random(&mut rng);
        let note = value_note(bob.address);

        let encrypted = encrypt_note(&note, &bob.public_keys.viewing_pk, &mut rng).unwrap();
        let decrypted = decrypt_note(&encrypted, &bob.viewing_secret()).expect("decrypts");

        assert_eq!(decrypted, note);
    }

    #[test]
    fn test_wrong_key_fails() {
        let mut rng = StdRng::seed_from_u64(12);
        let bob = ShieldedKeyBundle::random(&mut rng);
        let eve = ShieldedKeyBundle::random(&mut rng);
        let note = value_note(bob.address);

        let encrypted = encrypt_note(&note, &bob.public_keys.viewing_pk, &mut rng).unwrap();
        assert!(decrypt_note(&encrypted, &eve.viewing_secret()).is_none());
    }

    #[test]
    fn test_commitment_verification() {
        let mut rng = StdRng::seed_from_u64(13);
        let bob = ShieldedKeyBundle::random(&mut rng);
        let note = value_note(bob.address);

        let mut encrypted = encrypt_note(&note, &bob.public_keys.viewing_pk, &mut rng).unwrap();
        encrypted.commitment = Commitment([0u8; 32]);
        assert!(decrypt_note(&encrypted, &bob.viewing_secret()).is_none());
    }
}
