//! Shade Privacy SDK
//!
//! Note primitives shared by the engine and its clients.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Note                                   │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐  │
//! │  │ owner, slot  │  │ NotePayload  │  │   EncryptedNote       │  │
//! │  │ nonce        │  │ (tagged)     │  │   (for the owner)     │  │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘  │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │              Poseidon (BLS12-381 Fr)                    │    │
//! │  │  • Commitment over kind, owner, slot, nonce, payload    │    │
//! │  │  • Nullifier from owner key, shared key or marker       │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────┘
//!
//!   AuthWitness (Ed25519)          Ciphertext (ElGamal on Jubjub)
//! ```

pub mod authwit;
pub mod commitment;
pub mod elgamal;
pub mod encryption;
pub mod field;
pub mod keys;
pub mod note;
pub mod nullifier;
pub mod payload;
pub mod poseidon;

pub use authwit::{ActionHash, AuthWitness};
pub use commitment::{Commitment, CommitmentScheme};
pub use elgamal::{Ciphertext, ElGamalError, ElGamalPublicKey, ElGamalSecretKey, random_blinding};
pub use encryption::{EncryptedNote, EncryptionError, decrypt_note, encrypt_note};
pub use field::{Address, Field, SlotId};
pub use keys::{PublicKeys, ShieldedKeyBundle, SpendingKey};
pub use note::{Note, NoteValue};
pub use nullifier::{Nullifier, NullifierKey, NullifierPreimage, shared_key_tag};
pub use payload::{
    BroadcastNote, EscrowNote, ExclusiveNote, MirrorNote, NoteKind, NotePayload, PayloadError,
    PendingCallback, ReceiptNote, SharedNote, TokenId, ValueNote,
};
