//! Account Keys
//!
//! Every account is derived from one 32-byte spending key.
//!
//! ```text
//! spending_key ──┬── nk        = Poseidon(NKEY, sk)          (nullifiers)
//!                ├── signer    = Ed25519(sk)                 (witnesses)
//!                └── viewing   = X25519(blake3(sk))          (note delivery)
//!
//! address = SHA-256(signer_pk || viewing_pk)
//! ```

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

use crate::field::Address;
use crate::nullifier::NullifierKey;

/// Spending key - root secret of an account
///
/// Compromise = loss of every note the account owns.
#[derive(Clone)]
pub struct SpendingKey {
    key: [u8; 32],
}

impl SpendingKey {
    /// Generate a random spending key
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut key = [0u8; 32];
        rng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create from raw bytes
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.key
    }

    /// Derive the nullifier key
    pub fn nullifier_key(&self) -> NullifierKey {
        NullifierKey::from_spending_bytes(&self.key)
    }

    /// Derive the Ed25519 signing key used for authorization witnesses
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.key)
    }

    /// Derive the X25519 secret used to receive encrypted notes
    pub fn viewing_secret(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new_derive_key("shade-viewing-key-v1");
        hasher.update(&self.key);
        *hasher.finalize().as_bytes()
    }
}

impl std::fmt::Debug for SpendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SpendingKey(..)")
    }
}

/// Public half of an account, safe to share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeys {
    /// Ed25519 verifying key
    pub signer_pk: [u8; 32],
    /// X25519 public key for note encryption
    pub viewing_pk: [u8; 32],
}

impl PublicKeys {
    /// address = SHA-256(signer_pk || viewing_pk)
    pub fn address(&self) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(self.signer_pk);
        hasher.update(self.viewing_pk);
        Address(hasher.finalize().into())
    }
}

/// Full key bundle for an account
#[derive(Clone)]
pub struct ShieldedKeyBundle {
    /// Spending key (secret)
    pub spending_key: SpendingKey,
    /// Shareable public keys
    pub public_keys: PublicKeys,
    /// Address derived from the public keys
    pub address: Address,
    nullifier_key: NullifierKey,
    signing_key: SigningKey,
}

impl ShieldedKeyBundle {
    /// Generate a new random key bundle
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self::from_spending_key(SpendingKey::random(rng))
    }

    /// Restore from spending key
    pub fn from_spending_key(spending_key: SpendingKey) -> Self {
        let signing_key = spending_key.signing_key();
        let viewing_secret = StaticSecret::from(spending_key.viewing_secret());
        let public_keys = PublicKeys {
            signer_pk: signing_key.verifying_key().to_bytes(),
            viewing_pk: *PublicKey::from(&viewing_secret).as_bytes(),
        };

        Self {
            nullifier_key: spending_key.nullifier_key(),
            address: public_keys.address(),
            public_keys,
            signing_key,
            spending_key,
        }
    }

    pub fn nullifier_key(&self) -> &NullifierKey {
        &self.nullifier_key
    }

    /// X25519 secret for decrypting delivered notes
    pub fn viewing_secret(&self) -> [u8; 32] {
        self.spending_key.viewing_secret()
    }

    /// Sign a message with the account's Ed25519 key
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for ShieldedKeyBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShieldedKeyBundle")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_key_derivation() {
        let mut rng = StdRng::seed_from_u64(1);
        let bundle = ShieldedKeyBundle::random(&mut rng);

        let restored = ShieldedKeyBundle::from_spending_key(SpendingKey::from_bytes(
            *bundle.spending_key.as_bytes(),
        ));

        assert_eq!(bundle.address, restored.address);
        assert_eq!(bundle.public_keys, restored.public_keys);
        assert_eq!(bundle.viewing_secret(), restored.viewing_secret());
    }

    #[test]
    fn test_distinct_accounts_have_distinct_addresses() {
        let mut rng = StdRng::seed_from_u64(2);
        let a = ShieldedKeyBundle::random(&mut rng);
        let b = ShieldedKeyBundle::random(&mut rng);
        assert_ne!(a.address, b.address);
    }

    #[test]
    fn test_address_binds_both_public_keys() {
        let mut rng = StdRng::seed_from_u64(3);
        let bundle = ShieldedKeyBundle::random(&mut rng);

        let mut swapped = bundle.public_keys;
        swapped.viewing_pk = [0u8; 32];
        assert_ne!(swapped.address(), bundle.address);
    }
}
