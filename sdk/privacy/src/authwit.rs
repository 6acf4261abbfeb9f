//! Authorization Witnesses
//!
//! A signer approves exactly one action, identified by its hash, for
//! exactly one agent. The witness is a self-contained signed message that
//! is handed to the agent.
//!
//! ```text
//! action_hash = blake3_derive("shade-action-v1", label || parts...)
//! message     = blake3_derive("shade-authwit-v1", agent || action_hash || nonce)
//! signature   = Ed25519(signer_sk, message)
//! ```
//!
//! Replay protection lives in the ledger: consuming a witness publishes the
//! nullifier `Poseidon(AUTH, signer, nonce)`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::field::{Address, Field};
use crate::keys::{PublicKeys, ShieldedKeyBundle};

/// Hash identifying one concrete action
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionHash(pub [u8; 32]);

impl ActionHash {
    /// Hash a labelled action and its ordered arguments
    pub fn compute(label: &str, parts: &[Field]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key("shade-action-v1");
        hasher.update(&(label.len() as u32).to_le_bytes());
        hasher.update(label.as_bytes());
        for part in parts {
            hasher.update(part.as_bytes());
        }
        Self(*hasher.finalize().as_bytes())
    }
}

impl fmt::Debug for ActionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionHash({}..)", hex::encode(&self.0[..6]))
    }
}

/// Signed approval of one action for one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthWitness {
    pub signer: Address,
    pub signer_keys: PublicKeys,
    pub agent: Address,
    pub action_hash: ActionHash,
    pub nonce: Field,
    /// Ed25519 signature (64 bytes)
    pub signature: Vec<u8>,
}

impl AuthWitness {
    /// Sign an approval for `agent` to perform `action_hash`
    pub fn sign(
        signer: &ShieldedKeyBundle,
        agent: Address,
        action_hash: ActionHash,
        nonce: Field,
    ) -> Self {
        let message = signing_message(&agent, &action_hash, &nonce);
        Self {
            signer: signer.address,
            signer_keys: signer.public_keys,
            agent,
            action_hash,
            nonce,
            signature: signer.sign(&message).to_vec(),
        }
    }

    /// Check that the signer keys match the claimed address and that the
    /// signature covers `(agent, action_hash, nonce)`
    pub fn verify_signature(&self) -> bool {
        if self.signer_keys.address() != self.signer {
            return false;
        }
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.signer_keys.signer_pk) else {
            return false;
        };
        let Ok(bytes) = <[u8; 64]>::try_from(self.signature.as_slice()) else {
            return false;
        };
        let signature = Signature::from_bytes(&bytes);
        let message = signing_message(&self.agent, &self.action_hash, &self.nonce);
        verifying_key.verify(&message, &signature).is_ok()
    }
}

fn signing_message(agent: &Address, action_hash: &ActionHash, nonce: &Field) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key("shade-authwit-v1");
    hasher.update(agent.as_bytes());
    hasher.update(&action_hash.0);
    hasher.update(nonce.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn witness(rng: &mut StdRng) -> (ShieldedKeyBundle, AuthWitness) {
        let alice = ShieldedKeyBundle::random(rng);
        let action = ActionHash::compute("transfer", &[Field::from_u64(10)]);
        let w = AuthWitness::sign(&alice, Address::for_component("escrow"), action, Field::from_u64(1));
        (alice, w)
    }

    #[test]
    fn test_valid_witness_verifies() {
        let mut rng = StdRng::seed_from_u64(31);
        let (alice, w) = witness(&mut rng);
        assert_eq!(w.signer, alice.address);
        assert!(w.verify_signature());
    }

    #[test]
    fn test_tampered_fields_fail() {
        let mut rng = StdRng::seed_from_u64(32);
        let (_, w) = witness(&mut rng);

        let mut other_agent = w.clone();
        other_agent.agent = Address::for_component("manager");
        assert!(!other_agent.verify_signature());

        let mut other_action = w.clone();
        other_action.action_hash = ActionHash::compute("transfer", &[Field::from_u64(11)]);
        assert!(!other_action.verify_signature());

        let mut other_nonce = w.clone();
        other_nonce.nonce = Field::from_u64(2);
        assert!(!other_nonce.verify_signature());
    }

    #[test]
    fn test_impersonation_fails() {
        let mut rng = StdRng::seed_from_u64(33);
        let (_, mut w) = witness(&mut rng);
        let mallory = ShieldedKeyBundle::random(&mut rng);
        w.signer = mallory.address;
        assert!(!w.verify_signature());
    }

    #[test]
    fn test_action_hash_separates_labels() {
        let parts = [Field::from_u64(1)];
        assert_ne!(
            ActionHash::compute("escrow", &parts),
            ActionHash::compute("release", &parts)
        );
    }
}
