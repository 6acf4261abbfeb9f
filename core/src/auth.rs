//! Authorization Verifier
//!
//! Delegated actions carry an [`AuthWitness`] signed by the address whose
//! notes are being moved. A witness approves exactly one action hash for one
//! agent; consuming it stages a nullifier over `(signer, nonce)` so the same
//! witness cannot be presented twice.

use log::{debug, warn};

use shade_privacy::nullifier::derive;
use shade_privacy::{ActionHash, Address, AuthWitness, Nullifier, NullifierPreimage};

use crate::action::Action;
use crate::error::{AuthFailure, EngineError, Result};
use crate::storage::{LedgerState, NullifierOrigin};

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationVerifier;

impl AuthorizationVerifier {
    /// Check the witness in isolation: keys, signature, agent and action
    pub fn verify(
        witness: &AuthWitness,
        expected_signer: &Address,
        expected_agent: &Address,
        action_hash: &ActionHash,
    ) -> std::result::Result<(), AuthFailure> {
        if witness.signer != *expected_signer {
            return Err(AuthFailure::SignerMismatch);
        }
        if witness.agent != *expected_agent {
            return Err(AuthFailure::AgentMismatch);
        }
        if witness.action_hash != *action_hash {
            return Err(AuthFailure::ActionMismatch);
        }
        if !witness.verify_signature() {
            return Err(AuthFailure::BadSignature);
        }
        Ok(())
    }

    /// Nullifier that marks the witness as used
    pub fn witness_nullifier(witness: &AuthWitness) -> Nullifier {
        derive(NullifierPreimage::Witness {
            signer: &witness.signer,
            nonce: &witness.nonce,
        })
    }

    /// Valid and not yet consumed against `state`
    pub fn is_valid(
        state: &LedgerState,
        witness: &AuthWitness,
        expected_signer: &Address,
        expected_agent: &Address,
        action_hash: &ActionHash,
    ) -> bool {
        Self::verify(witness, expected_signer, expected_agent, action_hash).is_ok()
            && !state.nullifiers().exists(&Self::witness_nullifier(witness))
    }

    /// Verify the witness and stage its nullifier in `action`
    pub fn consume(
        action: &mut Action<'_>,
        witness: &AuthWitness,
        expected_signer: &Address,
        expected_agent: &Address,
        action_hash: &ActionHash,
    ) -> Result<()> {
        if let Err(failure) = Self::verify(witness, expected_signer, expected_agent, action_hash) {
            warn!("Rejected witness from {}: {}", witness.signer, failure);
            return Err(failure.into());
        }

        let nullifier = Self::witness_nullifier(witness);
        action
            .try_consume(nullifier, NullifierOrigin::Witness(witness.signer))
            .map_err(|err| match err {
                EngineError::AlreadyNullified(_) => AuthFailure::Replayed.into(),
                other => other,
            })?;
        debug!("Accepted witness from {} for {}", witness.signer, witness.agent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use shade_privacy::{Field, ShieldedKeyBundle};

    fn setup() -> (ShieldedKeyBundle, Address, ActionHash, AuthWitness) {
        let mut rng = StdRng::seed_from_u64(11);
        let signer = ShieldedKeyBundle::random(&mut rng);
        let agent = Address::for_component("agent");
        let hash = ActionHash::compute("test.action", &[Field::from_u64(1)]);
        let witness = AuthWitness::sign(&signer, agent, hash, Field::from_u64(99));
        (signer, agent, hash, witness)
    }

    #[test]
    fn test_verify_checks_every_binding() {
        let (signer, agent, hash, witness) = setup();
        assert!(AuthorizationVerifier::verify(&witness, &signer.address, &agent, &hash).is_ok());

        let other = Address([7u8; 32]);
        assert_eq!(
            AuthorizationVerifier::verify(&witness, &other, &agent, &hash),
            Err(AuthFailure::SignerMismatch)
        );
        assert_eq!(
            AuthorizationVerifier::verify(&witness, &signer.address, &other, &hash),
            Err(AuthFailure::AgentMismatch)
        );
        let other_hash = ActionHash::compute("test.action", &[Field::from_u64(2)]);
        assert_eq!(
            AuthorizationVerifier::verify(&witness, &signer.address, &agent, &other_hash),
            Err(AuthFailure::ActionMismatch)
        );
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let (signer, agent, hash, mut witness) = setup();
        witness.signature[0] ^= 1;
        assert_eq!(
            AuthorizationVerifier::verify(&witness, &signer.address, &agent, &hash),
            Err(AuthFailure::BadSignature)
        );
    }

    #[test]
    fn test_consume_twice_in_one_action_is_replay() {
        let (signer, agent, hash, witness) = setup();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));

        AuthorizationVerifier::consume(&mut action, &witness, &signer.address, &agent, &hash)
            .unwrap();
        let err =
            AuthorizationVerifier::consume(&mut action, &witness, &signer.address, &agent, &hash)
                .unwrap_err();
        assert_eq!(err, EngineError::Unauthorized(AuthFailure::Replayed));
    }
}
