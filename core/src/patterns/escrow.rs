//! Escrow release
//!
//! Funds leave the sender's balance and sit in two escrow halves, one held
//! by each party, tied together by a fresh `random_id`. Presenting the id
//! and either party's address releases both halves and credits the
//! recipient.
//!
//! ```text
//!   escrow(A → B, amount)                     release(random_id, B)
//!   ├─ verify A's witness                     ├─ both halves live?
//!   ├─ debit A                                ├─ spend Escrow(id, A), Escrow(id, B)
//!   └─ EscrowNote ×2 (owners A, B)            └─ credit B
//! ```

use log::info;

use shade_privacy::nullifier::derive;
use shade_privacy::{
    ActionHash, Address, AuthWitness, EscrowNote, Field, Note, NotePayload, NullifierPreimage,
    ShieldedKeyBundle, TokenId,
};

use super::{escrow_address, slots, token};
use crate::action::Action;
use crate::auth::AuthorizationVerifier;
use crate::error::{AuthFailure, EngineError, Result};
use crate::storage::NullifierOrigin;

const TRANSFER_TO_ESCROW: &str = "token.transfer_to_escrow";

/// Action hash a sender signs to move funds into escrow through `agent`
pub fn transfer_hash(
    from: &Address,
    agent: &Address,
    amount: u64,
    token: &TokenId,
    nonce: &Field,
) -> ActionHash {
    ActionHash::compute(
        TRANSFER_TO_ESCROW,
        &[
            from.to_field(),
            agent.to_field(),
            Field::from_u64(amount),
            token.0,
            *nonce,
        ],
    )
}

/// Witness letting `agent` move `amount` of `token` out of `from`'s balance
pub fn authorize(
    from: &ShieldedKeyBundle,
    agent: Address,
    token: &TokenId,
    amount: u64,
    nonce: Field,
) -> AuthWitness {
    let hash = transfer_hash(&from.address, &agent, amount, token, &nonce);
    AuthWitness::sign(from, agent, hash, nonce)
}

/// Check the sender's witness for `agent` and debit the amount
pub(crate) fn fund(
    action: &mut Action<'_>,
    from: &ShieldedKeyBundle,
    agent: &Address,
    token: &TokenId,
    amount: u64,
    witness: &AuthWitness,
) -> Result<()> {
    if amount == 0 {
        return Err(EngineError::InvalidInput("amount must be non-zero"));
    }
    let hash = transfer_hash(&from.address, agent, amount, token, &witness.nonce);
    AuthorizationVerifier::consume(action, witness, &from.address, agent, &hash)?;
    token::debit(action, from, token, amount)
}

/// Create both halves under an id chosen by the caller
pub fn open_with_id(action: &mut Action<'_>, record: EscrowNote) -> Result<()> {
    let key = EscrowNote::key_for(&record.random_id);
    if action.find(None, slots::ESCROW, &key).is_some() {
        return Err(EngineError::DuplicateCommitment {
            slot: slots::ESCROW,
        });
    }

    let payload = NotePayload::Escrow(record);
    action.insert_note(record.from, slots::ESCROW, &payload)?;
    action.insert_note(record.to, slots::ESCROW, &payload)?;
    Ok(())
}

/// Lock `amount` from `from` for `to`; returns the escrow id
pub fn escrow(
    action: &mut Action<'_>,
    caller: &ShieldedKeyBundle,
    from: &Address,
    to: Address,
    token: &TokenId,
    amount: u64,
    witness: &AuthWitness,
) -> Result<Field> {
    if caller.address != *from {
        return Err(AuthFailure::NotOwner.into());
    }
    if *from == to {
        return Err(EngineError::InvalidInput("escrow parties must differ"));
    }

    let agent = escrow_address();
    fund(action, caller, &agent, token, amount, witness)?;

    let random_id = action.fresh_randomness();
    open_with_id(
        action,
        EscrowNote {
            amount,
            controller: agent,
            random_id,
            token: *token,
            from: *from,
            to,
        },
    )?;
    info!("Escrowed {} from {} to {}", amount, from, to);
    Ok(random_id)
}

/// Both live halves of an escrow, sender's first
pub fn halves(action: &Action<'_>, random_id: &Field) -> Result<Option<(EscrowNote, Note, Note)>> {
    let notes = action.find_all(None, slots::ESCROW, &EscrowNote::key_for(random_id));
    let Some(first) = notes.first() else {
        return Ok(None);
    };
    let NotePayload::Escrow(record) = first.decode()? else {
        return Ok(None);
    };

    let half = |owner: &Address| notes.iter().find(|n| n.owner == *owner).cloned();
    Ok(match (half(&record.from), half(&record.to)) {
        (Some(from), Some(to)) => Some((record, from, to)),
        _ => None,
    })
}

/// Spend both halves and credit the recipient
///
/// With `strict` set, only a party or the controlling component may release.
pub fn release(
    action: &mut Action<'_>,
    caller: &Address,
    random_id: &Field,
    counterparty: &Address,
    strict: bool,
) -> Result<EscrowNote> {
    let not_found = EngineError::NoteNotFound {
        slot: slots::ESCROW,
    };
    let (record, from_half, to_half) = halves(action, random_id)?.ok_or(not_found.clone())?;

    if *counterparty != record.from && *counterparty != record.to {
        return Err(not_found);
    }
    if strict && ![record.from, record.to, record.controller].contains(caller) {
        return Err(AuthFailure::NotParty.into());
    }

    for half in [&from_half, &to_half] {
        let nullifier = derive(NullifierPreimage::Escrow {
            random_id,
            holder: &half.owner,
        });
        action.try_consume(nullifier, NullifierOrigin::Note(half.commitment))?;
    }

    token::credit(action, record.to, &record.token, record.amount)?;
    info!("Released escrow of {} to {}", record.amount, record.to);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    struct Fixture {
        alice: ShieldedKeyBundle,
        bob: ShieldedKeyBundle,
        token: TokenId,
    }

    fn fixture() -> Fixture {
        let mut rng = StdRng::seed_from_u64(21);
        let alice = ShieldedKeyBundle::random(&mut rng);
        let bob = ShieldedKeyBundle::random(&mut rng);
        let token = TokenId::new(&alice.address, "GOLD");
        Fixture { alice, bob, token }
    }

    #[test]
    fn test_escrow_and_release_in_one_action() {
        let f = fixture();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        token::credit(&mut action, f.alice.address, &f.token, 100).unwrap();

        let witness = authorize(&f.alice, escrow_address(), &f.token, 40, Field::from_u64(5));
        let id = escrow(
            &mut action,
            &f.alice,
            &f.alice.address,
            f.bob.address,
            &f.token,
            40,
            &witness,
        )
        .unwrap();
        assert_eq!(token::balance(&action, &f.alice.address, &f.token).unwrap(), 60);
        assert!(halves(&action, &id).unwrap().is_some());

        release(&mut action, &f.bob.address, &id, &f.bob.address, true).unwrap();
        assert_eq!(token::balance(&action, &f.bob.address, &f.token).unwrap(), 40);
        assert!(halves(&action, &id).unwrap().is_none());
        assert!(matches!(
            release(&mut action, &f.bob.address, &id, &f.bob.address, false),
            Err(EngineError::NoteNotFound { .. })
        ));
    }

    #[test]
    fn test_caller_must_be_sender() {
        let f = fixture();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        let witness = authorize(&f.alice, escrow_address(), &f.token, 10, Field::from_u64(5));

        let err = escrow(
            &mut action,
            &f.bob,
            &f.alice.address,
            f.bob.address,
            &f.token,
            10,
            &witness,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::Unauthorized(AuthFailure::NotOwner));
    }

    #[test]
    fn test_witness_must_match_amount() {
        let f = fixture();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        token::credit(&mut action, f.alice.address, &f.token, 100).unwrap();
        let witness = authorize(&f.alice, escrow_address(), &f.token, 10, Field::from_u64(5));

        let err = escrow(
            &mut action,
            &f.alice,
            &f.alice.address,
            f.bob.address,
            &f.token,
            20,
            &witness,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::Unauthorized(AuthFailure::ActionMismatch));
    }

    #[test]
    fn test_strict_release_rejects_outsider() {
        let f = fixture();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        token::credit(&mut action, f.alice.address, &f.token, 10).unwrap();
        let witness = authorize(&f.alice, escrow_address(), &f.token, 10, Field::from_u64(5));
        let id = escrow(
            &mut action,
            &f.alice,
            &f.alice.address,
            f.bob.address,
            &f.token,
            10,
            &witness,
        )
        .unwrap();

        let outsider = Address([0xee; 32]);
        assert_eq!(
            release(&mut action, &outsider, &id, &f.bob.address, true).unwrap_err(),
            EngineError::Unauthorized(AuthFailure::NotParty)
        );
        assert!(matches!(
            release(&mut action, &outsider, &id, &outsider, false),
            Err(EngineError::NoteNotFound { .. })
        ));
        release(&mut action, &outsider, &id, &f.alice.address, false).unwrap();
    }
}
