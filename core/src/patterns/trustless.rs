//! Trustless manager
//!
//! Escrow composed with receipts. A fee deposit creates a receipt for each
//! party (sharing one nullifier) and an escrow controlled by the manager,
//! all under one `random_id`. Either party holding a receipt can settle.

use log::info;

use shade_privacy::{
    Address, AuthWitness, EscrowNote, Field, NotePayload, ReceiptNote, ShieldedKeyBundle, TokenId,
};

use super::{escrow, escrow_address, manager_address, shared, slots};
use crate::action::Action;
use crate::error::{EngineError, Result};

/// Deposit `amount` for `beneficiary`; returns the shared `random_id`
pub fn deposit_fee(
    action: &mut Action<'_>,
    caller: &ShieldedKeyBundle,
    beneficiary: Address,
    amount: u64,
    escrow_component: &Address,
    token: &TokenId,
    witness: &AuthWitness,
) -> Result<Field> {
    if *escrow_component != escrow_address() {
        return Err(EngineError::InvalidInput("unknown escrow component"));
    }
    if caller.address == beneficiary {
        return Err(EngineError::InvalidInput("beneficiary must differ from caller"));
    }
    escrow::fund(action, caller, escrow_component, token, amount, witness)?;

    let manager = manager_address();
    let random_id = action.fresh_randomness();
    let shared_key = action.fresh_randomness();

    let receipt = NotePayload::Receipt(ReceiptNote {
        manager,
        from: caller.address,
        to: beneficiary,
        random_id,
        shared_key,
        token: *token,
        escrow: *escrow_component,
        fee: amount,
    });
    action.insert_note(caller.address, slots::RECEIPT, &receipt)?;
    action.insert_note(beneficiary, slots::RECEIPT, &receipt)?;

    escrow::open_with_id(
        action,
        EscrowNote {
            amount,
            controller: manager,
            random_id,
            token: *token,
            from: caller.address,
            to: beneficiary,
        },
    )?;
    info!("Deposited fee {} from {} for {}", amount, caller.address, beneficiary);
    Ok(random_id)
}

/// Spend both receipts, release the escrow and credit the beneficiary
pub fn settle(
    action: &mut Action<'_>,
    caller: &Address,
    random_id: &Field,
    strict: bool,
) -> Result<ReceiptNote> {
    let note = action
        .find(Some(caller), slots::RECEIPT, &ReceiptNote::key_for(random_id))
        .ok_or(EngineError::NoteNotFound {
            slot: slots::RECEIPT,
        })?;
    let NotePayload::Receipt(receipt) = note.decode()? else {
        return Err(EngineError::NoteNotFound {
            slot: slots::RECEIPT,
        });
    };

    shared::spend_shared_key(action, &receipt.shared_key)?;
    escrow::release(action, &receipt.manager, random_id, &receipt.to, strict)?;
    info!("Settled receipt {} for {}", random_id, receipt.to);
    Ok(receipt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::token;
    use crate::storage::LedgerState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_either_party_settles_once() {
        let mut rng = StdRng::seed_from_u64(31);
        let payer = ShieldedKeyBundle::random(&mut rng);
        let payee = ShieldedKeyBundle::random(&mut rng);
        let token_id = TokenId::new(&payer.address, "FEE");
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        token::credit(&mut action, payer.address, &token_id, 25).unwrap();

        let witness = escrow::authorize(&payer, escrow_address(), &token_id, 25, Field::from_u64(1));
        let id = deposit_fee(
            &mut action,
            &payer,
            payee.address,
            25,
            &escrow_address(),
            &token_id,
            &witness,
        )
        .unwrap();

        let outsider = Address([4u8; 32]);
        assert!(matches!(
            settle(&mut action, &outsider, &id, true),
            Err(EngineError::NoteNotFound { .. })
        ));

        let receipt = settle(&mut action, &payee.address, &id, true).unwrap();
        assert_eq!(receipt.fee, 25);
        assert_eq!(token::balance(&action, &payee.address, &token_id).unwrap(), 25);
        assert_eq!(token::balance(&action, &payer.address, &token_id).unwrap(), 0);
        assert!(settle(&mut action, &payer.address, &id, true).is_err());
    }
}
