mod common;

use std::sync::Arc;

use common::World;
use shade_core::patterns::{minter_address, relay_address, slots};
use shade_core::{CallbackTarget, EngineError, ValueMinter};
use shade_privacy::Address;

fn capped_minter() -> ValueMinter {
    ValueMinter::new(Address::for_component("capped-minter"), 10)
}

#[test]
fn atomic_call_through_relay_credits_beneficiary() {
    let mut w = World::new(30);
    let token = ValueMinter::new(minter_address(), u64::MAX).token();

    w.engine
        .call_atomic(&w.alice, &relay_address(), minter_address(), w.bob.address, 5)
        .unwrap();
    assert_eq!(w.engine.balance_of(&w.bob.address, &token).unwrap(), 5);
}

#[test]
fn failing_target_aborts_the_whole_call() {
    let mut w = World::new(31);
    let minter = capped_minter();
    w.engine.register_target(Arc::new(minter));

    let before = w.fingerprint();
    let err = w
        .engine
        .call_atomic(&w.alice, &relay_address(), minter.address(), w.bob.address, 11)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert_eq!(w.fingerprint(), before);
    assert_eq!(w.engine.balance_of(&w.bob.address, &minter.token()).unwrap(), 0);

    w.engine
        .call_atomic(&w.alice, &relay_address(), minter.address(), w.bob.address, 10)
        .unwrap();
    assert_eq!(w.engine.balance_of(&w.bob.address, &minter.token()).unwrap(), 10);
}

#[test]
fn unknown_target_is_rejected() {
    let mut w = World::new(32);
    let nowhere = Address([7u8; 32]);

    assert_eq!(
        w.engine
            .call_atomic(&w.alice, &relay_address(), nowhere, w.bob.address, 1)
            .unwrap_err(),
        EngineError::UnknownCallbackTarget(nowhere)
    );
    assert_eq!(
        w.engine
            .queue_callback(&w.bob, w.carol.address, nowhere, 1)
            .unwrap_err(),
        EngineError::UnknownCallbackTarget(nowhere)
    );
}

#[test]
fn queued_callback_resolved_by_its_resolver_only() {
    let mut w = World::new(33);
    let token = ValueMinter::new(minter_address(), u64::MAX).token();
    w.engine
        .queue_callback(&w.bob, w.carol.address, minter_address(), 3)
        .unwrap();

    let not_found = EngineError::NoteNotFound {
        slot: slots::PENDING_CALLBACK,
    };
    assert_eq!(w.engine.resolve_callback(&w.bob).unwrap_err(), not_found);

    let pending = w.engine.resolve_callback(&w.carol).unwrap().value;
    assert_eq!(pending.value, 3);
    assert_eq!(pending.beneficiary, w.bob.address);
    assert_eq!(w.engine.balance_of(&w.bob.address, &token).unwrap(), 3);
    assert_eq!(w.engine.resolve_callback(&w.carol).unwrap_err(), not_found);
}

#[test]
fn failed_resolution_keeps_callback_pending() {
    let mut w = World::new(34);
    let minter = capped_minter();
    w.engine.register_target(Arc::new(minter));
    w.engine
        .queue_callback(&w.bob, w.carol.address, minter.address(), 50)
        .unwrap();

    assert!(w.engine.resolve_callback(&w.carol).is_err());
    let still_pending = w
        .engine
        .notes_for(&w.carol)
        .unwrap()
        .into_iter()
        .filter(|(note, _)| note.slot == slots::PENDING_CALLBACK)
        .count();
    assert_eq!(still_pending, 1);
}

#[test]
fn caller_cannot_resolve_own_callback() {
    let mut w = World::new(35);
    let before = w.fingerprint();

    assert_eq!(
        w.engine
            .queue_callback(&w.bob, w.bob.address, minter_address(), 3)
            .unwrap_err(),
        EngineError::InvalidInput("resolver must differ from caller")
    );
    assert_eq!(w.fingerprint(), before);
}
