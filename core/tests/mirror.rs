mod common;

use common::World;
use shade_core::patterns::slots;
use shade_core::{AuthFailure, EngineError, mirror};

fn live_mirror_notes(w: &World) -> usize {
    w.engine
        .notes_for(&w.bob)
        .unwrap()
        .into_iter()
        .filter(|(note, _)| note.slot == slots::MIRROR)
        .count()
}

#[test]
fn public_value_tracks_private_note() {
    let mut w = World::new(40);
    assert_eq!(w.engine.mirror_public(&w.bob.address), None);

    for value in [10, 25, 0, 7] {
        w.engine.mirror_update(&w.bob, &w.bob.address, value).unwrap();
        assert_eq!(w.engine.mirror_public(&w.bob.address), Some(value));
        assert_eq!(w.engine.mirror_private(&w.bob.address).unwrap(), Some(value));
        assert_eq!(live_mirror_notes(&w), 1);
    }
}

#[test]
fn init_runs_once() {
    let mut w = World::new(41);
    w.engine.mirror_init(&w.bob).unwrap();
    assert_eq!(w.engine.mirror_public(&w.bob.address), Some(0));

    assert_eq!(
        w.engine.mirror_init(&w.bob).unwrap_err(),
        EngineError::AlreadyInitialized("mirror")
    );
    w.engine.mirror_update(&w.bob, &w.bob.address, 4).unwrap();
    assert_eq!(live_mirror_notes(&w), 1);
}

#[test]
fn only_owner_updates() {
    let mut w = World::new(42);
    assert_eq!(
        w.engine
            .mirror_update(&w.alice, &w.bob.address, 3)
            .unwrap_err(),
        EngineError::Unauthorized(AuthFailure::NotOwner)
    );
    assert_eq!(w.engine.mirror_public(&w.bob.address), None);
}

#[test]
fn racing_first_writes_leave_one_note() {
    let mut w = World::new(43);
    let (bob, owner) = (w.bob.clone(), w.bob.address);

    let first = w
        .engine
        .prepare("first", |action, _| mirror::update_private(action, &bob, &owner, 1))
        .unwrap();
    let second = w
        .engine
        .prepare("second", |action, _| mirror::update_private(action, &bob, &owner, 2))
        .unwrap();

    w.engine.submit(second).unwrap();
    assert!(matches!(
        w.engine.submit(first),
        Err(EngineError::AlreadyNullified(_))
    ));
    assert_eq!(live_mirror_notes(&w), 1);
    assert_eq!(w.engine.mirror_public(&owner), Some(2));
    assert_eq!(w.engine.mirror_private(&owner).unwrap(), Some(2));
}
