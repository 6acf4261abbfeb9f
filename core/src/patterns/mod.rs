//! Pattern Protocols
//!
//! Each protocol is a set of free functions over an [`Action`]: they read the
//! snapshot through it and stage their writes into it. The engine wraps each
//! call in its own action so one protocol operation is one atomic batch.
//!
//! | Slot | Protocol |
//! |------|----------|
//! | 1 | value notes (token balances) |
//! | 2 | exclusive notes |
//! | 3 | self-nullifying notes |
//! | 4 | shared-nullifier notes |
//! | 5 | broadcast copies |
//! | 6 | escrow halves |
//! | 7 | trustless manager receipts |
//! | 8 | pending callbacks |
//! | 9 | mirror notes |
//!
//! [`Action`]: crate::action::Action

use shade_privacy::{Address, SlotId};

pub mod broadcast;
pub mod callback;
pub mod escrow;
pub mod exclusive;
pub mod self_nullifying;
pub mod shared;
pub mod token;
pub mod trustless;

/// Storage slots, one per protocol
pub mod slots {
    use super::SlotId;

    pub const VALUE: SlotId = SlotId(1);
    pub const EXCLUSIVE: SlotId = SlotId(2);
    pub const SELF_NULLIFYING: SlotId = SlotId(3);
    pub const SHARED: SlotId = SlotId(4);
    pub const BROADCAST: SlotId = SlotId(5);
    pub const ESCROW: SlotId = SlotId(6);
    pub const RECEIPT: SlotId = SlotId(7);
    pub const PENDING_CALLBACK: SlotId = SlotId(8);
    pub const MIRROR: SlotId = SlotId(9);
}

/// Escrow component; agent of every escrow witness
pub fn escrow_address() -> Address {
    Address::for_component("escrow")
}

/// Trustless manager component; controller of the escrows it opens
pub fn manager_address() -> Address {
    Address::for_component("trustless-manager")
}

/// Built-in callback relay
pub fn relay_address() -> Address {
    Address::for_component("callback-relay")
}

/// Built-in callback target that mints value notes
pub fn minter_address() -> Address {
    Address::for_component("value-minter")
}
