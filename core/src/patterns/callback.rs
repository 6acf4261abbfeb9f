//! Callback dispatch
//!
//! Atomic: a relay invokes its target inside the caller's action, so a
//! failure anywhere in the chain discards the whole action.
//!
//! Async: `queue` leaves a [`PendingCallback`] note with a resolver other
//! than the caller, naming the caller as beneficiary. The resolver's later
//! `resolve` consumes it and invokes the target in a second, independent
//! action.

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;

use shade_privacy::{
    Address, Field, NotePayload, PendingCallback, ShieldedKeyBundle, TokenId,
};

use super::{exclusive, minter_address, relay_address, slots, token};
use crate::action::Action;
use crate::error::{EngineError, Result};

/// Arguments passed along a callback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    /// Immediate caller of the target
    pub caller: Address,
    pub beneficiary: Address,
    pub value: u64,
    /// Next hop for relays
    pub callback: Option<Address>,
}

/// A component that can be invoked from inside an action
pub trait CallbackTarget: Send + Sync {
    fn address(&self) -> Address;

    fn invoke(
        &self,
        action: &mut Action<'_>,
        registry: &CallbackRegistry,
        call: &CallContext,
    ) -> Result<()>;
}

#[derive(Default, Clone)]
pub struct CallbackRegistry {
    targets: HashMap<Address, Arc<dyn CallbackTarget>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in relay and value minter
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Relay::new(relay_address())));
        registry.register(Arc::new(ValueMinter::new(minter_address(), u64::MAX)));
        registry
    }

    pub fn register(&mut self, target: Arc<dyn CallbackTarget>) {
        self.targets.insert(target.address(), target);
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.targets.contains_key(address)
    }

    pub fn dispatch(
        &self,
        action: &mut Action<'_>,
        target: &Address,
        call: &CallContext,
    ) -> Result<()> {
        let handler = self
            .targets
            .get(target)
            .ok_or(EngineError::UnknownCallbackTarget(*target))?;
        debug!("Dispatching to {} for {}", target, call.beneficiary);
        handler.invoke(action, self, call)
    }
}

impl std::fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.targets.keys()).finish()
    }
}

/// Forwards the call to `call.callback`
#[derive(Debug, Clone, Copy)]
pub struct Relay {
    address: Address,
}

impl Relay {
    pub fn new(address: Address) -> Self {
        Self { address }
    }
}

impl CallbackTarget for Relay {
    fn address(&self) -> Address {
        self.address
    }

    fn invoke(
        &self,
        action: &mut Action<'_>,
        registry: &CallbackRegistry,
        call: &CallContext,
    ) -> Result<()> {
        let next = call
            .callback
            .ok_or(EngineError::InvalidInput("relay called without a callback"))?;
        registry.dispatch(
            action,
            &next,
            &CallContext {
                caller: self.address,
                callback: None,
                ..*call
            },
        )
    }
}

/// Credits the beneficiary with a value note of the minter's own token
#[derive(Debug, Clone, Copy)]
pub struct ValueMinter {
    address: Address,
    max_value: u64,
}

impl ValueMinter {
    pub const SYMBOL: &'static str = "CALLBACK";

    pub fn new(address: Address, max_value: u64) -> Self {
        Self { address, max_value }
    }

    pub fn token(&self) -> TokenId {
        TokenId::new(&self.address, Self::SYMBOL)
    }
}

impl CallbackTarget for ValueMinter {
    fn address(&self) -> Address {
        self.address
    }

    fn invoke(
        &self,
        action: &mut Action<'_>,
        _registry: &CallbackRegistry,
        call: &CallContext,
    ) -> Result<()> {
        if call.value > self.max_value {
            return Err(EngineError::InvalidInput("value above minter limit"));
        }
        token::mint(
            action,
            &self.address,
            &self.token(),
            Self::SYMBOL,
            call.beneficiary,
            call.value,
        )?;
        Ok(())
    }
}

/// Invoke `relay`, which invokes `target`, inside one action
pub fn call_atomic(
    action: &mut Action<'_>,
    registry: &CallbackRegistry,
    caller: &Address,
    relay: &Address,
    target: Address,
    beneficiary: Address,
    value: u64,
) -> Result<()> {
    registry.dispatch(
        action,
        relay,
        &CallContext {
            caller: *caller,
            beneficiary,
            value,
            callback: Some(target),
        },
    )
}

/// Leave a pending callback for `resolver` that credits the caller once
/// resolved; returns the callback id
pub fn queue(
    action: &mut Action<'_>,
    registry: &CallbackRegistry,
    caller: &Address,
    resolver: Address,
    target: Address,
    value: u64,
) -> Result<Field> {
    if resolver == *caller {
        return Err(EngineError::InvalidInput("resolver must differ from caller"));
    }
    if !registry.contains(&target) {
        return Err(EngineError::UnknownCallbackTarget(target));
    }

    let callback_id = action.fresh_randomness();
    let payload = NotePayload::PendingCallback(PendingCallback {
        allowed_resolver: resolver,
        address_to_callback: target,
        beneficiary: *caller,
        value,
        callback_id,
    });
    action.insert_note(resolver, slots::PENDING_CALLBACK, &payload)?;
    info!("Queued callback to {} for resolver {}", target, resolver);
    Ok(callback_id)
}

/// Consume the resolver's oldest pending callback and invoke its target
pub fn resolve(
    action: &mut Action<'_>,
    registry: &CallbackRegistry,
    resolver: &ShieldedKeyBundle,
) -> Result<PendingCallback> {
    let key = PendingCallback::key_for(&resolver.address);
    let note = exclusive::consume_in(action, resolver, slots::PENDING_CALLBACK, &key)?;
    let NotePayload::PendingCallback(pending) = note.decode()? else {
        return Err(EngineError::NoteNotFound {
            slot: slots::PENDING_CALLBACK,
        });
    };

    registry.dispatch(
        action,
        &pending.address_to_callback,
        &CallContext {
            caller: resolver.address,
            beneficiary: pending.beneficiary,
            value: pending.value,
            callback: None,
        },
    )?;
    Ok(pending)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LedgerState;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn minter_token() -> TokenId {
        ValueMinter::new(minter_address(), u64::MAX).token()
    }

    #[test]
    fn test_relay_reaches_target() {
        let registry = CallbackRegistry::with_builtins();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        let caller = Address([1u8; 32]);
        let beneficiary = Address([2u8; 32]);

        call_atomic(
            &mut action,
            &registry,
            &caller,
            &relay_address(),
            minter_address(),
            beneficiary,
            12,
        )
        .unwrap();
        assert_eq!(token::balance(&action, &beneficiary, &minter_token()).unwrap(), 12);
    }

    #[test]
    fn test_unknown_target() {
        let registry = CallbackRegistry::with_builtins();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        let nowhere = Address([0xaa; 32]);

        let caller = Address([2u8; 32]);
        let err = queue(&mut action, &registry, &caller, Address([1u8; 32]), nowhere, 1)
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownCallbackTarget(nowhere));

        let err = call_atomic(
            &mut action,
            &registry,
            &Address([1u8; 32]),
            &relay_address(),
            nowhere,
            nowhere,
            1,
        )
        .unwrap_err();
        assert_eq!(err, EngineError::UnknownCallbackTarget(nowhere));
    }

    #[test]
    fn test_queue_then_resolve() {
        let mut rng = StdRng::seed_from_u64(41);
        let resolver = ShieldedKeyBundle::random(&mut rng);
        let beneficiary = Address([2u8; 32]);
        let registry = CallbackRegistry::with_builtins();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));

        queue(&mut action, &registry, &beneficiary, resolver.address, minter_address(), 7).unwrap();
        let pending = resolve(&mut action, &registry, &resolver).unwrap();
        assert_eq!(pending.value, 7);
        assert_eq!(pending.beneficiary, beneficiary);
        assert_eq!(token::balance(&action, &beneficiary, &minter_token()).unwrap(), 7);
        assert!(matches!(
            resolve(&mut action, &registry, &resolver),
            Err(EngineError::NoteNotFound { .. })
        ));
    }

    #[test]
    fn test_caller_cannot_resolve_own_callback() {
        let registry = CallbackRegistry::with_builtins();
        let state = LedgerState::new();
        let mut action = Action::new(&state, "t", Field::from_u64(1));
        let caller = Address([1u8; 32]);

        assert_eq!(
            queue(&mut action, &registry, &caller, caller, minter_address(), 3).unwrap_err(),
            EngineError::InvalidInput("resolver must differ from caller")
        );
        assert!(action.batch().notes.is_empty());
    }
}
