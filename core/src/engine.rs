//! Engine
//!
//! Facade that runs each protocol operation as one action against the
//! current ledger snapshot and submits the resulting batch.
//!
//! ```text
//!   Engine::escrow(..)
//!        │
//!        ▼
//!   prepare ── Action::new(snapshot, nonce) ── protocol fn stages writes
//!        │
//!        ▼
//!   submit ── Ledger::submit(batch) ── Receipt
//!        │
//!        ▼
//!   encrypt every new note to its registered owner
//! ```
//!
//! `prepare` and `submit` are public so callers can build several batches
//! against one snapshot and observe how the ledger orders them.

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;

use shade_privacy::{
    ActionHash, Address, AuthWitness, Ciphertext, ElGamalPublicKey, EncryptedNote, EscrowNote,
    Field, Note, NotePayload, PendingCallback, PublicKeys, ReceiptNote, ShieldedKeyBundle, SlotId,
    TokenId, encrypt_note,
};

use crate::action::Action;
use crate::aggregator;
use crate::auth::AuthorizationVerifier;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::mirror;
use crate::patterns::callback::{self, CallbackRegistry, CallbackTarget};
use crate::patterns::exclusive::{self, NoteState};
use crate::patterns::{broadcast, escrow, self_nullifying, shared, token, trustless};
use crate::storage::{Batch, Ledger, LedgerState, MemoryLedger, Receipt};

/// Result of a committed operation
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    pub receipt: Receipt,
    /// New notes encrypted to their registered owners
    pub encrypted_notes: Vec<EncryptedNote>,
}

/// An action evaluated but not yet submitted
#[derive(Debug, Clone)]
pub struct Prepared<T> {
    pub value: T,
    pub batch: Batch,
}

pub struct Engine<L: Ledger = MemoryLedger> {
    ledger: L,
    config: EngineConfig,
    callbacks: CallbackRegistry,
    directory: HashMap<Address, PublicKeys>,
    rng: StdRng,
}

impl Engine<MemoryLedger> {
    pub fn new(config: EngineConfig) -> Self {
        let ledger = MemoryLedger::new(config.limits);
        Self::with_ledger(ledger, config)
    }
}

impl<L: Ledger> Engine<L> {
    pub fn with_ledger(ledger: L, config: EngineConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            ledger,
            config,
            callbacks: CallbackRegistry::with_builtins(),
            directory: HashMap::new(),
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn state(&self) -> &LedgerState {
        self.ledger.state()
    }

    /// Publish an account's keys so notes created for it are delivered
    pub fn register(&mut self, keys: PublicKeys) -> Address {
        let address = keys.address();
        self.directory.insert(address, keys);
        address
    }

    pub fn register_target(&mut self, target: Arc<dyn CallbackTarget>) {
        info!("Registered callback target {}", target.address());
        self.callbacks.register(target);
    }

    // ------------------------------------------------------------------
    // Action lifecycle
    // ------------------------------------------------------------------

    /// Evaluate `f` against the current snapshot without submitting
    pub fn prepare<T, F>(&mut self, label: &str, f: F) -> Result<Prepared<T>>
    where
        F: FnOnce(&mut Action<'_>, &CallbackRegistry) -> Result<T>,
    {
        let nonce = Field::random(&mut self.rng);
        let mut action = Action::new(self.ledger.state(), label, nonce);
        let value = f(&mut action, &self.callbacks)?;
        Ok(Prepared {
            value,
            batch: action.into_batch(),
        })
    }

    /// Submit a prepared action
    pub fn submit<T>(&mut self, prepared: Prepared<T>) -> Result<Committed<T>> {
        let receipt = self.ledger.submit(prepared.batch)?;
        let encrypted_notes = self.deliver(&receipt);
        Ok(Committed {
            value: prepared.value,
            receipt,
            encrypted_notes,
        })
    }

    pub fn execute<T, F>(&mut self, label: &str, f: F) -> Result<Committed<T>>
    where
        F: FnOnce(&mut Action<'_>, &CallbackRegistry) -> Result<T>,
    {
        let prepared = self.prepare(label, f)?;
        self.submit(prepared)
    }

    /// Read-only view of the current snapshot
    fn view(&self) -> Action<'_> {
        Action::new(self.ledger.state(), "view", Field::ZERO)
    }

    fn deliver(&mut self, receipt: &Receipt) -> Vec<EncryptedNote> {
        let state = self.ledger.state();
        let mut delivered = Vec::new();
        for reference in &receipt.commitments {
            let Some(stored) = state.notes().get(&reference.commitment) else {
                continue;
            };
            let Some(keys) = self.directory.get(&stored.note.owner) else {
                continue;
            };
            match encrypt_note(&stored.note, &keys.viewing_pk, &mut self.rng) {
                Ok(encrypted) => delivered.push(encrypted),
                Err(e) => warn!("Could not encrypt note {}: {}", reference.commitment, e),
            }
        }
        delivered
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn query_note(&self, owner: &Address, slot: SlotId, key: &Field) -> Option<Note> {
        self.state().query_note(owner, slot, key).cloned()
    }

    /// Live notes visible to the holder of `keys`, decoded
    pub fn notes_for(&self, keys: &ShieldedKeyBundle) -> Result<Vec<(Note, NotePayload)>> {
        let state = self.state();
        state
            .notes()
            .owned_by(&keys.address, state.nullifiers())
            .into_iter()
            .map(|stored| Ok((stored.note.clone(), stored.note.decode()?)))
            .collect()
    }

    /// Valid, addressed to `agent`, and not yet consumed
    pub fn verify_witness(
        &self,
        witness: &AuthWitness,
        signer: &Address,
        agent: &Address,
        action_hash: &ActionHash,
    ) -> bool {
        AuthorizationVerifier::is_valid(self.state(), witness, signer, agent, action_hash)
    }

    pub fn balance_of(&self, owner: &Address, token_id: &TokenId) -> Result<u64> {
        token::balance(&self.view(), owner, token_id)
    }

    pub fn exclusive_state(&self, owner: &Address, key: &Field) -> NoteState {
        exclusive::state(&self.view(), owner, key)
    }

    pub fn are_parameters_nullified(&self, owner: &Address, randomness: &Field) -> bool {
        self_nullifying::are_parameters_nullified(&self.view(), owner, randomness)
    }

    pub fn broadcast_find(&self, recipient: &Address, shared_key: &Field) -> Option<Note> {
        broadcast::find(&self.view(), recipient, shared_key)
    }

    pub fn mirror_public(&self, owner: &Address) -> Option<u64> {
        mirror::public_value(&self.view(), owner)
    }

    pub fn mirror_private(&self, owner: &Address) -> Result<Option<u64>> {
        mirror::private_value(&self.view(), owner)
    }

    pub fn aggregator_read(&self, id: &Field) -> Result<Option<Ciphertext>> {
        aggregator::read(&self.view(), id)
    }

    // ------------------------------------------------------------------
    // Protocol operations
    // ------------------------------------------------------------------

    pub fn mint(
        &mut self,
        admin: &ShieldedKeyBundle,
        token_id: &TokenId,
        symbol: &str,
        to: Address,
        amount: u64,
    ) -> Result<Committed<Note>> {
        self.execute("token.mint", |action, _| {
            token::mint(action, &admin.address, token_id, symbol, to, amount)
        })
    }

    pub fn transfer(
        &mut self,
        from: &ShieldedKeyBundle,
        to: Address,
        token_id: &TokenId,
        amount: u64,
    ) -> Result<Committed<()>> {
        self.execute("token.transfer", |action, _| {
            token::transfer(action, from, to, token_id, amount)
        })
    }

    pub fn exclusive_create(&mut self, owner: Address, randomness: Field) -> Result<Committed<Note>> {
        self.execute("exclusive.create", |action, _| {
            exclusive::create(action, owner, randomness)
        })
    }

    pub fn exclusive_consume(
        &mut self,
        owner: &ShieldedKeyBundle,
        key: &Field,
    ) -> Result<Committed<Note>> {
        self.execute("exclusive.consume", |action, _| {
            exclusive::consume(action, owner, key)
        })
    }

    pub fn self_nullify_create(
        &mut self,
        owner: Address,
        randomness: Field,
    ) -> Result<Committed<Note>> {
        self.execute("self_nullifying.create", |action, _| {
            self_nullifying::create(action, owner, randomness)
        })
    }

    pub fn self_nullify_consume(
        &mut self,
        owner: &ShieldedKeyBundle,
        randomness: &Field,
    ) -> Result<Committed<Note>> {
        self.execute("self_nullifying.consume", |action, _| {
            self_nullifying::consume(action, owner, randomness)
        })
    }

    pub fn shared_create(
        &mut self,
        caller: &ShieldedKeyBundle,
        counterparty: Address,
    ) -> Result<Committed<Field>> {
        self.execute("shared.create", |action, _| {
            shared::create(action, &caller.address, counterparty)
        })
    }

    pub fn shared_consume_with(
        &mut self,
        caller: &ShieldedKeyBundle,
        other: &Address,
    ) -> Result<Committed<Note>> {
        self.execute("shared.consume_with", |action, _| {
            shared::consume_with(action, &caller.address, other)
        })
    }

    pub fn shared_consume_by_key(
        &mut self,
        caller: &ShieldedKeyBundle,
        shared_key: &Field,
    ) -> Result<Committed<Note>> {
        self.execute("shared.consume_by_key", |action, _| {
            shared::consume_by_key(action, &caller.address, shared_key)
        })
    }

    pub fn broadcast(
        &mut self,
        creator: &ShieldedKeyBundle,
        recipients: &[Address],
    ) -> Result<Committed<Field>> {
        let max = self.config.max_broadcast_recipients;
        self.execute("broadcast.create", |action, _| {
            broadcast::broadcast(action, &creator.address, recipients, max)
        })
    }

    pub fn broadcast_consume(
        &mut self,
        caller: &ShieldedKeyBundle,
        shared_key: &Field,
    ) -> Result<Committed<Note>> {
        self.execute("broadcast.consume", |action, _| {
            broadcast::consume(action, &caller.address, shared_key)
        })
    }

    pub fn escrow(
        &mut self,
        caller: &ShieldedKeyBundle,
        to: Address,
        token_id: &TokenId,
        amount: u64,
        witness: &AuthWitness,
    ) -> Result<Committed<Field>> {
        self.execute("escrow.escrow", |action, _| {
            escrow::escrow(action, caller, &caller.address, to, token_id, amount, witness)
        })
    }

    pub fn release(
        &mut self,
        caller: &Address,
        random_id: &Field,
        counterparty: &Address,
    ) -> Result<Committed<EscrowNote>> {
        let strict = self.config.strict_settlement;
        self.execute("escrow.release", |action, _| {
            escrow::release(action, caller, random_id, counterparty, strict)
        })
    }

    pub fn deposit_fee(
        &mut self,
        caller: &ShieldedKeyBundle,
        beneficiary: Address,
        amount: u64,
        escrow_component: &Address,
        token_id: &TokenId,
        witness: &AuthWitness,
    ) -> Result<Committed<Field>> {
        self.execute("trustless.deposit_fee", |action, _| {
            trustless::deposit_fee(
                action,
                caller,
                beneficiary,
                amount,
                escrow_component,
                token_id,
                witness,
            )
        })
    }

    pub fn settle(&mut self, caller: &Address, random_id: &Field) -> Result<Committed<ReceiptNote>> {
        let strict = self.config.strict_settlement;
        self.execute("trustless.settle", |action, _| {
            trustless::settle(action, caller, random_id, strict)
        })
    }

    pub fn call_atomic(
        &mut self,
        caller: &ShieldedKeyBundle,
        relay: &Address,
        target: Address,
        beneficiary: Address,
        value: u64,
    ) -> Result<Committed<()>> {
        self.execute("callback.call_atomic", |action, registry| {
            callback::call_atomic(
                action,
                registry,
                &caller.address,
                relay,
                target,
                beneficiary,
                value,
            )
        })
    }

    /// Queue a callback for `resolver`; the caller is credited when it resolves
    pub fn queue_callback(
        &mut self,
        caller: &ShieldedKeyBundle,
        resolver: Address,
        target: Address,
        value: u64,
    ) -> Result<Committed<Field>> {
        self.execute("callback.queue", |action, registry| {
            callback::queue(action, registry, &caller.address, resolver, target, value)
        })
    }

    pub fn resolve_callback(
        &mut self,
        resolver: &ShieldedKeyBundle,
    ) -> Result<Committed<PendingCallback>> {
        self.execute("callback.resolve", |action, registry| {
            callback::resolve(action, registry, resolver)
        })
    }

    pub fn mirror_init(&mut self, owner: &ShieldedKeyBundle) -> Result<Committed<Note>> {
        self.execute("mirror.init", |action, _| {
            mirror::init(action, &owner.address, &owner.address)
        })
    }

    pub fn mirror_update(
        &mut self,
        caller: &ShieldedKeyBundle,
        owner: &Address,
        value: u64,
    ) -> Result<Committed<Note>> {
        self.execute("mirror.update_private", |action, _| {
            mirror::update_private(action, caller, owner, value)
        })
    }

    pub fn aggregator_init(
        &mut self,
        id: &Field,
        public_key: &ElGamalPublicKey,
        initial_randomness: &Field,
    ) -> Result<Committed<Ciphertext>> {
        self.execute("aggregator.init", |action, _| {
            aggregator::init(action, id, public_key, initial_randomness)
        })
    }

    pub fn contribute(
        &mut self,
        id: &Field,
        value: u64,
        randomness: &Field,
    ) -> Result<Committed<Ciphertext>> {
        self.execute("aggregator.contribute", |action, _| {
            aggregator::contribute(action, id, value, randomness)
        })
    }
}

impl<L: Ledger> std::fmt::Debug for Engine<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("height", &self.state().height())
            .field("config", &self.config)
            .field("registered", &self.directory.len())
            .finish()
    }
}
