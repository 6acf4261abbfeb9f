//! Note Payloads
//!
//! A note's payload is an ordered list of fields. Each protocol reads it
//! through one tagged variant, decoded explicitly by kind and arity.
//!
//! ```text
//! Value           [owner, token, amount, randomness]
//! Exclusive       [owner, randomness]
//! Shared          [alice, bob, shared_key]
//! Broadcast       [creator, shared_key]
//! Escrow          [amount, controller, random_id, token, from, to]
//! Receipt         [manager, from, to, random_id, shared_key, token, escrow, fee]
//! PendingCallback [allowed_resolver, address_to_callback, beneficiary, value, callback_id]
//! Mirror          [value, owner, randomness]
//! ```

use ark_bls12_381::Fr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::field::{Address, Field};
use crate::poseidon::{domain, hash_with_domain};

/// Payload decoding failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("{kind:?} payload needs {expected} fields, got {got}")]
    WrongArity {
        kind: NoteKind,
        expected: usize,
        got: usize,
    },

    #[error("field {index} of {kind:?} payload is not a u64 amount")]
    NotAnAmount { kind: NoteKind, index: usize },

    #[error("unknown note kind tag {0}")]
    UnknownKind(u64),
}

/// Payload variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    Value,
    Exclusive,
    Shared,
    Broadcast,
    Escrow,
    Receipt,
    PendingCallback,
    Mirror,
}

impl NoteKind {
    pub fn tag(self) -> u64 {
        match self {
            NoteKind::Value => 1,
            NoteKind::Exclusive => 2,
            NoteKind::Shared => 3,
            NoteKind::Broadcast => 4,
            NoteKind::Escrow => 5,
            NoteKind::Receipt => 6,
            NoteKind::PendingCallback => 7,
            NoteKind::Mirror => 8,
        }
    }

    pub fn from_tag(tag: u64) -> Result<Self, PayloadError> {
        Ok(match tag {
            1 => NoteKind::Value,
            2 => NoteKind::Exclusive,
            3 => NoteKind::Shared,
            4 => NoteKind::Broadcast,
            5 => NoteKind::Escrow,
            6 => NoteKind::Receipt,
            7 => NoteKind::PendingCallback,
            8 => NoteKind::Mirror,
            other => return Err(PayloadError::UnknownKind(other)),
        })
    }

    /// Number of payload fields
    pub fn arity(self) -> usize {
        match self {
            NoteKind::Value => 4,
            NoteKind::Exclusive => 2,
            NoteKind::Shared => 3,
            NoteKind::Broadcast => 2,
            NoteKind::Escrow => 6,
            NoteKind::Receipt => 8,
            NoteKind::PendingCallback => 5,
            NoteKind::Mirror => 3,
        }
    }

    /// Derived key over a protocol-specific projection of the payload
    fn key(self, parts: &[Field]) -> Field {
        let mut inputs = Vec::with_capacity(parts.len() + 1);
        inputs.push(Fr::from(self.tag()));
        inputs.extend(parts.iter().map(Field::to_fr));
        Field::from_fr(hash_with_domain(domain::DERIVED_KEY, &inputs))
    }
}

/// Token identifier, bound to the admin allowed to mint it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub Field);

impl TokenId {
    /// token = Poseidon(TOKN, admin, symbol)
    pub fn new(admin: &Address, symbol: &str) -> Self {
        let symbol = Field(*blake3::hash(symbol.as_bytes()).as_bytes());
        Self(Field::from_fr(hash_with_domain(
            domain::TOKEN,
            &[admin.to_fr(), symbol.to_fr()],
        )))
    }
}

/// Note-based balance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueNote {
    pub owner: Address,
    pub token: TokenId,
    pub amount: u64,
    pub randomness: Field,
}

impl ValueNote {
    pub fn key_for(owner: &Address, token: &TokenId) -> Field {
        NoteKind::Value.key(&[owner.to_field(), token.0])
    }
}

/// Exclusively owned note keyed by `(owner, randomness)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusiveNote {
    pub owner: Address,
    pub randomness: Field,
}

impl ExclusiveNote {
    pub fn key_for(owner: &Address, randomness: &Field) -> Field {
        NoteKind::Exclusive.key(&[owner.to_field(), *randomness])
    }
}

/// Two-party note spent through a shared nullifier key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedNote {
    pub alice: Address,
    pub bob: Address,
    pub shared_key: Field,
}

impl SharedNote {
    pub fn key_for(alice: &Address, bob: &Address) -> Field {
        NoteKind::Shared.key(&[alice.to_field(), bob.to_field()])
    }
}

/// One recipient's copy of a broadcast note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastNote {
    pub creator: Address,
    pub shared_key: Field,
}

impl BroadcastNote {
    pub fn key_for(shared_key: &Field) -> Field {
        NoteKind::Broadcast.key(&[*shared_key])
    }
}

/// One party's half of an escrow record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscrowNote {
    pub amount: u64,
    /// Component that opened the escrow on the parties' behalf
    pub controller: Address,
    pub random_id: Field,
    pub token: TokenId,
    pub from: Address,
    pub to: Address,
}

impl EscrowNote {
    pub fn key_for(random_id: &Field) -> Field {
        NoteKind::Escrow.key(&[*random_id])
    }
}

/// Trustless manager receipt, one copy per party
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptNote {
    pub manager: Address,
    pub from: Address,
    pub to: Address,
    pub random_id: Field,
    pub shared_key: Field,
    pub token: TokenId,
    pub escrow: Address,
    pub fee: u64,
}

impl ReceiptNote {
    pub fn key_for(random_id: &Field) -> Field {
        NoteKind::Receipt.key(&[*random_id])
    }
}

/// Deferred callback waiting for its resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCallback {
    pub allowed_resolver: Address,
    pub address_to_callback: Address,
    pub beneficiary: Address,
    pub value: u64,
    pub callback_id: Field,
}

impl PendingCallback {
    pub fn key_for(resolver: &Address) -> Field {
        NoteKind::PendingCallback.key(&[resolver.to_field()])
    }
}

/// Private half of a mirrored value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MirrorNote {
    pub value: u64,
    pub owner: Address,
    pub randomness: Field,
}

impl MirrorNote {
    pub fn key_for(owner: &Address) -> Field {
        NoteKind::Mirror.key(&[owner.to_field()])
    }
}

/// Tagged payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotePayload {
    Value(ValueNote),
    Exclusive(ExclusiveNote),
    Shared(SharedNote),
    Broadcast(BroadcastNote),
    Escrow(EscrowNote),
    Receipt(ReceiptNote),
    PendingCallback(PendingCallback),
    Mirror(MirrorNote),
}

impl NotePayload {
    pub fn kind(&self) -> NoteKind {
        match self {
            NotePayload::Value(_) => NoteKind::Value,
            NotePayload::Exclusive(_) => NoteKind::Exclusive,
            NotePayload::Shared(_) => NoteKind::Shared,
            NotePayload::Broadcast(_) => NoteKind::Broadcast,
            NotePayload::Escrow(_) => NoteKind::Escrow,
            NotePayload::Receipt(_) => NoteKind::Receipt,
            NotePayload::PendingCallback(_) => NoteKind::PendingCallback,
            NotePayload::Mirror(_) => NoteKind::Mirror,
        }
    }

    /// Encode into ordered fields
    pub fn to_fields(&self) -> Vec<Field> {
        match self {
            NotePayload::Value(n) => vec![
                n.owner.to_field(),
                n.token.0,
                Field::from_u64(n.amount),
                n.randomness,
            ],
            NotePayload::Exclusive(n) => vec![n.owner.to_field(), n.randomness],
            NotePayload::Shared(n) => vec![n.alice.to_field(), n.bob.to_field(), n.shared_key],
            NotePayload::Broadcast(n) => vec![n.creator.to_field(), n.shared_key],
            NotePayload::Escrow(n) => vec![
                Field::from_u64(n.amount),
                n.controller.to_field(),
                n.random_id,
                n.token.0,
                n.from.to_field(),
                n.to.to_field(),
            ],
            NotePayload::Receipt(n) => vec![
                n.manager.to_field(),
                n.from.to_field(),
                n.to.to_field(),
                n.random_id,
                n.shared_key,
                n.token.0,
                n.escrow.to_field(),
                Field::from_u64(n.fee),
            ],
            NotePayload::PendingCallback(n) => vec![
                n.allowed_resolver.to_field(),
                n.address_to_callback.to_field(),
                n.beneficiary.to_field(),
                Field::from_u64(n.value),
                n.callback_id,
            ],
            NotePayload::Mirror(n) => vec![
                Field::from_u64(n.value),
                n.owner.to_field(),
                n.randomness,
            ],
        }
    }

    /// Decode fields for a known kind
    pub fn decode(kind: NoteKind, fields: &[Field]) -> Result<Self, PayloadError> {
        if fields.len() != kind.arity() {
            return Err(PayloadError::WrongArity {
                kind,
                expected: kind.arity(),
                got: fields.len(),
            });
        }
        let addr = |i: usize| Address::from_field(fields[i]);
        let amount = |i: usize| {
            fields[i]
                .to_u64()
                .ok_or(PayloadError::NotAnAmount { kind, index: i })
        };

        Ok(match kind {
            NoteKind::Value => NotePayload::Value(ValueNote {
                owner: addr(0),
                token: TokenId(fields[1]),
                amount: amount(2)?,
                randomness: fields[3],
            }),
            NoteKind::Exclusive => NotePayload::Exclusive(ExclusiveNote {
                owner: addr(0),
                randomness: fields[1],
            }),
            NoteKind::Shared => NotePayload::Shared(SharedNote {
                alice: addr(0),
                bob: addr(1),
                shared_key: fields[2],
            }),
            NoteKind::Broadcast => NotePayload::Broadcast(BroadcastNote {
                creator: addr(0),
                shared_key: fields[1],
            }),
            NoteKind::Escrow => NotePayload::Escrow(EscrowNote {
                amount: amount(0)?,
                controller: addr(1),
                random_id: fields[2],
                token: TokenId(fields[3]),
                from: addr(4),
                to: addr(5),
            }),
            NoteKind::Receipt => NotePayload::Receipt(ReceiptNote {
                manager: addr(0),
                from: addr(1),
                to: addr(2),
                random_id: fields[3],
                shared_key: fields[4],
                token: TokenId(fields[5]),
                escrow: addr(6),
                fee: amount(7)?,
            }),
            NoteKind::PendingCallback => NotePayload::PendingCallback(PendingCallback {
                allowed_resolver: addr(0),
                address_to_callback: addr(1),
                beneficiary: addr(2),
                value: amount(3)?,
                callback_id: fields[4],
            }),
            NoteKind::Mirror => NotePayload::Mirror(MirrorNote {
                value: amount(0)?,
                owner: addr(1),
                randomness: fields[2],
            }),
        })
    }

    /// Projection used for lookups and uniqueness checks
    pub fn derived_key(&self) -> Field {
        match self {
            NotePayload::Value(n) => ValueNote::key_for(&n.owner, &n.token),
            NotePayload::Exclusive(n) => ExclusiveNote::key_for(&n.owner, &n.randomness),
            NotePayload::Shared(n) => SharedNote::key_for(&n.alice, &n.bob),
            NotePayload::Broadcast(n) => BroadcastNote::key_for(&n.shared_key),
            NotePayload::Escrow(n) => EscrowNote::key_for(&n.random_id),
            NotePayload::Receipt(n) => ReceiptNote::key_for(&n.random_id),
            NotePayload::PendingCallback(n) => PendingCallback::key_for(&n.allowed_resolver),
            NotePayload::Mirror(n) => MirrorNote::key_for(&n.owner),
        }
    }

    /// Shared nullifier key, for payloads spent by any holder
    pub fn shared_key(&self) -> Option<Field> {
        match self {
            NotePayload::Shared(n) => Some(n.shared_key),
            NotePayload::Broadcast(n) => Some(n.shared_key),
            NotePayload::Receipt(n) => Some(n.shared_key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(byte: u8) -> Address {
        Address([byte; 32])
    }

    #[test]
    fn test_escrow_decodes_to_same_variant() {
        let payload = NotePayload::Escrow(EscrowNote {
            amount: 50,
            controller: a(1),
            random_id: Field::from_u64(99),
            token: TokenId::new(&a(2), "FEE"),
            from: a(3),
            to: a(4),
        });

        let fields = payload.to_fields();
        assert_eq!(fields.len(), NoteKind::Escrow.arity());
        assert_eq!(NotePayload::decode(NoteKind::Escrow, &fields), Ok(payload));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let err = NotePayload::decode(NoteKind::Receipt, &[Field::ZERO; 3]).unwrap_err();
        assert_eq!(
            err,
            PayloadError::WrongArity {
                kind: NoteKind::Receipt,
                expected: 8,
                got: 3
            }
        );
    }

    #[test]
    fn test_oversized_amount_rejected() {
        let mut fields = vec![Field::ZERO; 3];
        fields[0] = Field([0xff; 32]);
        assert_eq!(
            NotePayload::decode(NoteKind::Mirror, &fields),
            Err(PayloadError::NotAnAmount {
                kind: NoteKind::Mirror,
                index: 0
            })
        );
    }

    #[test]
    fn test_kind_tags_roundtrip() {
        for tag in 1..=8 {
            assert_eq!(NoteKind::from_tag(tag).map(NoteKind::tag), Ok(tag));
        }
        assert_eq!(NoteKind::from_tag(0), Err(PayloadError::UnknownKind(0)));
    }

    #[test]
    fn test_derived_keys_separate_kinds() {
        let r = Field::from_u64(5);
        // Same projection input, different kinds
        assert_ne!(BroadcastNote::key_for(&r), EscrowNote::key_for(&r));
        assert_ne!(EscrowNote::key_for(&r), ReceiptNote::key_for(&r));
    }

    #[test]
    fn test_shared_key_only_for_shared_payloads() {
        let exclusive = NotePayload::Exclusive(ExclusiveNote {
            owner: a(1),
            randomness: Field::from_u64(1),
        });
        let broadcast = NotePayload::Broadcast(BroadcastNote {
            creator: a(1),
            shared_key: Field::from_u64(8),
        });
        assert_eq!(exclusive.shared_key(), None);
        assert_eq!(broadcast.shared_key(), Some(Field::from_u64(8)));
    }
}
