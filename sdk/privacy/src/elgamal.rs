//! Exponential ElGamal
//!
//! Additively homomorphic encryption over Jubjub, the twisted Edwards curve
//! defined over the BLS12-381 scalar field.
//!
//! ```text
//! Enc(m; r) = (r·G, m·G + r·PK)
//! Enc(a; r) + Enc(b; s) = Enc(a + b; r + s)
//! Dec(C1, C2) = log_G(C2 - sk·C1)     // small plaintexts only
//! ```

use ark_ec::{AffineRepr, CurveGroup};
use ark_ed_on_bls12_381::{EdwardsAffine, EdwardsProjective, Fr as Scalar};
use ark_ff::{BigInteger, PrimeField};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::Zero;
use rand::RngCore;
use std::ops::Add;
use thiserror::Error;

use crate::field::Field;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElGamalError {
    #[error("invalid point encoding")]
    InvalidPoint,
}

/// Group public key PK = sk·G
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElGamalPublicKey(pub EdwardsAffine);

impl ElGamalPublicKey {
    pub fn to_field(&self) -> Result<Field, ElGamalError> {
        point_to_field(&self.0)
    }

    pub fn from_field(field: &Field) -> Result<Self, ElGamalError> {
        point_from_field(field).map(Self)
    }
}

/// Secret key held by whoever decrypts the aggregate
#[derive(Clone)]
pub struct ElGamalSecretKey(Scalar);

impl ElGamalSecretKey {
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        let mut wide = [0u8; 64];
        rng.fill_bytes(&mut wide);
        Self(Scalar::from_le_bytes_mod_order(&wide))
    }

    pub fn public_key(&self) -> ElGamalPublicKey {
        ElGamalPublicKey((EdwardsAffine::generator() * self.0).into_affine())
    }

    /// Recover a plaintext in `0..=max` by exhaustive search
    pub fn decrypt(&self, ciphertext: &Ciphertext, max: u64) -> Option<u64> {
        let target = (ciphertext.c2.into_group() - ciphertext.c1 * self.0).into_affine();
        let generator = EdwardsAffine::generator();

        let mut acc = EdwardsProjective::zero();
        for m in 0..=max {
            if acc.into_affine() == target {
                return Some(m);
            }
            acc += generator;
        }
        None
    }
}

impl std::fmt::Debug for ElGamalSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ElGamalSecretKey(..)")
    }
}

/// Ciphertext (C1, C2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ciphertext {
    pub c1: EdwardsAffine,
    pub c2: EdwardsAffine,
}

impl Ciphertext {
    /// Enc(value; randomness) under `pk`
    pub fn encrypt(pk: &ElGamalPublicKey, value: u64, randomness: &Field) -> Self {
        let r = scalar_from_field(randomness);
        let generator = EdwardsAffine::generator();

        let c1 = generator * r;
        let c2 = generator * Scalar::from(value) + pk.0 * r;
        Self {
            c1: c1.into_affine(),
            c2: c2.into_affine(),
        }
    }

    /// Fresh ciphertext with random blinding
    pub fn encrypt_random<R: RngCore + ?Sized>(
        pk: &ElGamalPublicKey,
        value: u64,
        rng: &mut R,
    ) -> Self {
        Self::encrypt(pk, value, &random_blinding(rng))
    }

    /// Compressed (C1, C2) as two fields
    pub fn to_fields(&self) -> Result<[Field; 2], ElGamalError> {
        Ok([point_to_field(&self.c1)?, point_to_field(&self.c2)?])
    }

    pub fn from_fields(fields: &[Field]) -> Result<Self, ElGamalError> {
        match fields {
            [c1, c2] => Ok(Self {
                c1: point_from_field(c1)?,
                c2: point_from_field(c2)?,
            }),
            _ => Err(ElGamalError::InvalidPoint),
        }
    }
}

impl Add for Ciphertext {
    type Output = Ciphertext;

    fn add(self, rhs: Ciphertext) -> Ciphertext {
        Ciphertext {
            c1: (self.c1.into_group() + rhs.c1).into_affine(),
            c2: (self.c2.into_group() + rhs.c2).into_affine(),
        }
    }
}

/// Scalar blinding from field bytes
fn scalar_from_field(field: &Field) -> Scalar {
    Scalar::from_le_bytes_mod_order(field.as_bytes())
}

fn point_to_field(point: &EdwardsAffine) -> Result<Field, ElGamalError> {
    let mut bytes = [0u8; 32];
    point
        .serialize_compressed(&mut bytes[..])
        .map_err(|_| ElGamalError::InvalidPoint)?;
    Ok(Field(bytes))
}

fn point_from_field(field: &Field) -> Result<EdwardsAffine, ElGamalError> {
    EdwardsAffine::deserialize_compressed(&field.as_bytes()[..])
        .map_err(|_| ElGamalError::InvalidPoint)
}

/// Uniform random scalar bytes, usable as encryption randomness
pub fn random_blinding<R: RngCore + ?Sized>(rng: &mut R) -> Field {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    let encoded = Scalar::from_le_bytes_mod_order(&wide).into_bigint().to_bytes_le();
    let mut bytes = [0u8; 32];
    bytes[..encoded.len()].copy_from_slice(&encoded);
    Field(bytes)
}
