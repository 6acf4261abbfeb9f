//! Poseidon Sponge
//!
//! One parameter set shared by commitments, nullifiers and derived keys.
//!
//! ```text
//! Field:     BLS12-381 Fr (255 bits)
//! Rate:      2
//! Capacity:  1
//! Rounds:    8 full, 57 partial, alpha = 5
//! ```
//!
//! Every hash absorbs a domain tag first, so two uses with the same inputs
//! never collide across purposes.

use ark_bls12_381::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use std::sync::OnceLock;

/// Domain tags (ASCII packed into a u64)
pub mod domain {
    /// "NOTE"
    pub const NOTE_COMMITMENT: u64 = 0x4e4f_5445;
    /// "NNCE"
    pub const NOTE_NONCE: u64 = 0x4e4e_4345;
    /// "NULL"
    pub const NOTE_NULLIFIER: u64 = 0x4e55_4c4c;
    /// "SHAR"
    pub const SHARED_NULLIFIER: u64 = 0x5348_4152;
    /// "MARK"
    pub const MARKER_NULLIFIER: u64 = 0x4d41_524b;
    /// "ESCR"
    pub const ESCROW_NULLIFIER: u64 = 0x4553_4352;
    /// "AUTH"
    pub const WITNESS_NULLIFIER: u64 = 0x4155_5448;
    /// "KTAG"
    pub const KEY_TAG: u64 = 0x4b54_4147;
    /// "NKEY"
    pub const NULLIFIER_KEY: u64 = 0x4e4b_4559;
    /// "DKEY"
    pub const DERIVED_KEY: u64 = 0x444b_4559;
    /// "TOKN"
    pub const TOKEN: u64 = 0x544f_4b4e;
    /// "RAND"
    pub const RANDOMNESS: u64 = 0x5241_4e44;
}

static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();

/// Poseidon configuration for BLS12-381 Fr
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    CONFIG.get_or_init(|| {
        let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
            255, // prime bits
            2,   // rate
            8,   // full rounds
            57,  // partial rounds
            0,   // skip matrices
        );
        PoseidonConfig::new(8, 57, 5, mds, ark, 2, 1)
    })
}

/// Hash a domain tag followed by `inputs`
pub fn hash_with_domain(domain: u64, inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(poseidon_config());
    sponge.absorb(&Fr::from(domain));
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_separation() {
        let inputs = [Fr::from(1u64), Fr::from(2u64)];
        let a = hash_with_domain(domain::NOTE_NULLIFIER, &inputs);
        let b = hash_with_domain(domain::SHARED_NULLIFIER, &inputs);
        assert_ne!(a, b);
        assert_eq!(a, hash_with_domain(domain::NOTE_NULLIFIER, &inputs));
    }

    #[test]
    fn test_input_order_matters() {
        let a = hash_with_domain(domain::DERIVED_KEY, &[Fr::from(1u64), Fr::from(2u64)]);
        let b = hash_with_domain(domain::DERIVED_KEY, &[Fr::from(2u64), Fr::from(1u64)]);
        assert_ne!(a, b);
    }
}
