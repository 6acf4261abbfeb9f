#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;

use shade_core::{Engine, EngineConfig};
use shade_privacy::{ShieldedKeyBundle, TokenId};

pub struct World {
    pub engine: Engine,
    pub rng: StdRng,
    pub alice: ShieldedKeyBundle,
    pub bob: ShieldedKeyBundle,
    pub carol: ShieldedKeyBundle,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self::with_config(EngineConfig::seeded(seed))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.rng_seed.unwrap_or(0) ^ 0x5eed);
        let alice = ShieldedKeyBundle::random(&mut rng);
        let bob = ShieldedKeyBundle::random(&mut rng);
        let carol = ShieldedKeyBundle::random(&mut rng);

        let mut engine = Engine::new(config);
        for keys in [&alice, &bob, &carol] {
            engine.register(keys.public_keys);
        }

        Self {
            engine,
            rng,
            alice,
            bob,
            carol,
        }
    }

    /// Alice's token, with `amount` minted to her
    pub fn funded(&mut self, amount: u64) -> TokenId {
        let token = TokenId::new(&self.alice.address, "GOLD");
        self.engine
            .mint(&self.alice, &token, "GOLD", self.alice.address, amount)
            .unwrap();
        token
    }

    /// (height, notes, nullifiers, public slots)
    pub fn fingerprint(&self) -> (u64, usize, usize, usize) {
        let state = self.engine.state();
        (
            state.height(),
            state.notes().len(),
            state.nullifiers().len(),
            state.public().len(),
        )
    }
}
