//! End-to-end protocol scenarios against a fresh engine

use anyhow::{Context, Result, bail};
use log::info;
use rand::SeedableRng;
use rand::rngs::StdRng;

use shade_core::patterns::{escrow, escrow_address, minter_address, relay_address};
use shade_core::{Engine, EngineConfig, Ledger, RocksLedger, ValueMinter};
use shade_privacy::{
    ElGamalSecretKey, ExclusiveNote, Field, ShieldedKeyBundle, TokenId, decrypt_note,
    random_blinding,
};

pub const SCENARIOS: [&str; 9] = [
    "exclusive",
    "self-nullify",
    "shared",
    "broadcast",
    "escrow",
    "trustless",
    "callback",
    "mirror",
    "aggregate",
];

/// Accounts every scenario draws from
struct Cast {
    rng: StdRng,
    alice: ShieldedKeyBundle,
    bob: ShieldedKeyBundle,
    carol: ShieldedKeyBundle,
}

impl Cast {
    fn new(seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            alice: ShieldedKeyBundle::random(&mut rng),
            bob: ShieldedKeyBundle::random(&mut rng),
            carol: ShieldedKeyBundle::random(&mut rng),
            rng,
        }
    }
}

pub fn run(scenario: &str, config: EngineConfig) -> Result<()> {
    let selected: Vec<&str> = match scenario {
        "all" => SCENARIOS.to_vec(),
        name if SCENARIOS.contains(&name) => vec![name],
        other => bail!("unknown scenario '{}'", other),
    };

    match config.db_path.clone() {
        Some(path) => {
            let ledger = RocksLedger::open(&path, config.limits)
                .with_context(|| format!("opening ledger at {}", path.display()))?;
            run_on(Engine::with_ledger(ledger, config), &selected)
        }
        None => run_on(Engine::new(config), &selected),
    }
}

fn run_on<L: Ledger>(mut engine: Engine<L>, selected: &[&str]) -> Result<()> {
    let mut cast = Cast::new(engine.config().rng_seed);
    for keys in [&cast.alice, &cast.bob, &cast.carol] {
        engine.register(keys.public_keys);
    }

    for name in selected {
        println!("=== {} ===", name);
        match *name {
            "exclusive" => exclusive(&mut engine, &mut cast)?,
            "self-nullify" => self_nullify(&mut engine, &mut cast)?,
            "shared" => shared(&mut engine, &cast)?,
            "broadcast" => broadcast(&mut engine, &cast)?,
            "escrow" => escrow_release(&mut engine, &mut cast)?,
            "trustless" => trustless(&mut engine, &mut cast)?,
            "callback" => callback(&mut engine, &cast)?,
            "mirror" => mirror(&mut engine, &cast)?,
            "aggregate" => aggregate(&mut engine, &mut cast)?,
            other => bail!("unknown scenario '{}'", other),
        }
        println!();
    }

    info!("Ledger height after demo: {}", engine.state().height());
    Ok(())
}

fn exclusive<L: Ledger>(engine: &mut Engine<L>, cast: &mut Cast) -> Result<()> {
    let randomness = Field::random(&mut cast.rng);
    let created = engine.exclusive_create(cast.alice.address, randomness)?;
    println!("  created {} for alice", created.value.commitment);

    let delivered = created
        .encrypted_notes
        .first()
        .and_then(|enc| decrypt_note(enc, &cast.alice.viewing_secret()))
        .context("alice could not decrypt her note")?;
    println!("  alice decrypted note in slot {}", delivered.slot);

    let again = engine.exclusive_create(cast.alice.address, randomness);
    println!("  second create: {}", outcome(&again));

    let key = ExclusiveNote::key_for(&cast.alice.address, &randomness);
    let stolen = engine.exclusive_consume(&cast.bob, &key);
    println!("  bob consumes: {}", outcome(&stolen));
    engine.exclusive_consume(&cast.alice, &key)?;
    println!(
        "  alice consumed; state is {:?}",
        engine.exclusive_state(&cast.alice.address, &key)
    );
    Ok(())
}

fn self_nullify<L: Ledger>(engine: &mut Engine<L>, cast: &mut Cast) -> Result<()> {
    let randomness = Field::random(&mut cast.rng);
    engine.self_nullify_create(cast.alice.address, randomness)?;
    println!(
        "  parameters used: {}",
        engine.are_parameters_nullified(&cast.alice.address, &randomness)
    );
    let again = engine.self_nullify_create(cast.alice.address, randomness);
    println!("  reuse of (alice, r): {}", outcome(&again));
    let fresh = engine.self_nullify_create(cast.alice.address, Field::random(&mut cast.rng));
    println!("  fresh r': {}", outcome(&fresh));
    Ok(())
}

fn shared<L: Ledger>(engine: &mut Engine<L>, cast: &Cast) -> Result<()> {
    engine.shared_create(&cast.alice, cast.bob.address)?;
    println!("  alice and bob each hold a copy");
    engine.shared_consume_with(&cast.bob, &cast.alice.address)?;
    println!("  bob consumed the shared note");
    let late = engine.shared_consume_with(&cast.alice, &cast.bob.address);
    println!("  alice afterwards: {}", outcome(&late));
    Ok(())
}

fn broadcast<L: Ledger>(engine: &mut Engine<L>, cast: &Cast) -> Result<()> {
    let recipients = [cast.bob.address, cast.carol.address];
    let key = engine.broadcast(&cast.alice, &recipients)?.value;
    println!("  broadcast to bob and carol");
    engine.broadcast_consume(&cast.carol, &key)?;
    println!("  carol consumed");
    println!(
        "  bob still sees a copy: {}",
        engine.broadcast_find(&cast.bob.address, &key).is_some()
    );
    Ok(())
}

fn fund<L: Ledger>(engine: &mut Engine<L>, cast: &Cast, amount: u64) -> Result<TokenId> {
    let token = TokenId::new(&cast.alice.address, "DEMO");
    engine.mint(&cast.alice, &token, "DEMO", cast.alice.address, amount)?;
    Ok(token)
}

fn escrow_release<L: Ledger>(engine: &mut Engine<L>, cast: &mut Cast) -> Result<()> {
    let token = fund(engine, cast, 100)?;
    let nonce = Field::random(&mut cast.rng);
    let witness = escrow::authorize(&cast.alice, escrow_address(), &token, 40, nonce);

    let id = engine
        .escrow(&cast.alice, cast.bob.address, &token, 40, &witness)?
        .value;
    println!(
        "  escrowed 40; alice holds {}",
        engine.balance_of(&cast.alice.address, &token)?
    );

    let replay = engine.escrow(&cast.alice, cast.bob.address, &token, 40, &witness);
    println!("  replayed witness: {}", outcome(&replay));

    engine.release(&cast.bob.address, &id, &cast.bob.address)?;
    println!(
        "  released; bob holds {}",
        engine.balance_of(&cast.bob.address, &token)?
    );
    let again = engine.release(&cast.bob.address, &id, &cast.bob.address);
    println!("  second release: {}", outcome(&again));
    Ok(())
}

fn trustless<L: Ledger>(engine: &mut Engine<L>, cast: &mut Cast) -> Result<()> {
    let token = fund(engine, cast, 50)?;
    let nonce = Field::random(&mut cast.rng);
    let witness = escrow::authorize(&cast.alice, escrow_address(), &token, 20, nonce);

    let id = engine
        .deposit_fee(
            &cast.alice,
            cast.carol.address,
            20,
            &escrow_address(),
            &token,
            &witness,
        )?
        .value;
    println!("  deposited a fee of 20 for carol");

    let outsider = engine.settle(&cast.bob.address, &id);
    println!("  bob settles: {}", outcome(&outsider));
    engine.settle(&cast.carol.address, &id)?;
    println!(
        "  carol settled; carol holds {}",
        engine.balance_of(&cast.carol.address, &token)?
    );
    Ok(())
}

fn callback<L: Ledger>(engine: &mut Engine<L>, cast: &Cast) -> Result<()> {
    let token = ValueMinter::new(minter_address(), u64::MAX).token();

    engine.call_atomic(
        &cast.alice,
        &relay_address(),
        minter_address(),
        cast.bob.address,
        5,
    )?;
    println!(
        "  atomic relay credited bob {}",
        engine.balance_of(&cast.bob.address, &token)?
    );

    engine.queue_callback(&cast.bob, cast.carol.address, minter_address(), 3)?;
    println!("  bob queued a callback for carol to resolve");
    engine.resolve_callback(&cast.carol)?;
    println!(
        "  carol resolved; bob holds {}",
        engine.balance_of(&cast.bob.address, &token)?
    );
    Ok(())
}

fn mirror<L: Ledger>(engine: &mut Engine<L>, cast: &Cast) -> Result<()> {
    for value in [10, 25] {
        engine.mirror_update(&cast.bob, &cast.bob.address, value)?;
        println!(
            "  set {}: public {:?}, private {:?}",
            value,
            engine.mirror_public(&cast.bob.address),
            engine.mirror_private(&cast.bob.address)?
        );
    }
    Ok(())
}

fn aggregate<L: Ledger>(engine: &mut Engine<L>, cast: &mut Cast) -> Result<()> {
    let secret = ElGamalSecretKey::random(&mut cast.rng);
    let id = Field::random(&mut cast.rng);
    engine.aggregator_init(&id, &secret.public_key(), &random_blinding(&mut cast.rng))?;

    for value in [1, 1, 0] {
        engine.contribute(&id, value, &random_blinding(&mut cast.rng))?;
    }
    let total = engine
        .aggregator_read(&id)?
        .and_then(|ct| secret.decrypt(&ct, engine.config().max_decrypt_value))
        .context("aggregate did not decrypt")?;
    println!("  contributions 1, 1, 0 decrypt to {}", total);
    Ok(())
}

fn outcome<T>(result: &shade_core::Result<T>) -> String {
    match result {
        Ok(_) => "ok".to_string(),
        Err(e) => format!("rejected ({})", e),
    }
}
