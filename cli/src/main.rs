mod demo;

use std::env;
use std::path::PathBuf;

use shade_config::ShadeConfig;
use shade_core::EngineConfig;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        return;
    }

    let cmd = &args[1];

    match cmd.as_str() {
        "demo" => {
            let Some(scenario) = args.get(2) else {
                println!("Usage: demo <scenario|all> [options]");
                println!("  scenarios: {}", demo::SCENARIOS.join(", "));
                return;
            };
            let config = match parse_demo_args(&args[3..]) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Error loading config: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = demo::run(scenario, config) {
                eprintln!("❌ Error running demo: {:#}", e);
                std::process::exit(1);
            }
        }
        "config" => {
            print!("{}", ShadeConfig::generate_sample());
        }
        "help" | "--help" | "-h" => {
            print_usage();
        }
        _ => {
            println!("❌ Unknown command: {}", cmd);
            println!();
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    println!("Shade CLI - private note protocols on a nullifier ledger");
    println!();
    println!("USAGE:");
    println!("  shade <command> [args]");
    println!();
    println!("COMMANDS:");
    println!("  demo <scenario|all> [options]   Run a protocol scenario end to end");
    println!("  config                          Print a sample shade.toml");
    println!("  help                            Show this help message");
    println!();
    println!("SCENARIOS:");
    println!("  {}", demo::SCENARIOS.join(", "));
    println!();
    println!("DEMO OPTIONS:");
    println!("  --db-path <path>                Persist the ledger in RocksDB");
    println!("  --seed <n>                      Deterministic keys and nonces");
    println!("  --strict                        Only escrow parties may release");
    println!();
    println!("EXAMPLES:");
    println!("  shade demo escrow                    # Escrow then release");
    println!("  shade demo all --seed 7              # Every scenario, reproducible");
    println!("  shade config > shade.toml            # Write a starting config");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("  SHADE_CONFIG         Path to a config file");
    println!("  SHADE_DB_PATH        RocksDB directory for the ledger");
    println!("  SHADE_RNG_SEED       Seed for keys and nonces");
    println!("  RUST_LOG             Log level (debug/info/warn/error)");
}

fn parse_demo_args(args: &[String]) -> anyhow::Result<EngineConfig> {
    let mut config = EngineConfig::from(&ShadeConfig::load()?);

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--db-path" => {
                if let Some(path) = args.get(i + 1) {
                    config.db_path = Some(PathBuf::from(path));
                    i += 1;
                }
            }
            "--seed" => {
                if let Some(seed) = args.get(i + 1) {
                    config.rng_seed = Some(seed.parse()?);
                    i += 1;
                }
            }
            "--strict" => {
                config.strict_settlement = true;
            }
            other => {
                log::warn!("Ignoring unknown option {}", other);
            }
        }
        i += 1;
    }

    Ok(config)
}
