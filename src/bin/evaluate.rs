//! Blueprint self-play evaluation binary.
//!
//! Usage:
//!   cargo run --release --bin evaluate -- --strategy PATH [OPTIONS]
//!
//! Options:
//!   --strategy <PATH>   Blueprint to evaluate (required)
//!   --hands <N>         Hands of self-play (default: 50000)
//!   --buckets <DIR>     Bucket table directory (default: data)
//!   --seed <N>          Random seed (default: 0)

use std::env;
use std::process;

use nlhe_blueprint::cfr::Blueprint;
use nlhe_blueprint::eval::{evaluate, StrategyMap};
use nlhe_blueprint::games::nlhe::{Bucketing, NlheConfig, NlheGame};

struct Args {
    strategy: String,
    hands: u64,
    buckets_dir: String,
    seed: u64,
}

fn parse_args() -> Result<Args, String> {
    let mut strategy = None;
    let mut hands = 50_000u64;
    let mut buckets_dir = "data".to_string();
    let mut seed = 0u64;

    let argv: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < argv.len() {
        let flag = argv[i].as_str();
        let value = |i: &mut usize| -> Result<String, String> {
            *i += 1;
            argv.get(*i)
                .cloned()
                .ok_or_else(|| format!("{} expects a value", flag))
        };
        match flag {
            "--strategy" => strategy = Some(value(&mut i)?),
            "--hands" => hands = value(&mut i)?.parse().map_err(|e| format!("{}", e))?,
            "--buckets" => buckets_dir = value(&mut i)?,
            "--seed" => seed = value(&mut i)?.parse().map_err(|e| format!("{}", e))?,
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 1;
    }

    Ok(Args {
        strategy: strategy.ok_or("--strategy is required")?,
        hands,
        buckets_dir,
        seed,
    })
}

fn print_help() {
    println!("Self-play evaluation of a trained blueprint");
    println!();
    println!("Usage: evaluate --strategy PATH [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --strategy <PATH>   Blueprint to evaluate (required)");
    println!("  --hands <N>         Hands of self-play (default: 50000)");
    println!("  --buckets <DIR>     Bucket table directory (default: data)");
    println!("  --seed <N>          Random seed (default: 0)");
}

fn run(args: Args) -> nlhe_blueprint::Result<()> {
    // A corrupt blueprint is fatal here; there is nothing to evaluate.
    let blueprint = Blueprint::load(&args.strategy)?;
    let strategy = StrategyMap::new(&blueprint);
    println!(
        "Loaded blueprint: {} info sets, trained {} iterations",
        strategy.len(),
        blueprint.meta.iterations
    );

    let bucketing = Bucketing::load_or_heuristic(
        &format!("{}/preflop_buckets.json", args.buckets_dir),
        &format!("{}/postflop_buckets.json", args.buckets_dir),
    );
    let game = NlheGame::new(NlheConfig::default(), bucketing);

    println!("Playing {} hands of self-play...", args.hands);
    let report = evaluate(&game, &strategy, args.hands, args.seed);

    println!();
    println!(
        "Evaluation over {} hands ({} blocks):",
        report.hands, report.blocks
    );
    println!("{:<10} {:>12} {:>12} {:>22}", "Player", "mbb/g", "± SE", "95% CI");
    println!("{}", "-".repeat(58));
    for p in 0..3 {
        let mean = report.mbb_per_game[p];
        let se = report.standard_error[p];
        println!(
            "Player {:<3} {:>12.1} {:>12.1}    [{:>8.1}, {:>8.1}]",
            p,
            mean,
            se,
            mean - 1.96 * se,
            mean + 1.96 * se
        );
    }
    let total: f64 = report.mbb_per_game.iter().sum();
    println!();
    println!("Sum of means: {:.4} mbb/g (zero-sum check)", total);
    Ok(())
}

fn main() {
    env_logger::init();
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_help();
            process::exit(2);
        }
    };
    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
