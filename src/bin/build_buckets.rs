//! Bucket table construction binary.
//!
//! Usage:
//!   cargo run --release --bin build_buckets -- [OPTIONS]
//!
//! Options:
//!   --out-dir <DIR>            Output directory (default: data)
//!   --preflop-rollouts <N>     Rollouts per canonical hand (default: 1000)
//!   --postflop-samples <N>     Samples per postflop street (default: 5000)
//!   --postflop-rollouts <N>    Rollouts per sample (default: 200)
//!   --seed <N>                 Sampling seed (default: 42)

use std::env;
use std::fs;
use std::process;
use std::time::Instant;

use nlhe_blueprint::games::nlhe::bucket_build::{
    build_postflop_table, build_preflop_table, BuildParams,
};
use nlhe_blueprint::games::nlhe::{POSTFLOP_BUCKETS, PREFLOP_BUCKETS};

struct Args {
    out_dir: String,
    params: BuildParams,
}

fn parse_args() -> Result<Args, String> {
    let mut out_dir = "data".to_string();
    let mut params = BuildParams::default();

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
            "--out-dir" => out_dir = value(&mut i)?,
            "--preflop-rollouts" => {
                params.preflop_rollouts = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--postflop-samples" => {
                params.postflop_samples = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--postflop-rollouts" => {
                params.postflop_rollouts = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--seed" => {
                params.seed = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 1;
    }
    Ok(Args { out_dir, params })
}

fn print_help() {
    println!("Build preflop and postflop bucket tables");
    println!();
    println!("Usage: build_buckets [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --out-dir <DIR>            Output directory (default: data)");
    println!("  --preflop-rollouts <N>     Rollouts per canonical hand (default: 1000)");
    println!("  --postflop-samples <N>     Samples per postflop street (default: 5000)");
    println!("  --postflop-rollouts <N>    Rollouts per sample (default: 200)");
    println!("  --seed <N>                 Sampling seed (default: 42)");
}

fn run(args: Args) -> nlhe_blueprint::Result<()> {
    fs::create_dir_all(&args.out_dir)?;

    println!(
        "Building preflop table (169 canonical hands -> {} buckets, {} rollouts each)...",
        PREFLOP_BUCKETS, args.params.preflop_rollouts
    );
    let start = Instant::now();
    let preflop = build_preflop_table(&args.params);
    let preflop_path = format!("{}/preflop_buckets.json", args.out_dir);
    preflop.save(&preflop_path)?;
    println!("  {} written in {:.1}s", preflop_path, start.elapsed().as_secs_f64());

    println!(
        "Building postflop tables ({} samples x {} rollouts -> {} clusters per street)...",
        args.params.postflop_samples, args.params.postflop_rollouts, POSTFLOP_BUCKETS
    );
    let start = Instant::now();
    let postflop = build_postflop_table(&args.params);
    let postflop_path = format!("{}/postflop_buckets.json", args.out_dir);
    postflop.save(&postflop_path)?;
    println!("  {} written in {:.1}s", postflop_path, start.elapsed().as_secs_f64());

    println!("Done.");
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
