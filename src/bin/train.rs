//! MCCFR blueprint training binary.
//!
//! Usage:
//!   cargo run --release --bin train -- [OPTIONS]
//!
//! Options:
//!   -n, --iterations <N>       Training iterations (default: 100000)
//!   -o, --out <PATH>           Blueprint output path (default: blueprint.json)
//!   -l, --load <PATH>          Resume from a checkpoint
//!       --checkpoint-every <K> Save a checkpoint every K iterations
//!       --buckets <DIR>        Bucket table directory (default: data)
//!       --log-interval <K>     Progress line every K iterations (default: 1000)
//!   -s, --seed <N>             Random seed
//!   -t, --threads <N>          Worker threads (default: 1)
//!       --no-prune             Disable regret pruning

use std::env;
use std::process;
use std::time::Instant;

use nlhe_blueprint::cfr::{CfrConfig, CfrStats, CfrTrainer, Checkpoint};
use nlhe_blueprint::games::nlhe::{Bucketing, NlheConfig, NlheGame};

struct Args {
    iterations: u64,
    out: String,
    load: Option<String>,
    checkpoint_every: u64,
    buckets_dir: String,
    log_interval: u64,
    seed: Option<u64>,
    threads: usize,
    no_prune: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        iterations: 100_000,
        out: "blueprint.json".to_string(),
        load: None,
        checkpoint_every: 0,
        buckets_dir: "data".to_string(),
        log_interval: 1_000,
        seed: None,
        threads: 1,
        no_prune: false,
    };

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
            "--iterations" | "-n" => {
                args.iterations = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--out" | "-o" => args.out = value(&mut i)?,
            "--load" | "-l" => args.load = Some(value(&mut i)?),
            "--checkpoint-every" => {
                args.checkpoint_every = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--buckets" => args.buckets_dir = value(&mut i)?,
            "--log-interval" => {
                args.log_interval = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--seed" | "-s" => {
                args.seed = Some(value(&mut i)?.parse().map_err(|e| format!("{}", e))?);
            }
            "--threads" | "-t" => {
                args.threads = value(&mut i)?.parse().map_err(|e| format!("{}", e))?;
            }
            "--no-prune" => args.no_prune = true,
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
        i += 1;
    }
    Ok(args)
}

fn print_help() {
    println!("MCCFR blueprint training for 3-player 20bb NLHE");
    println!();
    println!("Usage: train [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -n, --iterations <N>       Training iterations (default: 100000)");
    println!("  -o, --out <PATH>           Blueprint output path (default: blueprint.json)");
    println!("  -l, --load <PATH>          Resume from a checkpoint");
    println!("      --checkpoint-every <K> Save a checkpoint every K iterations");
    println!("      --buckets <DIR>        Bucket table directory (default: data)");
    println!("      --log-interval <K>     Progress line every K iterations");
    println!("  -s, --seed <N>             Random seed");
    println!("  -t, --threads <N>          Worker threads (default: 1)");
    println!("      --no-prune             Disable regret pruning");
    println!();
    println!("Examples:");
    println!("  train -n 100000 -o output/blueprint.json --checkpoint-every 10000");
    println!("  train --load output/checkpoint.json -n 50000 -o output/blueprint.json");
}

fn run(args: Args) -> nlhe_blueprint::Result<()> {
    let mut config = CfrConfig::default().with_threads(args.threads);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.no_prune {
        config = config.without_pruning();
    }
    config.validate()?;

    let bucketing = Bucketing::load_or_heuristic(
        &format!("{}/preflop_buckets.json", args.buckets_dir),
        &format!("{}/postflop_buckets.json", args.buckets_dir),
    );
    let game = NlheGame::new(NlheConfig::default(), bucketing);
    let mut trainer = CfrTrainer::new(game, config);

    if let Some(load_path) = &args.load {
        // A requested checkpoint that fails to load is fatal; silently
        // starting fresh would discard the work the user asked to resume.
        let checkpoint = Checkpoint::load(load_path)?;
        trainer.restore(checkpoint);
        println!(
            "Resuming from {} at iteration {}",
            load_path,
            trainer.iteration()
        );
    }

    println!("============================================================");
    println!("  3-Player NLHE — MCCFR Blueprint Training");
    println!("============================================================");
    println!("Iterations: {} (starting at {})", args.iterations, trainer.iteration());
    println!("Threads:    {}", args.threads);
    if let Some(seed) = args.seed {
        println!("Seed:       {}", seed);
    }
    println!("Pruning:    {}", if args.no_prune { "off" } else { "on" });
    println!();

    let checkpoint_path = checkpoint_path_for(&args.out);
    let start = Instant::now();
    let mut remaining = args.iterations;
    let chunk = if args.checkpoint_every > 0 {
        args.checkpoint_every
    } else {
        args.iterations
    };

    let mut progress = |stats: &CfrStats| {
        println!(
            "Iteration {:>9} | Info sets: {:>9} | Avg regret: {:>10.6} | {:>6.0} it/s",
            stats.iterations, stats.info_sets, stats.avg_regret, stats.iterations_per_second
        );
    };

    while remaining > 0 {
        let step = chunk.min(remaining);
        if args.threads == 1 {
            trainer.train_with_callback(step, args.log_interval, &mut progress);
        } else {
            // The parallel path reports once per chunk.
            let stats = trainer.train(step);
            progress(stats);
        }
        remaining -= step;

        if args.checkpoint_every > 0 && remaining > 0 {
            // A failed checkpoint write is logged, not fatal; the next
            // boundary retries.
            if let Err(e) = trainer.checkpoint().save(&checkpoint_path) {
                log::error!("checkpoint save failed: {}", e);
            }
        }
    }

    println!();
    println!("Training complete: {} total iterations in {:.1}s", trainer.iteration(), start.elapsed().as_secs_f64());
    println!("Info sets: {}", trainer.num_info_sets());

    trainer.checkpoint().save(&checkpoint_path)?;
    trainer.blueprint().save(&args.out)?;
    println!("Blueprint written to {}", args.out);
    Ok(())
}

/// Checkpoint path derived from the blueprint path.
fn checkpoint_path_for(out: &str) -> String {
    match out.strip_suffix(".json") {
        Some(stem) => format!("{}.checkpoint.json", stem),
        None => format!("{}.checkpoint", out),
    }
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
