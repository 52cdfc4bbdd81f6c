//! On-disk formats: training checkpoints and the final blueprint.
//!
//! Both are JSON with a format-version header. A checkpoint carries the
//! full regret table so training can resume; a blueprint carries only the
//! normalized average strategies plus metadata, and is what the evaluator
//! consumes. Entries are sorted by key before serialization, so saving the
//! same table twice produces byte-identical files.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cfr::game::{Game, InfoKey, NUM_ACTIONS};
use crate::cfr::solver::CfrTrainer;
use crate::cfr::storage::RegretEntry;
use crate::error::{read_json, write_json, Result, SolverError};

/// Format version written into checkpoint and blueprint headers.
pub const FORMAT_VERSION: u32 = 1;

/// Full training state: regret table plus the counters needed to continue
/// exactly where the run left off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// On-disk format version.
    pub format_version: u32,
    /// Iterations completed when the checkpoint was taken.
    pub iteration: u64,
    /// Base seed of the run, so a resumed run replays the same hand
    /// sequence an uninterrupted run would have seen.
    pub base_seed: u64,
    /// Hash of the training-relevant configuration.
    pub config_hash: u64,
    /// Every info-set entry, sorted by key.
    pub entries: Vec<(InfoKey, RegretEntry)>,
}

impl Checkpoint {
    /// Write to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        write_json(path, self)?;
        log::info!(
            "saved checkpoint to {} ({} info sets, iteration {})",
            path,
            self.entries.len(),
            self.iteration
        );
        Ok(())
    }

    /// Read from a JSON file, rejecting unknown format versions.
    pub fn load(path: &str) -> Result<Self> {
        let checkpoint: Self = read_json(path)?;
        if checkpoint.format_version != FORMAT_VERSION {
            return Err(SolverError::FormatVersion {
                path: path.to_string(),
                found: checkpoint.format_version,
                expected: FORMAT_VERSION,
            });
        }
        log::info!(
            "loaded checkpoint from {} ({} info sets, iteration {})",
            path,
            checkpoint.entries.len(),
            checkpoint.iteration
        );
        Ok(checkpoint)
    }
}

/// Blueprint metadata block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintMeta {
    /// Iterations the strategy was trained for.
    pub iterations: u64,
    /// Unix timestamp of extraction.
    pub timestamp: u64,
    /// Hash of the training-relevant configuration.
    pub config_hash: u64,
}

/// The frozen average strategy: one probability vector per info set, with
/// illegal-action slots at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    /// On-disk format version.
    pub format_version: u32,
    /// Training provenance.
    pub meta: BlueprintMeta,
    /// `(key, average strategy)` pairs, sorted by key.
    pub strategies: Vec<(InfoKey, [f64; NUM_ACTIONS])>,
}

impl Blueprint {
    /// Write to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        write_json(path, self)?;
        log::info!(
            "saved blueprint to {} ({} info sets)",
            path,
            self.strategies.len()
        );
        Ok(())
    }

    /// Read from a JSON file, rejecting unknown format versions.
    pub fn load(path: &str) -> Result<Self> {
        let blueprint: Self = read_json(path)?;
        if blueprint.format_version != FORMAT_VERSION {
            return Err(SolverError::FormatVersion {
                path: path.to_string(),
                found: blueprint.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(blueprint)
    }
}

impl<G: Game> CfrTrainer<G> {
    /// Snapshot the full training state.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            format_version: FORMAT_VERSION,
            iteration: self.iteration(),
            base_seed: self.base_seed(),
            config_hash: self.config().config_hash(),
            entries: self.storage().export(),
        }
    }

    /// Adopt a checkpoint: iteration counter, seed, and table. A config
    /// hash mismatch is tolerated (resuming under new hyperparameters is a
    /// deliberate choice) but logged.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        if checkpoint.config_hash != self.config().config_hash() {
            log::warn!(
                "checkpoint was trained under a different configuration \
                 (hash {:x} vs {:x}); continuing anyway",
                checkpoint.config_hash,
                self.config().config_hash()
            );
        }
        self.restore_parts(checkpoint.iteration, checkpoint.base_seed, checkpoint.entries);
    }

    /// Extract the frozen average strategy. Info sets that never received
    /// strategy mass are omitted; consumers fall back to uniform there.
    pub fn blueprint(&self) -> Blueprint {
        let mut strategies: Vec<(InfoKey, [f64; NUM_ACTIONS])> = Vec::new();
        self.storage().for_each_average(|key, avg| {
            strategies.push((key.clone(), avg));
        });
        strategies.sort_by(|a, b| a.0.cmp(&b.0));
        Blueprint {
            format_version: FORMAT_VERSION,
            meta: BlueprintMeta {
                iterations: self.iteration(),
                timestamp: SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0),
                config_hash: self.config().config_hash(),
            },
            strategies,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::config::CfrConfig;
    use crate::games::kuhn::KuhnGame;

    #[test]
    fn checkpoint_round_trip_resumes_exactly() {
        let config = CfrConfig::default().with_seed(99);

        // 40 iterations straight through.
        let mut straight = CfrTrainer::new(KuhnGame::new(), config.clone());
        straight.train(40);

        // 20, checkpoint, restore into a fresh trainer, 20 more.
        let mut first = CfrTrainer::new(KuhnGame::new(), config.clone());
        first.train(20);
        let checkpoint = first.checkpoint();

        let mut resumed = CfrTrainer::new(KuhnGame::new(), config);
        resumed.restore(checkpoint);
        assert_eq!(resumed.iteration(), 20);
        resumed.train(20);

        // Same seed schedule and sequential order: tables match exactly.
        let a = straight.storage().export();
        let b = resumed.storage().export();
        assert_eq!(a.len(), b.len());
        for ((ka, ea), (kb, eb)) in a.iter().zip(b.iter()) {
            assert_eq!(ka, kb);
            assert_eq!(ea.regrets, eb.regrets);
            assert_eq!(ea.strategy_sum, eb.strategy_sum);
        }
    }

    #[test]
    fn nlhe_training_resumes_identically() {
        use crate::games::nlhe::NlheGame;

        let config = CfrConfig::default().with_seed(123);

        let mut straight = CfrTrainer::new(NlheGame::default(), config.clone());
        straight.train(20);

        let mut first = CfrTrainer::new(NlheGame::default(), config.clone());
        first.train(10);
        let checkpoint = first.checkpoint();
        let mut resumed = CfrTrainer::new(NlheGame::default(), config);
        resumed.restore(checkpoint);
        resumed.train(10);

        let a = straight.storage().export();
        let b = resumed.storage().export();
        assert_eq!(a.len(), b.len());
        for ((ka, ea), (kb, eb)) in a.iter().zip(b.iter()) {
            assert_eq!(ka, kb);
            assert_eq!(ea.regrets, eb.regrets);
            assert_eq!(ea.strategy_sum, eb.strategy_sum);
        }
    }

    #[test]
    fn strategy_sums_never_decrease() {
        let mut trainer = CfrTrainer::new(KuhnGame::new(), CfrConfig::default().with_seed(17));
        trainer.train(100);
        let before: Vec<_> = trainer.storage().export();
        trainer.train(100);
        let after = trainer.storage().export();

        for (key, entry) in &before {
            let later = after
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, e)| e)
                .expect("info set vanished");
            for (old, new) in entry.strategy_sum.iter().zip(later.strategy_sum.iter()) {
                assert!(new >= old, "strategy sum decreased at {}", key);
            }
        }
    }

    #[test]
    fn blueprint_slots_are_distributions() {
        let mut trainer = CfrTrainer::new(KuhnGame::new(), CfrConfig::default().with_seed(5));
        trainer.train(200);
        let blueprint = trainer.blueprint();
        assert!(!blueprint.strategies.is_empty());
        assert_eq!(blueprint.meta.iterations, 200);
        for (_, strategy) in &blueprint.strategies {
            let total: f64 = strategy.iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
            assert!(strategy.iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn zero_extra_iterations_reserializes_identically() {
        let mut trainer = CfrTrainer::new(KuhnGame::new(), CfrConfig::default().with_seed(5));
        trainer.train(50);
        let checkpoint = trainer.checkpoint();
        let first = serde_json::to_string(&checkpoint).unwrap();

        let mut reloaded = CfrTrainer::new(KuhnGame::new(), CfrConfig::default().with_seed(5));
        reloaded.restore(serde_json::from_str(&first).unwrap());
        reloaded.train(0);
        let second = serde_json::to_string(&reloaded.checkpoint()).unwrap();
        assert_eq!(first, second);
    }
}
