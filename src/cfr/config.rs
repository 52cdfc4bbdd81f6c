//! Configuration options for the MCCFR trainer.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::error::{Result, SolverError};

/// Configuration for the MCCFR trainer.
///
/// Controls the CFR variant (linear weighting), regret-based pruning, the
/// worker pool, and reproducibility.
///
/// # Example
/// ```
/// use nlhe_blueprint::cfr::CfrConfig;
///
/// let config = CfrConfig::default().with_seed(42);
/// assert!(config.use_linear_cfr);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CfrConfig {
    /// Weight iteration `t`'s regret and strategy updates by `t` (Linear
    /// CFR). Accelerates convergence; enabled by default.
    pub use_linear_cfr: bool,

    /// Regret threshold below which a traverser action is skipped instead of
    /// explored. `None` disables pruning.
    pub prune_threshold: Option<f64>,

    /// Iterations to run before pruning activates. Early regrets are noisy;
    /// pruning on them would lock out viable actions.
    pub prune_warmup: u64,

    /// Every `prune_reeval_every` iterations (t divisible by it), pruning is
    /// suspended for the whole iteration so deeply negative branches get
    /// re-evaluated and can recover.
    pub prune_reeval_every: u64,

    /// Number of worker threads across traversals. `1` trains sequentially
    /// (and deterministically, given a seed); `0` uses the rayon default.
    pub num_threads: usize,

    /// Base seed for the per-iteration RNG derivation. `None` picks a random
    /// seed at construction.
    pub seed: Option<u64>,
}

impl Default for CfrConfig {
    fn default() -> Self {
        Self {
            use_linear_cfr: true,
            prune_threshold: Some(-300.0),
            prune_warmup: 100,
            prune_reeval_every: 100,
            num_threads: 1,
            seed: None,
        }
    }
}

impl CfrConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Builder method: set the worker count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Builder method: enable or disable linear weighting.
    pub fn with_linear_cfr(mut self, enable: bool) -> Self {
        self.use_linear_cfr = enable;
        self
    }

    /// Builder method: set the pruning threshold.
    pub fn with_prune_threshold(mut self, threshold: f64) -> Self {
        self.prune_threshold = Some(threshold);
        self
    }

    /// Builder method: disable pruning entirely.
    pub fn without_pruning(mut self) -> Self {
        self.prune_threshold = None;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.prune_threshold {
            if t >= 0.0 {
                return Err(SolverError::Config(format!(
                    "prune threshold must be negative, got {}",
                    t
                )));
            }
        }
        if self.prune_reeval_every == 0 {
            return Err(SolverError::Config(
                "prune_reeval_every must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Stable hash of the training-relevant options, stored in checkpoint
    /// and blueprint metadata so a resumed run can detect a config change.
    /// The seed and thread count do not affect what is being solved, so they
    /// are excluded.
    pub fn config_hash(&self) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        self.use_linear_cfr.hash(&mut hasher);
        self.prune_threshold.map(f64::to_bits).hash(&mut hasher);
        self.prune_warmup.hash(&mut hasher);
        self.prune_reeval_every.hash(&mut hasher);
        hasher.finish()
    }
}

/// Statistics tracked across a training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CfrStats {
    /// Total iterations completed (including any resumed-from checkpoint).
    pub iterations: u64,

    /// Unique information sets discovered.
    pub info_sets: usize,

    /// Wall-clock seconds spent in the most recent `train` call.
    pub elapsed_seconds: f64,

    /// Iterations per second over the most recent `train` call.
    pub iterations_per_second: f64,

    /// Average positive regret per info set, normalized by the sum of
    /// iteration weights. Decreases as the strategy converges.
    pub avg_regret: f64,
}

impl CfrStats {
    /// Recompute the iteration rate from elapsed time.
    pub fn update_rate(&mut self, iterations_this_run: u64) {
        if self.elapsed_seconds > 0.0 {
            self.iterations_per_second = iterations_this_run as f64 / self.elapsed_seconds;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CfrConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_positive_prune_threshold() {
        let config = CfrConfig::default().with_prune_threshold(-1.0);
        assert!(config.validate().is_ok());
        let mut bad = CfrConfig::default();
        bad.prune_threshold = Some(5.0);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn config_hash_ignores_seed_and_threads() {
        let a = CfrConfig::default().with_seed(1).with_threads(4);
        let b = CfrConfig::default().with_seed(2);
        assert_eq!(a.config_hash(), b.config_hash());

        let c = CfrConfig::default().without_pruning();
        assert_ne!(a.config_hash(), c.config_hash());
    }
}
