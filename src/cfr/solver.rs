//! External-sampling MCCFR trainer.
//!
//! Each iteration runs one traversal per traverser p in {0, 1, 2}. During a
//! traversal, every decision node owned by p explores all legal actions;
//! every other player's node samples a single action from that player's
//! current strategy; every chance node samples a single outcome. Regret and
//! strategy updates are weighted by the iteration index (Linear CFR), and
//! actions whose cumulative regret has fallen below a threshold are pruned
//! from exploration.
//!
//! The game state is mutated in place and restored through undo tokens, so
//! a whole traversal runs without per-node allocation. Randomness is
//! derived per iteration from a base seed, which makes runs reproducible
//! independent of worker scheduling and makes a resumed run identical to an
//! uninterrupted one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::cfr::config::{CfrConfig, CfrStats};
use crate::cfr::game::{ActionMask, Game, InfoKey, NUM_ACTIONS, NUM_PLAYERS};
use crate::cfr::storage::RegretStorage;

/// Multiplier for deriving per-iteration seeds (splitmix64 constant).
const SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// The MCCFR trainer, generic over any [`Game`] implementation.
///
/// # Example
/// ```ignore
/// let game = KuhnGame::new();
/// let mut trainer = CfrTrainer::new(game, CfrConfig::default().with_seed(42));
/// trainer.train(10_000);
/// let blueprint = trainer.blueprint();
/// ```
pub struct CfrTrainer<G: Game> {
    game: G,
    config: CfrConfig,
    storage: RegretStorage,
    iteration: u64,
    base_seed: u64,
    stats: CfrStats,
}

impl<G: Game> CfrTrainer<G> {
    /// Create a trainer for `game` with the given configuration.
    pub fn new(game: G, config: CfrConfig) -> Self {
        let base_seed = config.seed.unwrap_or_else(|| StdRng::from_entropy().gen());
        Self {
            game,
            config,
            storage: RegretStorage::new(),
            iteration: 0,
            base_seed,
            stats: CfrStats::default(),
        }
    }

    /// Create a trainer with storage pre-sized for an expected info-set
    /// count.
    pub fn with_capacity(game: G, config: CfrConfig, capacity: usize) -> Self {
        let base_seed = config.seed.unwrap_or_else(|| StdRng::from_entropy().gen());
        Self {
            game,
            config,
            storage: RegretStorage::with_capacity(capacity),
            iteration: 0,
            base_seed,
            stats: CfrStats::default(),
        }
    }

    /// RNG for iteration `t`, derived from the base seed only. Iteration t
    /// samples the same hands whether the run was resumed, sequential, or
    /// parallel.
    fn rng_for_iteration(&self, t: u64) -> StdRng {
        StdRng::seed_from_u64(self.base_seed ^ t.wrapping_mul(SEED_STRIDE))
    }

    /// Run a single iteration: one external-sampling traversal per
    /// traverser.
    pub fn run_iteration(&mut self) {
        let t = self.iteration + 1;
        self.iteration = t;
        self.run_single(t);
    }

    fn run_single(&self, t: u64) {
        let mut rng = self.rng_for_iteration(t);
        for traverser in 0..NUM_PLAYERS {
            let mut state = self.game.deal_new_hand(&mut rng);
            self.traverse(&mut state, traverser, &mut rng, t, true);
        }
    }

    /// Train for `iterations` additional iterations, sequentially or on a
    /// worker pool per the configuration.
    pub fn train(&mut self, iterations: u64) -> &CfrStats {
        let start = Instant::now();
        if self.config.num_threads == 1 {
            for _ in 0..iterations {
                self.run_iteration();
            }
        } else {
            self.train_parallel(iterations);
        }
        self.finish_stats(start, iterations);
        &self.stats
    }

    /// Train with a progress callback every `callback_interval` iterations.
    /// Sequential only; the parallel path reports once at the end.
    pub fn train_with_callback<F>(
        &mut self,
        iterations: u64,
        callback_interval: u64,
        mut callback: F,
    ) -> &CfrStats
    where
        F: FnMut(&CfrStats),
    {
        let start = Instant::now();
        for i in 0..iterations {
            self.run_iteration();
            if callback_interval > 0 && (i + 1) % callback_interval == 0 {
                self.finish_stats(start, i + 1);
                callback(&self.stats);
            }
        }
        self.finish_stats(start, iterations);
        &self.stats
    }

    /// Distribute iterations over a worker pool. Workers pull iteration
    /// indices from a shared counter; each iteration keeps its own RNG and
    /// its own weight, so linear weighting reflects the iteration index,
    /// not wall-clock order.
    fn train_parallel(&mut self, iterations: u64) {
        let end = self.iteration + iterations;
        let next = AtomicU64::new(self.iteration);
        let workers = if self.config.num_threads == 0 {
            rayon::current_num_threads()
        } else {
            self.config.num_threads
        };
        let this: &Self = self;
        rayon::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|_| loop {
                    let t = next.fetch_add(1, Ordering::Relaxed) + 1;
                    if t > end {
                        break;
                    }
                    this.run_single(t);
                });
            }
        });
        self.iteration = end;
    }

    fn finish_stats(&mut self, start: Instant, iterations_this_run: u64) {
        self.stats.iterations = self.iteration;
        self.stats.info_sets = self.storage.len();
        self.stats.elapsed_seconds = start.elapsed().as_secs_f64();
        self.stats.update_rate(iterations_this_run);
        self.stats.avg_regret = self.average_positive_regret();
    }

    /// Core traversal. Returns the expected utility of `state` for the
    /// traverser. `first_self` is true until the traverser's first decision
    /// node has been handled; pruning is never applied there.
    fn traverse(
        &self,
        state: &mut G::State,
        traverser: usize,
        rng: &mut StdRng,
        t: u64,
        first_self: bool,
    ) -> f64 {
        if self.game.is_terminal(state) {
            return self.game.payoffs(state)[traverser];
        }

        if self.game.is_chance_node(state) {
            let undo = self.game.sample_chance(state, rng);
            let value = self.traverse(state, traverser, rng, t, first_self);
            self.game.undo_action(state, undo);
            return value;
        }

        let player = match self.game.current_player(state) {
            Some(p) => p,
            None => return self.game.payoffs(state)[traverser],
        };

        let mask = self.game.legal_actions(state);
        debug_assert!(!mask.is_empty(), "no legal actions at a decision node");

        let key = self.game.info_key(state, player);
        let strategy = self.storage.current_strategy(&key, mask);

        if player == traverser {
            self.traverse_self(state, traverser, rng, t, &key, mask, &strategy, first_self)
        } else {
            // External sampling: one opponent action from their current
            // strategy.
            let action = sample_action(&strategy, mask, rng);
            let undo = self.game.apply_action(state, action);
            let value = self.traverse(state, traverser, rng, t, first_self);
            self.game.undo_action(state, undo);
            value
        }
    }

    /// Traverser node: explore all legal actions (minus pruned ones),
    /// accumulate weighted regrets and strategy mass.
    #[allow(clippy::too_many_arguments)]
    fn traverse_self(
        &self,
        state: &mut G::State,
        traverser: usize,
        rng: &mut StdRng,
        t: u64,
        key: &InfoKey,
        mask: ActionMask,
        strategy: &[f64; NUM_ACTIONS],
        first_self: bool,
    ) -> f64 {
        let pruned = self.pruned_actions(key, mask, t, first_self);

        let mut values = [0.0; NUM_ACTIONS];
        for action in mask.iter() {
            if pruned.contains(action) {
                // Skipped branch counts as zero value this visit.
                continue;
            }
            let undo = self.game.apply_action(state, action);
            values[action as usize] = self.traverse(state, traverser, rng, t, false);
            self.game.undo_action(state, undo);
        }

        let ev: f64 = mask
            .iter()
            .map(|a| strategy[a as usize] * values[a as usize])
            .sum();

        let weight = if self.config.use_linear_cfr { t as f64 } else { 1.0 };

        let mut delta = [0.0; NUM_ACTIONS];
        for a in mask.iter() {
            delta[a as usize] = (values[a as usize] - ev) * weight;
        }
        self.storage.accumulate_regret(key, &delta, mask);
        self.storage.accumulate_strategy(key, strategy, weight, mask);

        ev
    }

    /// Actions to skip at a traverser node. Empty during warm-up, on
    /// re-evaluation iterations, at the traversal's first own decision
    /// node, and whenever pruning would leave nothing to explore.
    fn pruned_actions(
        &self,
        key: &InfoKey,
        mask: ActionMask,
        t: u64,
        first_self: bool,
    ) -> ActionMask {
        let threshold = match self.config.prune_threshold {
            Some(threshold) => threshold,
            None => return ActionMask::EMPTY,
        };
        if first_self || t <= self.config.prune_warmup || t % self.config.prune_reeval_every == 0 {
            return ActionMask::EMPTY;
        }
        let regrets = self.storage.regret_snapshot(key);
        let mut pruned = ActionMask::EMPTY;
        for a in mask.iter() {
            if regrets[a as usize] < threshold {
                pruned.insert(a);
            }
        }
        if pruned.len() == mask.len() {
            return ActionMask::EMPTY;
        }
        pruned
    }

    /// Average positive regret per info set, normalized by the sum of
    /// iteration weights (t(t+1)/2 under linear weighting). An upper-bound
    /// proxy for exploitability.
    pub fn average_positive_regret(&self) -> f64 {
        if self.iteration == 0 || self.storage.is_empty() {
            return 0.0;
        }
        let weight_sum = if self.config.use_linear_cfr {
            (self.iteration * (self.iteration + 1)) as f64 / 2.0
        } else {
            self.iteration as f64
        };
        self.storage.total_positive_regret() / self.storage.len() as f64 / weight_sum
    }

    /// Average strategy for an info set over a legal mask.
    pub fn average_strategy(&self, key: &InfoKey, mask: ActionMask) -> [f64; NUM_ACTIONS] {
        self.storage.average_strategy(key, mask)
    }

    /// Completed iteration count.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Number of information sets discovered.
    pub fn num_info_sets(&self) -> usize {
        self.storage.len()
    }

    /// The underlying regret table.
    pub fn storage(&self) -> &RegretStorage {
        &self.storage
    }

    /// The game being trained.
    pub fn game(&self) -> &G {
        &self.game
    }

    /// The active configuration.
    pub fn config(&self) -> &CfrConfig {
        &self.config
    }

    /// Statistics from the most recent `train` call.
    pub fn stats(&self) -> &CfrStats {
        &self.stats
    }

    /// Base seed in effect (from the config, a checkpoint, or entropy).
    pub fn base_seed(&self) -> u64 {
        self.base_seed
    }

    /// Restore iteration counter, seed, and table from checkpoint fields.
    /// Used by [`crate::cfr::blueprint::Checkpoint::restore`].
    pub(crate) fn restore_parts(
        &mut self,
        iteration: u64,
        base_seed: u64,
        entries: Vec<(InfoKey, crate::cfr::storage::RegretEntry)>,
    ) {
        self.iteration = iteration;
        self.base_seed = base_seed;
        self.storage.import(entries);
    }
}

/// Sample an action id from a strategy restricted to a mask. Falls back to
/// the last legal action on floating-point shortfall.
fn sample_action<R: Rng>(strategy: &[f64; NUM_ACTIONS], mask: ActionMask, rng: &mut R) -> u8 {
    let r: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut last = 0;
    for a in mask.iter() {
        cumulative += strategy[a as usize];
        last = a;
        if r < cumulative {
            return a;
        }
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_action_respects_mask() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut strategy = [0.0; NUM_ACTIONS];
        strategy[1] = 0.5;
        strategy[9] = 0.5;
        let mask: ActionMask = [1u8, 9].into_iter().collect();
        for _ in 0..100 {
            let a = sample_action(&strategy, mask, &mut rng);
            assert!(a == 1 || a == 9);
        }
    }

    #[test]
    fn sample_action_degenerate_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut strategy = [0.0; NUM_ACTIONS];
        strategy[4] = 1.0;
        let mask: ActionMask = [0u8, 4].into_iter().collect();
        for _ in 0..20 {
            assert_eq!(sample_action(&strategy, mask, &mut rng), 4);
        }
    }
}
