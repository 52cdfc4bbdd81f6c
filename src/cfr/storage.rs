//! Storage for cumulative regrets and strategy sums.
//!
//! One fixed-size entry per information set, created lazily on first visit.
//! The map is shared across worker threads; `DashMap` gives per-entry
//! (sharded) locking, so concurrent traversals only contend when they touch
//! the same info set. MCCFR tolerates the slightly stale reads this allows.

use dashmap::DashMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use std::hash::BuildHasherDefault;

use crate::cfr::game::{ActionMask, InfoKey, NUM_ACTIONS};

type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Cumulative regrets and strategy mass for one information set.
///
/// Fixed-size arrays over the 10-slot action alphabet; slots outside a
/// node's legal mask stay at zero for the entry's whole lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegretEntry {
    /// Cumulative counterfactual regret per action.
    pub regrets: [f64; NUM_ACTIONS],
    /// Cumulative (weighted) strategy mass per action. Non-negative and
    /// non-decreasing.
    pub strategy_sum: [f64; NUM_ACTIONS],
}

impl Default for RegretEntry {
    fn default() -> Self {
        Self {
            regrets: [0.0; NUM_ACTIONS],
            strategy_sum: [0.0; NUM_ACTIONS],
        }
    }
}

/// Map from info-set key to [`RegretEntry`], grown lazily during training.
#[derive(Debug, Default)]
pub struct RegretStorage {
    entries: DashMap<InfoKey, RegretEntry, FxBuildHasher>,
}

/// Uniform distribution over the legal actions of `mask`.
fn uniform(mask: ActionMask) -> [f64; NUM_ACTIONS] {
    let mut out = [0.0; NUM_ACTIONS];
    let p = 1.0 / mask.len() as f64;
    for a in mask.iter() {
        out[a as usize] = p;
    }
    out
}

impl RegretStorage {
    /// Create empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create storage pre-sized for an expected info-set count.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::with_capacity_and_hasher(capacity, FxBuildHasher::default()),
        }
    }

    /// Current strategy via regret matching: probability proportional to
    /// positive regret over the legal mask, uniform when no regret is
    /// positive. Illegal actions get probability 0.
    pub fn current_strategy(&self, key: &InfoKey, mask: ActionMask) -> [f64; NUM_ACTIONS] {
        debug_assert!(!mask.is_empty());
        match self.entries.get(key) {
            Some(entry) => {
                let mut strategy = [0.0; NUM_ACTIONS];
                let mut total = 0.0;
                for a in mask.iter() {
                    let r = entry.regrets[a as usize].max(0.0);
                    strategy[a as usize] = r;
                    total += r;
                }
                if total > 0.0 {
                    for a in mask.iter() {
                        strategy[a as usize] /= total;
                    }
                    strategy
                } else {
                    uniform(mask)
                }
            }
            None => uniform(mask),
        }
    }

    /// Snapshot of the cumulative regrets for a key, zeros when unseen.
    /// Used by the pruning check.
    pub fn regret_snapshot(&self, key: &InfoKey) -> [f64; NUM_ACTIONS] {
        self.entries
            .get(key)
            .map(|e| e.regrets)
            .unwrap_or([0.0; NUM_ACTIONS])
    }

    /// Add `delta[a]` to the cumulative regret of each legal action.
    /// The caller applies the iteration weight before calling.
    pub fn accumulate_regret(&self, key: &InfoKey, delta: &[f64; NUM_ACTIONS], mask: ActionMask) {
        let mut entry = self.entries.entry(key.clone()).or_default();
        for a in mask.iter() {
            entry.regrets[a as usize] += delta[a as usize];
        }
    }

    /// Add `weight * strategy[a]` to the strategy sum of each legal action.
    pub fn accumulate_strategy(
        &self,
        key: &InfoKey,
        strategy: &[f64; NUM_ACTIONS],
        weight: f64,
        mask: ActionMask,
    ) {
        let mut entry = self.entries.entry(key.clone()).or_default();
        for a in mask.iter() {
            entry.strategy_sum[a as usize] += weight * strategy[a as usize];
        }
    }

    /// Average strategy over the legal mask: strategy sums normalized, with
    /// a uniform fallback when the entry is unseen or all-zero.
    pub fn average_strategy(&self, key: &InfoKey, mask: ActionMask) -> [f64; NUM_ACTIONS] {
        debug_assert!(!mask.is_empty());
        match self.entries.get(key) {
            Some(entry) => {
                let total: f64 = mask.iter().map(|a| entry.strategy_sum[a as usize]).sum();
                if total > 0.0 {
                    let mut out = [0.0; NUM_ACTIONS];
                    for a in mask.iter() {
                        out[a as usize] = entry.strategy_sum[a as usize] / total;
                    }
                    out
                } else {
                    uniform(mask)
                }
            }
            None => uniform(mask),
        }
    }

    /// Average strategy normalized over every nonzero slot, without a mask.
    /// Returns `None` for unseen or never-updated entries. Used when
    /// extracting the blueprint, where the legal mask is not available but
    /// illegal slots are zero by construction.
    pub fn normalized_strategy_sum(&self, key: &InfoKey) -> Option<[f64; NUM_ACTIONS]> {
        let entry = self.entries.get(key)?;
        let total: f64 = entry.strategy_sum.iter().sum();
        if total <= 0.0 {
            return None;
        }
        let mut out = [0.0; NUM_ACTIONS];
        for (o, s) in out.iter_mut().zip(entry.strategy_sum.iter()) {
            *o = s / total;
        }
        Some(out)
    }

    /// Number of information sets discovered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no information set has been visited.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Sum over entries of the mean positive regret, for progress reporting.
    pub fn total_positive_regret(&self) -> f64 {
        self.entries
            .iter()
            .map(|e| {
                e.regrets.iter().map(|r| r.max(0.0)).sum::<f64>() / NUM_ACTIONS as f64
            })
            .sum()
    }

    /// Export every entry, sorted by key so serialized output is
    /// deterministic for a given table state.
    pub fn export(&self) -> Vec<(InfoKey, RegretEntry)> {
        let mut out: Vec<(InfoKey, RegretEntry)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Replace the table contents with an exported entry list.
    pub fn import(&self, entries: Vec<(InfoKey, RegretEntry)>) {
        self.entries.clear();
        for (key, entry) in entries {
            self.entries.insert(key, entry);
        }
    }

    /// Visit every `(key, normalized average strategy)` pair that carries
    /// strategy mass.
    pub fn for_each_average<F: FnMut(&InfoKey, [f64; NUM_ACTIONS])>(&self, mut f: F) {
        for e in self.entries.iter() {
            let total: f64 = e.strategy_sum.iter().sum();
            if total <= 0.0 {
                continue;
            }
            let mut avg = [0.0; NUM_ACTIONS];
            for (o, s) in avg.iter_mut().zip(e.strategy_sum.iter()) {
                *o = s / total;
            }
            f(e.key(), avg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(bucket: u16) -> InfoKey {
        InfoKey::new(bucket, vec![])
    }

    fn mask(ids: &[u8]) -> ActionMask {
        ids.iter().copied().collect()
    }

    #[test]
    fn unseen_key_yields_uniform_over_mask() {
        let storage = RegretStorage::new();
        let m = mask(&[0, 1, 9]);
        let s = storage.current_strategy(&key(0), m);
        assert!((s[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((s[1] - 1.0 / 3.0).abs() < 1e-12);
        assert!((s[9] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(s[2], 0.0);
    }

    #[test]
    fn regret_matching_is_a_distribution() {
        let storage = RegretStorage::new();
        let k = key(1);
        let m = mask(&[0, 1, 2]);
        let mut delta = [0.0; NUM_ACTIONS];
        delta[0] = 3.0;
        delta[1] = -5.0;
        delta[2] = 1.0;
        storage.accumulate_regret(&k, &delta, m);

        let s = storage.current_strategy(&k, m);
        let total: f64 = s.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!((s[0] - 0.75).abs() < 1e-12);
        assert_eq!(s[1], 0.0);
        assert!((s[2] - 0.25).abs() < 1e-12);
        // Illegal slots carry nothing.
        assert_eq!(s[5], 0.0);
    }

    #[test]
    fn all_negative_regret_falls_back_to_uniform() {
        let storage = RegretStorage::new();
        let k = key(2);
        let m = mask(&[0, 1]);
        let mut delta = [0.0; NUM_ACTIONS];
        delta[0] = -1.0;
        delta[1] = -2.0;
        storage.accumulate_regret(&k, &delta, m);
        let s = storage.current_strategy(&k, m);
        assert!((s[0] - 0.5).abs() < 1e-12);
        assert!((s[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn strategy_sum_accumulates_with_weight() {
        let storage = RegretStorage::new();
        let k = key(3);
        let m = mask(&[0, 1]);
        let mut sigma = [0.0; NUM_ACTIONS];
        sigma[0] = 0.25;
        sigma[1] = 0.75;
        storage.accumulate_strategy(&k, &sigma, 2.0, m);
        storage.accumulate_strategy(&k, &sigma, 4.0, m);

        let avg = storage.average_strategy(&k, m);
        assert!((avg[0] - 0.25).abs() < 1e-12);
        assert!((avg[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn export_import_round_trip_preserves_entries() {
        let storage = RegretStorage::new();
        let m = mask(&[0, 1]);
        for bucket in 0..5u16 {
            let mut delta = [0.0; NUM_ACTIONS];
            delta[0] = bucket as f64;
            storage.accumulate_regret(&key(bucket), &delta, m);
        }
        let exported = storage.export();
        assert_eq!(exported.len(), 5);
        // Sorted by key.
        assert!(exported.windows(2).all(|w| w[0].0 < w[1].0));

        let other = RegretStorage::new();
        other.import(exported.clone());
        assert_eq!(other.export().len(), exported.len());
        assert_eq!(other.regret_snapshot(&key(4))[0], 4.0);
    }
}
