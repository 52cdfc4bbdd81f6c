//! Offline construction of the bucket tables.
//!
//! Preflop: every canonical starting hand is rolled out against one random
//! opponent, then the 169 hands are split into 15 equal-frequency buckets
//! by equity. Postflop: sampled (hole, board) pairs are rolled out to an
//! equity estimate, and a one-dimensional k-means produces 50 cluster
//! centers per street; lookups later assign hands to the nearest center.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use super::bucketing::{
    estimate_equity, PostflopTable, PreflopTable, LOOKUP_ROLLOUTS, POSTFLOP_BUCKETS,
    PREFLOP_BUCKETS, TABLE_FORMAT_VERSION,
};
use super::card::{Card, Deck, HoleCards, NUM_CANONICAL_HANDS};
use super::hand_eval::evaluate_hand;
use super::state::Street;

/// Parameters for table construction.
#[derive(Debug, Clone)]
pub struct BuildParams {
    /// Monte Carlo rollouts per preflop canonical hand.
    pub preflop_rollouts: usize,
    /// Sampled (hole, board) pairs per postflop street.
    pub postflop_samples: usize,
    /// Monte Carlo rollouts per postflop sample.
    pub postflop_rollouts: usize,
    /// Base seed for sampling.
    pub seed: u64,
}

impl Default for BuildParams {
    fn default() -> Self {
        Self {
            preflop_rollouts: 1_000,
            postflop_samples: 5_000,
            postflop_rollouts: 200,
            seed: 42,
        }
    }
}

/// One representative pair of cards per canonical hand class, in canonical
/// id order: pairs first, then suited/offsuit combos per (high, low).
fn enumerate_canonical_hands() -> Vec<HoleCards> {
    let mut hands = Vec::with_capacity(NUM_CANONICAL_HANDS);
    for rank in 0..13u8 {
        hands.push([Card::new(rank, 0), Card::new(rank, 1)]);
    }
    for high in 1..13u8 {
        for low in 0..high {
            hands.push([Card::new(high, 0), Card::new(low, 0)]);
            hands.push([Card::new(high, 0), Card::new(low, 1)]);
        }
    }
    hands
}

/// All-in equity of a starting hand against one random opponent over a
/// random runout.
fn preflop_equity(hole: HoleCards, rollouts: usize, rng: &mut StdRng) -> f64 {
    let mut live = Deck::shuffled_without(&hole, rng);
    let mut score = 0.0;
    for _ in 0..rollouts {
        live.partial_shuffle(rng, 7);
        let opponent = [live[0], live[1]];
        let board = &live[2..7];
        let mine = evaluate_hand(hole, board);
        let theirs = evaluate_hand(opponent, board);
        score += if mine > theirs {
            1.0
        } else if mine == theirs {
            0.5
        } else {
            0.0
        };
    }
    score / rollouts as f64
}

/// Build the 169-entry preflop table by equal-frequency binning on equity.
pub fn build_preflop_table(params: &BuildParams) -> PreflopTable {
    let hands = enumerate_canonical_hands();
    let equities: Vec<(usize, f64)> = hands
        .par_iter()
        .enumerate()
        .map(|(id, &hole)| {
            let mut rng = StdRng::seed_from_u64(params.seed ^ (id as u64).wrapping_mul(0xA5A5));
            (id, preflop_equity(hole, params.preflop_rollouts, &mut rng))
        })
        .collect();

    let mut order = equities;
    order.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());

    let mut buckets = vec![0u16; NUM_CANONICAL_HANDS];
    for (position, &(id, _)) in order.iter().enumerate() {
        let bucket = (position * PREFLOP_BUCKETS as usize) / NUM_CANONICAL_HANDS;
        buckets[id] = bucket.min(PREFLOP_BUCKETS as usize - 1) as u16;
    }
    PreflopTable {
        format_version: TABLE_FORMAT_VERSION,
        num_buckets: PREFLOP_BUCKETS,
        buckets,
    }
}

/// Sample a random (hole, board) pair for a street.
fn sample_hand_board(street: Street, rng: &mut StdRng) -> (HoleCards, Vec<Card>) {
    let board_len = match street {
        Street::Flop => 3,
        Street::Turn => 4,
        Street::River => 5,
        _ => panic!("no postflop samples for {:?}", street),
    };
    let mut deck = Deck::shuffled(rng);
    let hole = [deck.deal(), deck.deal()];
    let board = (0..board_len).map(|_| deck.deal()).collect();
    (hole, board)
}

/// Sampled equities for one street.
fn street_equities(street: Street, params: &BuildParams) -> Vec<f64> {
    (0..params.postflop_samples)
        .into_par_iter()
        .map(|i| {
            let sample_seed = params
                .seed
                .wrapping_add((street as u64) << 32)
                .wrapping_add(i as u64);
            let mut rng = StdRng::seed_from_u64(sample_seed);
            let (hole, board) = sample_hand_board(street, &mut rng);
            estimate_equity(street, hole, &board, params.postflop_rollouts)
        })
        .collect()
}

/// One-dimensional k-means (Lloyd's iterations, quantile-initialized).
/// Returns sorted centers; fewer than `k` when the data has fewer distinct
/// values.
fn kmeans_1d(values: &[f64], k: usize, iterations: usize) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    sorted.dedup();
    if sorted.len() <= k {
        return sorted;
    }

    // Quantile initialization spreads centers over the observed mass.
    let mut centers: Vec<f64> = (0..k)
        .map(|j| sorted[(j * sorted.len() + sorted.len() / 2) / k])
        .collect();

    let mut sums = vec![0.0f64; k];
    let mut counts = vec![0usize; k];
    for _ in 0..iterations {
        sums.iter_mut().for_each(|s| *s = 0.0);
        counts.iter_mut().for_each(|c| *c = 0);
        for &v in values {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (j, &c) in centers.iter().enumerate() {
                let distance = (v - c).abs();
                if distance < best_distance {
                    best_distance = distance;
                    best = j;
                }
            }
            sums[best] += v;
            counts[best] += 1;
        }
        let mut moved = false;
        for j in 0..k {
            if counts[j] > 0 {
                let mean = sums[j] / counts[j] as f64;
                if (mean - centers[j]).abs() > 1e-12 {
                    centers[j] = mean;
                    moved = true;
                }
            }
        }
        if !moved {
            break;
        }
    }
    centers.sort_by(|a, b| a.partial_cmp(b).unwrap());
    centers
}

/// Build the postflop table: equity centers for flop, turn, and river.
pub fn build_postflop_table(params: &BuildParams) -> PostflopTable {
    let centers: Vec<Vec<f64>> = [Street::Flop, Street::Turn, Street::River]
        .into_iter()
        .map(|street| {
            let equities = street_equities(street, params);
            kmeans_1d(&equities, POSTFLOP_BUCKETS as usize, 50)
        })
        .collect();
    PostflopTable {
        format_version: TABLE_FORMAT_VERSION,
        num_streets: 3,
        num_buckets: POSTFLOP_BUCKETS,
        lookup_rollouts: LOOKUP_ROLLOUTS,
        centers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::nlhe::card::{canonical_index, parse_hole};

    #[test]
    fn canonical_enumeration_matches_the_index_function() {
        let hands = enumerate_canonical_hands();
        assert_eq!(hands.len(), NUM_CANONICAL_HANDS);
        for (id, &hole) in hands.iter().enumerate() {
            assert_eq!(canonical_index(hole) as usize, id);
        }
    }

    #[test]
    fn kmeans_centers_are_sorted_and_bounded() {
        let values: Vec<f64> = (0..500).map(|i| (i % 100) as f64 / 100.0).collect();
        let centers = kmeans_1d(&values, 10, 50);
        assert!(centers.len() <= 10);
        assert!(centers.windows(2).all(|w| w[0] <= w[1]));
        assert!(centers.iter().all(|&c| (0.0..=1.0).contains(&c)));
    }

    #[test]
    fn kmeans_degenerates_gracefully_on_tiny_input() {
        let values = [0.25, 0.75, 0.25];
        let centers = kmeans_1d(&values, 10, 50);
        assert_eq!(centers, vec![0.25, 0.75]);
    }

    #[test]
    fn preflop_table_ranks_aces_above_trash() {
        // Tiny rollout count keeps the test quick; ordering of the extreme
        // hands survives the noise.
        let params = BuildParams {
            preflop_rollouts: 200,
            ..Default::default()
        };
        let table = build_preflop_table(&params);
        assert_eq!(table.buckets.len(), NUM_CANONICAL_HANDS);

        let aces = table.buckets[canonical_index(parse_hole("AcAd").unwrap()) as usize];
        let trash = table.buckets[canonical_index(parse_hole("7h2c").unwrap()) as usize];
        assert!(aces > trash);
        assert_eq!(aces, PREFLOP_BUCKETS - 1);
    }
}
