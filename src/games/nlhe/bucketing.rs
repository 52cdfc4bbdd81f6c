//! Information abstraction: map (hole cards, board, street) to a small
//! bucket id.
//!
//! Production tables are built offline by `build_buckets`: the preflop
//! table maps each of the 169 canonical starting hands to one of 15
//! buckets; each postflop street carries 50 equity cluster centers, and a
//! lookup assigns the nearest center to the hand's Monte Carlo equity.
//! When no tables are on disk, a deterministic heuristic keeps the trainer
//! running at reduced abstraction quality.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::Once;

use super::card::{canonical_index, Card, Deck, HoleCards, NUM_CANONICAL_HANDS};
use super::hand_eval::{evaluate_hand, HandRank};
use super::state::Street;
use crate::error::{read_json, Result, SolverError};

/// Preflop bucket count.
pub const PREFLOP_BUCKETS: u16 = 15;
/// Bucket count on each postflop street.
pub const POSTFLOP_BUCKETS: u16 = 50;
/// Version header written into both table files.
pub const TABLE_FORMAT_VERSION: u32 = 1;
/// Rollouts per equity estimate during table lookup.
pub const LOOKUP_ROLLOUTS: u32 = 100;

static FALLBACK_WARNING: Once = Once::new();

/// On-disk preflop table: canonical hand id to bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflopTable {
    /// File format version.
    pub format_version: u32,
    /// Bucket count the entries were built for.
    pub num_buckets: u16,
    /// Bucket per canonical hand id, 169 entries.
    pub buckets: Vec<u16>,
}

impl PreflopTable {
    /// Write the table to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        crate::error::write_json(path, self)
    }

    fn validate(&self, path: &str) -> Result<()> {
        if self.format_version != TABLE_FORMAT_VERSION {
            return Err(SolverError::FormatVersion {
                path: path.to_string(),
                found: self.format_version,
                expected: TABLE_FORMAT_VERSION,
            });
        }
        if self.buckets.len() != NUM_CANONICAL_HANDS {
            return Err(SolverError::BucketTable {
                path: path.to_string(),
                reason: format!("expected 169 entries, found {}", self.buckets.len()),
            });
        }
        if self.buckets.iter().any(|&b| b >= self.num_buckets) {
            return Err(SolverError::BucketTable {
                path: path.to_string(),
                reason: "bucket id out of range".to_string(),
            });
        }
        Ok(())
    }
}

/// On-disk postflop table: equity cluster centers per street.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostflopTable {
    /// File format version.
    pub format_version: u32,
    /// Streets covered (flop, turn, river).
    pub num_streets: u8,
    /// Bucket count per street.
    pub num_buckets: u16,
    /// Rollouts used per equity estimate at lookup time.
    pub lookup_rollouts: u32,
    /// Sorted cluster centers, one vector per street.
    pub centers: Vec<Vec<f64>>,
}

impl PostflopTable {
    /// Write the table to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        crate::error::write_json(path, self)
    }

    fn validate(&self, path: &str) -> Result<()> {
        if self.format_version != TABLE_FORMAT_VERSION {
            return Err(SolverError::FormatVersion {
                path: path.to_string(),
                found: self.format_version,
                expected: TABLE_FORMAT_VERSION,
            });
        }
        if self.num_streets != 3 || self.centers.len() != 3 {
            return Err(SolverError::BucketTable {
                path: path.to_string(),
                reason: format!("expected 3 streets, found {}", self.centers.len()),
            });
        }
        for (i, centers) in self.centers.iter().enumerate() {
            if centers.is_empty() || centers.len() > self.num_buckets as usize {
                return Err(SolverError::BucketTable {
                    path: path.to_string(),
                    reason: format!("street {} has {} centers", i, centers.len()),
                });
            }
        }
        Ok(())
    }
}

/// Bucket assignment strategy: precomputed tables or the heuristic
/// fallback.
#[derive(Debug, Clone)]
pub enum Bucketing {
    /// Precomputed tables loaded from disk.
    Tables {
        /// 169-entry preflop map.
        preflop: PreflopTable,
        /// Equity centers per postflop street.
        postflop: PostflopTable,
    },
    /// Deterministic heuristic, no precomputation required.
    Heuristic,
}

impl Bucketing {
    /// Load both table files, failing on corrupt or mismatched contents.
    pub fn load(preflop_path: &str, postflop_path: &str) -> Result<Self> {
        let preflop: PreflopTable = read_json(preflop_path)?;
        preflop.validate(preflop_path)?;
        let postflop: PostflopTable = read_json(postflop_path)?;
        postflop.validate(postflop_path)?;
        log::info!(
            "loaded bucket tables ({} preflop / {} postflop buckets)",
            preflop.num_buckets,
            postflop.num_buckets
        );
        Ok(Self::Tables { preflop, postflop })
    }

    /// Load tables if both files are present, otherwise fall back to the
    /// heuristic, logging the downgrade once per process.
    pub fn load_or_heuristic(preflop_path: &str, postflop_path: &str) -> Self {
        match Self::load(preflop_path, postflop_path) {
            Ok(bucketing) => bucketing,
            Err(e) => {
                FALLBACK_WARNING.call_once(|| {
                    log::warn!(
                        "bucket tables unavailable ({}); using heuristic bucketing",
                        e
                    );
                });
                Self::Heuristic
            }
        }
    }

    /// Bucket id for a hand at a street. Deterministic: the same
    /// (street, hole, board) always maps to the same bucket, in this run
    /// and any other.
    pub fn bucket(&self, street: Street, hole: HoleCards, board: &[Card]) -> u16 {
        match self {
            Bucketing::Tables { preflop, postflop } => match street {
                Street::Preflop => {
                    let idx = canonical_index(hole) as usize;
                    preflop.buckets[idx] % preflop.num_buckets
                }
                Street::Flop | Street::Turn | Street::River => {
                    let equity = estimate_equity(
                        street,
                        hole,
                        board,
                        postflop.lookup_rollouts as usize,
                    );
                    let centers = &postflop.centers[street_slot(street)];
                    nearest_center(centers, equity)
                }
                Street::Showdown => 0,
            },
            Bucketing::Heuristic => match street {
                Street::Preflop => preflop_heuristic(hole),
                Street::Flop | Street::Turn | Street::River => postflop_heuristic(hole, board),
                Street::Showdown => 0,
            },
        }
    }
}

/// Index of a postflop street into the centers table.
pub fn street_slot(street: Street) -> usize {
    match street {
        Street::Flop => 0,
        Street::Turn => 1,
        Street::River => 2,
        _ => panic!("no table slot for {:?}", street),
    }
}

/// Heuristic preflop bucket from rank sum, pair, and suitedness.
fn preflop_heuristic(hole: HoleCards) -> u16 {
    let (r0, r1) = (hole[0].rank() as u32, hole[1].rank() as u32);
    let (high, low) = if r0 >= r1 { (r0, r1) } else { (r1, r0) };
    let mut score = high * 13 + low;
    if high == low {
        score += 100;
    }
    if hole[0].suit() == hole[1].suit() {
        score += 20;
    }
    let max_score = 12 * 13 + 12 + 100 + 20;
    ((score * PREFLOP_BUCKETS as u32 / (max_score + 1)) as u16).min(PREFLOP_BUCKETS - 1)
}

/// Heuristic postflop bucket from made-hand category plus board texture
/// (flush draw, straight draw, paired board).
fn postflop_heuristic(hole: HoleCards, board: &[Card]) -> u16 {
    let category = evaluate_hand(hole, board).category() as u16;
    let mut bucket = category * 5;

    let mut suit_counts = [0u8; 4];
    let mut rank_bits = 0u16;
    for card in hole.iter().chain(board.iter()) {
        suit_counts[card.suit() as usize] += 1;
        rank_bits |= 1 << card.rank();
    }
    if suit_counts.iter().any(|&c| c >= 4) {
        bucket += 2;
    }
    if has_straight_draw(rank_bits) {
        bucket += 1;
    }
    let mut board_ranks = [0u8; 13];
    for card in board {
        board_ranks[card.rank() as usize] += 1;
    }
    if board_ranks.iter().any(|&c| c >= 2) {
        bucket += 1;
    }
    bucket.min(POSTFLOP_BUCKETS - 1)
}

/// Four distinct ranks inside some five-rank window (ace plays high and
/// low).
fn has_straight_draw(rank_bits: u16) -> bool {
    // 14-bit vector with the ace duplicated below the deuce.
    let bits = (rank_bits << 1) | ((rank_bits >> 12) & 1);
    (0..=9).any(|start| {
        let window = bits >> start & 0b11111;
        window.count_ones() >= 4
    })
}

/// RNG seed derived from the cards, so equity lookups are repeatable.
fn lookup_seed(street: Street, hole: HoleCards, board: &[Card]) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    (street as u8).hash(&mut hasher);
    hole[0].id().hash(&mut hasher);
    hole[1].id().hash(&mut hasher);
    for card in board {
        card.id().hash(&mut hasher);
    }
    hasher.finish()
}

/// Monte Carlo equity of `hole` on `board`. Flop and turn play against one
/// random opponent with the board run out; the river plays hand strength
/// against two random opponents (the table is three-handed).
pub fn estimate_equity(street: Street, hole: HoleCards, board: &[Card], rollouts: usize) -> f64 {
    let mut rng = StdRng::seed_from_u64(lookup_seed(street, hole, board));
    let mut dead: Vec<Card> = hole.to_vec();
    dead.extend_from_slice(board);
    let mut live = Deck::shuffled_without(&dead, &mut rng);

    let runout = 5 - board.len();
    let mut score = 0.0;
    for _ in 0..rollouts {
        match street {
            Street::Flop | Street::Turn => {
                let needed = 2 + runout;
                live.partial_shuffle(&mut rng, needed);
                let opponent = [live[0], live[1]];
                let mut full_board: Vec<Card> = board.to_vec();
                full_board.extend_from_slice(&live[2..needed]);
                let mine = evaluate_hand(hole, &full_board);
                let theirs = evaluate_hand(opponent, &full_board);
                score += win_share(mine, &[theirs]);
            }
            Street::River => {
                live.partial_shuffle(&mut rng, 4);
                let opp1 = evaluate_hand([live[0], live[1]], board);
                let opp2 = evaluate_hand([live[2], live[3]], board);
                let mine = evaluate_hand(hole, board);
                score += win_share(mine, &[opp1, opp2]);
            }
            _ => panic!("no equity estimate on {:?}", street),
        }
    }
    score / rollouts as f64
}

/// Fraction of the pot `mine` earns against `others`: 1 outright, split on
/// a tie for best, 0 otherwise.
fn win_share(mine: HandRank, others: &[HandRank]) -> f64 {
    let best = others.iter().copied().fold(mine, HandRank::max);
    if mine < best {
        return 0.0;
    }
    let tied = 1 + others.iter().filter(|&&r| r == best).count();
    1.0 / tied as f64
}

/// Index of the nearest cluster center to an equity value.
fn nearest_center(centers: &[f64], equity: f64) -> u16 {
    let mut best = 0usize;
    let mut best_distance = f64::INFINITY;
    for (i, &center) in centers.iter().enumerate() {
        let distance = (equity - center).abs();
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::nlhe::card::parse_hole;
    use crate::games::nlhe::card::Board;

    #[test]
    fn preflop_heuristic_orders_hands_sensibly() {
        let aces = preflop_heuristic(parse_hole("AcAd").unwrap());
        let seven_deuce = preflop_heuristic(parse_hole("7h2s").unwrap());
        assert!(aces > seven_deuce);
        assert!(aces < PREFLOP_BUCKETS);
        // Suitedness nudges the bucket up or leaves it equal, never down.
        let aks = preflop_heuristic(parse_hole("AsKs").unwrap());
        let ako = preflop_heuristic(parse_hole("AsKh").unwrap());
        assert!(aks >= ako);
    }

    #[test]
    fn postflop_heuristic_stays_in_range() {
        let hole = parse_hole("AsKs").unwrap();
        let board = Board::parse("QsJs7d").unwrap();
        let bucket = postflop_heuristic(hole, board.cards());
        assert!(bucket < POSTFLOP_BUCKETS);

        let made = parse_hole("AsAd").unwrap();
        let full_board = Board::parse("AhAc2d2h9s").unwrap();
        assert!(postflop_heuristic(made, full_board.cards()) < POSTFLOP_BUCKETS);
    }

    #[test]
    fn straight_draw_detection() {
        // 5-6-7-8 rank bits (ranks 3,4,5,6).
        let bits = 0b1111 << 3;
        assert!(has_straight_draw(bits));
        // A-2-3-4 wheel draw.
        let wheel = (1 << 12) | 0b111;
        assert!(has_straight_draw(wheel));
        // Scattered ranks.
        let scattered = (1 << 0) | (1 << 4) | (1 << 8) | (1 << 12);
        assert!(!has_straight_draw(scattered));
    }

    #[test]
    fn equity_lookup_is_deterministic_and_ordered() {
        let strong = parse_hole("AsAd").unwrap();
        let weak = parse_hole("7h2c").unwrap();
        let board = Board::parse("Kc8d3h").unwrap();

        let e1 = estimate_equity(Street::Flop, strong, board.cards(), 200);
        let e2 = estimate_equity(Street::Flop, strong, board.cards(), 200);
        assert_eq!(e1, e2);

        let weak_equity = estimate_equity(Street::Flop, weak, board.cards(), 200);
        assert!(e1 > weak_equity);
        assert!((0.0..=1.0).contains(&e1));
    }

    #[test]
    fn nearest_center_picks_closest() {
        let centers = [0.1, 0.4, 0.8];
        assert_eq!(nearest_center(&centers, 0.05), 0);
        assert_eq!(nearest_center(&centers, 0.5), 1);
        assert_eq!(nearest_center(&centers, 0.99), 2);
    }

    #[test]
    fn missing_tables_fall_back_to_heuristic() {
        let bucketing = Bucketing::load_or_heuristic("/nonexistent/a.json", "/nonexistent/b.json");
        assert!(matches!(bucketing, Bucketing::Heuristic));
        let hole = parse_hole("AcKd").unwrap();
        assert!(bucketing.bucket(Street::Preflop, hole, &[]) < PREFLOP_BUCKETS);
    }
}
