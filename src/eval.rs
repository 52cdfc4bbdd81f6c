//! Self-play evaluation of a frozen blueprint.
//!
//! Plays hands with every seat sampling from the average strategy and
//! reports per-player win rates in milli-big-blinds per game, with a block
//! bootstrap standard error (block size about the square root of the hand
//! count).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;

use crate::cfr::blueprint::Blueprint;
use crate::cfr::game::{ActionMask, Game, InfoKey, NUM_ACTIONS, NUM_PLAYERS};

/// Read-only lookup over a blueprint's average strategies.
pub struct StrategyMap {
    strategies: FxHashMap<InfoKey, [f64; NUM_ACTIONS]>,
}

impl StrategyMap {
    /// Index a blueprint for lookup.
    pub fn new(blueprint: &Blueprint) -> Self {
        let strategies = blueprint
            .strategies
            .iter()
            .map(|(key, strategy)| (key.clone(), *strategy))
            .collect();
        Self { strategies }
    }

    /// Number of info sets in the blueprint.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether the blueprint is empty.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Distribution over the legal actions at `key`: the stored average
    /// strategy restricted to the mask and renormalized, or uniform for
    /// info sets the blueprint never visited.
    pub fn lookup(&self, key: &InfoKey, mask: ActionMask) -> [f64; NUM_ACTIONS] {
        let mut out = [0.0; NUM_ACTIONS];
        if let Some(stored) = self.strategies.get(key) {
            let total: f64 = mask.iter().map(|a| stored[a as usize]).sum();
            if total > 0.0 {
                for a in mask.iter() {
                    out[a as usize] = stored[a as usize] / total;
                }
                return out;
            }
        }
        let p = 1.0 / mask.len() as f64;
        for a in mask.iter() {
            out[a as usize] = p;
        }
        out
    }
}

/// Evaluation summary for one self-play run.
#[derive(Debug, Clone)]
pub struct EvalReport {
    /// Hands played.
    pub hands: u64,
    /// Bootstrap blocks used for the standard error.
    pub blocks: usize,
    /// Mean winnings per player in milli-big-blinds per game.
    pub mbb_per_game: [f64; NUM_PLAYERS],
    /// Block-bootstrap standard error of the mean, same unit.
    pub standard_error: [f64; NUM_PLAYERS],
}

/// Play one hand with every seat drawing from the average strategy.
pub fn play_hand<G: Game, R: Rng>(
    game: &G,
    strategy: &StrategyMap,
    rng: &mut R,
) -> [f64; NUM_PLAYERS] {
    let mut state = game.deal_new_hand(rng);
    while !game.is_terminal(&state) {
        if game.is_chance_node(&state) {
            game.sample_chance(&mut state, rng);
            continue;
        }
        let player = match game.current_player(&state) {
            Some(p) => p,
            None => break,
        };
        let mask = game.legal_actions(&state);
        debug_assert!(!mask.is_empty());
        let key = game.info_key(&state, player);
        let distribution = strategy.lookup(&key, mask);
        let action = sample(&distribution, mask, rng);
        game.apply_action(&mut state, action);
    }
    game.payoffs(&state)
}

/// Play `hands` hands of self-play and summarize win rates.
///
/// Results are aggregated into consecutive blocks of about sqrt(hands)
/// hands each; the standard error is the spread of block means.
pub fn evaluate<G: Game>(game: &G, strategy: &StrategyMap, hands: u64, seed: u64) -> EvalReport {
    let block_size = ((hands as f64).sqrt().round() as u64).max(1);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut block_means: Vec<[f64; NUM_PLAYERS]> = Vec::new();
    let mut block_total = [0.0; NUM_PLAYERS];
    let mut in_block = 0u64;

    for _ in 0..hands {
        let payoffs = play_hand(game, strategy, &mut rng);
        for p in 0..NUM_PLAYERS {
            block_total[p] += payoffs[p];
        }
        in_block += 1;
        if in_block == block_size {
            block_means.push(block_total.map(|t| t / in_block as f64));
            block_total = [0.0; NUM_PLAYERS];
            in_block = 0;
        }
    }
    if in_block > 0 {
        block_means.push(block_total.map(|t| t / in_block as f64));
    }

    let blocks = block_means.len();
    let mut mean = [0.0; NUM_PLAYERS];
    for block in &block_means {
        for p in 0..NUM_PLAYERS {
            mean[p] += block[p];
        }
    }
    for m in mean.iter_mut() {
        *m /= blocks as f64;
    }

    let mut standard_error = [0.0; NUM_PLAYERS];
    if blocks > 1 {
        for p in 0..NUM_PLAYERS {
            let variance: f64 = block_means
                .iter()
                .map(|block| (block[p] - mean[p]).powi(2))
                .sum::<f64>()
                / blocks as f64;
            standard_error[p] = (variance / blocks as f64).sqrt();
        }
    }

    EvalReport {
        hands,
        blocks,
        mbb_per_game: mean.map(|m| m * 1000.0),
        standard_error: standard_error.map(|se| se * 1000.0),
    }
}

/// Sample an action id from a distribution restricted to a mask.
fn sample<R: Rng>(distribution: &[f64; NUM_ACTIONS], mask: ActionMask, rng: &mut R) -> u8 {
    let r: f64 = rng.gen();
    let mut cumulative = 0.0;
    let mut last = 0;
    for a in mask.iter() {
        cumulative += distribution[a as usize];
        last = a;
        if r < cumulative {
            return a;
        }
    }
    last
}
