//! 3-player No-Limit Hold'em at fixed 20bb depth.
//!
//! Implements the [`Game`] trait over [`NlheState`]: blinds and dealing,
//! betting rounds with min-raise accounting, street chance nodes, and
//! showdown resolution with full side pots.
//!
//! Acting order is button first preflop (0, 1, 2) and small blind first
//! postflop (1, 2, 0). A betting round closes when every player who can
//! still act has acted and matched the highest bet, or when at most one
//! such player remains with nothing left to match.

use rand::Rng;

use super::actions::{action_effect, action_label, legal_actions, ActionEffect};
use super::bucketing::Bucketing;
use super::hand_eval::{evaluate_hand, HandRank};
use super::state::{
    NlheConfig, NlheState, NlheUndo, Street, CHIP_EPS, POSTFLOP_ORDER, STREET_DELIM,
};
use crate::cfr::game::{ActionMask, Game, InfoKey, NUM_PLAYERS};

/// The NLHE game definition: stakes plus an information abstraction.
#[derive(Debug, Clone)]
pub struct NlheGame {
    config: NlheConfig,
    bucketing: Bucketing,
}

impl Default for NlheGame {
    fn default() -> Self {
        Self::new(NlheConfig::default(), Bucketing::Heuristic)
    }
}

impl NlheGame {
    /// Create a game with the given stakes and bucketing.
    pub fn new(config: NlheConfig, bucketing: Bucketing) -> Self {
        Self { config, bucketing }
    }

    /// The stakes configuration.
    pub fn config(&self) -> &NlheConfig {
        &self.config
    }

    /// The information abstraction in use.
    pub fn bucketing(&self) -> &Bucketing {
        &self.bucketing
    }

    /// Whether the current betting round is finished: everyone still able
    /// to act has acted and matched the highest bet. Vacuously true when
    /// nobody can act.
    fn round_complete(&self, state: &NlheState) -> bool {
        let max_bet = state.max_bet();
        (0..NUM_PLAYERS)
            .filter(|&p| state.can_act(p))
            .all(|p| state.acted[p] && (max_bet - state.bets[p]).abs() < CHIP_EPS)
    }

    /// Move to the next player, or close the round toward a chance node or
    /// showdown.
    fn advance(&self, state: &mut NlheState) {
        if self.round_complete(state) {
            state.to_act = None;
            if state.street == Street::River {
                state.street = Street::Showdown;
                state.done = true;
            } else {
                state.chance_pending = true;
            }
        } else {
            let current = state.to_act.expect("advance from a non-decision state");
            let mut next = (current + 1) % NUM_PLAYERS;
            while !state.can_act(next) {
                next = (next + 1) % NUM_PLAYERS;
            }
            state.to_act = Some(next);
        }
    }

    /// Split the pot at showdown. Commitment levels over all players
    /// partition the pot; each slice goes to the best hand among the
    /// non-folded players committed at that level, with dead money above
    /// the highest live commitment falling to the top side pot. Ties split
    /// evenly; the division residue goes to the earliest eligible winner
    /// in postflop order.
    fn showdown_payout(&self, state: &NlheState) -> [f64; NUM_PLAYERS] {
        let ranks: Vec<HandRank> = (0..NUM_PLAYERS)
            .map(|p| {
                if state.folded[p] {
                    HandRank::ZERO
                } else {
                    evaluate_hand(state.hole[p], state.board.cards())
                }
            })
            .collect();

        let mut levels: Vec<f64> = state
            .committed
            .iter()
            .copied()
            .filter(|&c| c > CHIP_EPS)
            .collect();
        levels.sort_by(|a, b| a.partial_cmp(b).unwrap());
        levels.dedup_by(|a, b| (*a - *b).abs() < CHIP_EPS);

        // Highest live commitment: dead money above it has no matching
        // requirement.
        let cap = (0..NUM_PLAYERS)
            .filter(|&p| !state.folded[p])
            .map(|p| state.committed[p])
            .fold(0.0, f64::max);

        let mut payout = [0.0; NUM_PLAYERS];
        let mut prev = 0.0;
        for &level in &levels {
            let contributors = (0..NUM_PLAYERS)
                .filter(|&p| state.committed[p] + CHIP_EPS >= level)
                .count();
            let slice = (level - prev) * contributors as f64;
            prev = level;

            let threshold = level.min(cap);
            let best = (0..NUM_PLAYERS)
                .filter(|&p| !state.folded[p] && state.committed[p] + CHIP_EPS >= threshold)
                .map(|p| ranks[p])
                .max()
                .expect("side pot with no eligible winner");
            let winners: Vec<usize> = POSTFLOP_ORDER
                .into_iter()
                .filter(|&p| {
                    !state.folded[p]
                        && state.committed[p] + CHIP_EPS >= threshold
                        && ranks[p] == best
                })
                .collect();

            let share = slice / winners.len() as f64;
            payout[winners[0]] += slice - share * (winners.len() - 1) as f64;
            for &w in &winners[1..] {
                payout[w] += share;
            }
        }
        payout
    }
}

impl Game for NlheGame {
    type State = NlheState;
    type Undo = NlheUndo;

    fn deal_new_hand<R: Rng>(&self, rng: &mut R) -> NlheState {
        NlheState::deal(&self.config, rng)
    }

    fn is_chance_node(&self, state: &NlheState) -> bool {
        state.chance_pending && !state.done
    }

    /// Deal the next street. The deck order was fixed when the hand was
    /// dealt, so the runout is shared by every branch of a traversal; the
    /// RNG parameter is unused here.
    fn sample_chance<R: Rng>(&self, state: &mut NlheState, _rng: &mut R) -> NlheUndo {
        debug_assert!(state.chance_pending && !state.done);
        let cards = state.street.cards_to_deal();
        let undo = state.deal_snapshot(cards);

        for _ in 0..cards {
            let card = state.deck.deal();
            state.board.push(card);
        }
        state.history.push(STREET_DELIM);
        state.street = state.street.next();
        state.bets = [0.0; NUM_PLAYERS];
        state.acted = [false; NUM_PLAYERS];
        state.last_raiser = None;
        state.last_raise = self.config.bb;
        state.chance_pending = false;

        state.to_act = POSTFLOP_ORDER.into_iter().find(|&p| state.can_act(p));
        if state.to_act.is_none() {
            // Runout: everyone left is all-in.
            if state.street == Street::River {
                state.street = Street::Showdown;
                state.done = true;
            } else {
                state.chance_pending = true;
            }
        }

        #[cfg(debug_assertions)]
        state.check_invariants(&self.config);
        NlheUndo::Deal(undo)
    }

    fn is_terminal(&self, state: &NlheState) -> bool {
        state.done
    }

    fn current_player(&self, state: &NlheState) -> Option<usize> {
        if state.done || state.chance_pending {
            None
        } else {
            state.to_act
        }
    }

    fn legal_actions(&self, state: &NlheState) -> ActionMask {
        legal_actions(state)
    }

    fn info_key(&self, state: &NlheState, player: usize) -> InfoKey {
        let bucket = self
            .bucketing
            .bucket(state.street, state.hole[player], state.board.cards());
        InfoKey::new(bucket, state.history.clone())
    }

    fn apply_action(&self, state: &mut NlheState, action: u8) -> NlheUndo {
        debug_assert!(
            legal_actions(state).contains(action),
            "illegal action {} at {:?}",
            action,
            state
        );
        let player = state.to_act.expect("apply_action at a non-decision state");
        let snapshot = state.action_snapshot();

        match action_effect(state, action) {
            ActionEffect::Fold => {
                state.folded[player] = true;
            }
            ActionEffect::ToTarget(target) => {
                let previous_max = state.max_bet();
                let add = (target - state.bets[player]).max(0.0);
                state.stacks[player] -= add;
                state.bets[player] = target;
                state.committed[player] += add;
                if state.stacks[player] <= CHIP_EPS {
                    state.stacks[player] = 0.0;
                    state.all_in[player] = true;
                }
                if target > previous_max + CHIP_EPS {
                    let increment = target - previous_max;
                    // A short all-in forces a response but does not reopen
                    // the betting, so only full raises move the min-raise.
                    if increment + CHIP_EPS >= state.last_raise {
                        state.last_raiser = Some(player);
                        state.last_raise = increment;
                    }
                }
            }
        }

        state.acted[player] = true;
        state.history.push(action);

        if state.non_folded() == 1 {
            state.done = true;
            state.to_act = None;
        } else {
            self.advance(state);
        }

        #[cfg(debug_assertions)]
        state.check_invariants(&self.config);
        NlheUndo::Action(snapshot)
    }

    fn undo_action(&self, state: &mut NlheState, undo: NlheUndo) {
        state.restore(undo);
    }

    fn payoffs(&self, state: &NlheState) -> [f64; NUM_PLAYERS] {
        debug_assert!(state.done, "payoffs on a live hand");

        let payout = if state.non_folded() == 1 {
            let winner = (0..NUM_PLAYERS)
                .find(|&p| !state.folded[p])
                .expect("no surviving player");
            let mut payout = [0.0; NUM_PLAYERS];
            payout[winner] = state.pot();
            payout
        } else {
            self.showdown_payout(state)
        };

        let mut payoffs = [0.0; NUM_PLAYERS];
        for p in 0..NUM_PLAYERS {
            payoffs[p] = payout[p] - state.committed[p];
        }
        payoffs
    }

    fn action_name(&self, action: u8) -> &'static str {
        action_label(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::nlhe::actions::{ALL_IN, CHECK_CALL, FOLD};
    use crate::games::nlhe::card::{parse_hole, Board};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn game() -> NlheGame {
        NlheGame::default()
    }

    fn new_hand(seed: u64) -> NlheState {
        let mut rng = StdRng::seed_from_u64(seed);
        game().deal_new_hand(&mut rng)
    }

    /// Drive a hand through a fixed action script, dealing streets as they
    /// come up.
    fn play_script(state: &mut NlheState, script: &[u8]) {
        let game = game();
        let mut rng = StdRng::seed_from_u64(0);
        let mut next = 0;
        while !game.is_terminal(state) && next < script.len() {
            if game.is_chance_node(state) {
                game.sample_chance(state, &mut rng);
                continue;
            }
            game.apply_action(state, script[next]);
            next += 1;
        }
        while !game.is_terminal(state) && game.is_chance_node(state) {
            game.sample_chance(state, &mut rng);
        }
    }

    #[test]
    fn button_fold_then_sb_fold_gives_bb_the_blinds() {
        let game = game();
        let mut state = new_hand(1);
        play_script(&mut state, &[FOLD, FOLD]);
        assert!(game.is_terminal(&state));
        let payoffs = game.payoffs(&state);
        assert_eq!(payoffs, [0.0, -0.5, 0.5]);
    }

    #[test]
    fn open_raise_takes_the_blinds_when_both_fold() {
        let game = game();
        let mut state = new_hand(2);
        // Slot 4 raises to 3x the blind.
        play_script(&mut state, &[4, FOLD, FOLD]);
        assert!(game.is_terminal(&state));
        let payoffs = game.payoffs(&state);
        assert!((payoffs[0] - 1.5).abs() < 1e-9);
        assert!((payoffs[1] + 0.5).abs() < 1e-9);
        assert!((payoffs[2] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn three_way_all_in_split_between_tied_hands() {
        let game = game();
        let mut state = new_hand(3);
        // Everyone jams preflop; the hand runs out to showdown.
        play_script(&mut state, &[ALL_IN, ALL_IN, ALL_IN]);
        assert!(game.is_terminal(&state));
        assert_eq!(state.street, Street::Showdown);
        assert_eq!(state.board.len(), 5);
        assert!((state.pot() - 60.0).abs() < 1e-9);

        // Rebuild the showdown with known cards: P0 and P1 hold the same
        // ace-high straight, P2 holds two pair.
        state.hole[0] = parse_hole("AsTc").unwrap();
        state.hole[1] = parse_hole("AhTd").unwrap();
        state.hole[2] = parse_hole("Kc9c").unwrap();
        state.board = Board::parse("KsQdJh4c4d").unwrap();
        let payoffs = game.payoffs(&state);
        assert!((payoffs[0] - 10.0).abs() < 1e-9);
        assert!((payoffs[1] - 10.0).abs() < 1e-9);
        assert!((payoffs[2] + 20.0).abs() < 1e-9);
    }

    #[test]
    fn short_stack_side_pot() {
        // P2 is all-in for 5 while P0 and P1 played for 20. Main pot 15 to
        // P2's aces, side pot 30 to P0's kings over P1's queens.
        let game = game();
        let mut state = new_hand(4);
        state.committed = [20.0, 20.0, 5.0];
        state.stacks = [0.0, 0.0, 0.0];
        state.bets = [0.0; 3];
        state.all_in = [true, true, true];
        state.folded = [false; 3];
        state.street = Street::Showdown;
        state.done = true;
        state.to_act = None;
        state.hole[0] = parse_hole("KcKd").unwrap();
        state.hole[1] = parse_hole("QcQd").unwrap();
        state.hole[2] = parse_hole("AcAd").unwrap();
        state.board = Board::parse("2h7s9dJh3c").unwrap();

        let payoffs = game.payoffs(&state);
        assert!((payoffs[0] - 10.0).abs() < 1e-9);
        assert!((payoffs[1] + 20.0).abs() < 1e-9);
        assert!((payoffs[2] - 10.0).abs() < 1e-9);
        assert!(payoffs.iter().sum::<f64>().abs() < 1e-9);
    }

    #[test]
    fn dead_money_above_live_commitments_goes_to_the_top_pot() {
        // P0 folded after committing more than the river bettors matched;
        // the winner of the top live pot collects the excess.
        let game = game();
        let mut state = new_hand(5);
        state.committed = [15.0, 12.0, 12.0];
        state.stacks = [5.0, 8.0, 8.0];
        state.bets = [0.0; 3];
        state.folded = [true, false, false];
        state.all_in = [false; 3];
        state.street = Street::Showdown;
        state.done = true;
        state.to_act = None;
        state.hole[1] = parse_hole("AcAd").unwrap();
        state.hole[2] = parse_hole("KcKd").unwrap();
        state.board = Board::parse("2h7s9dJh3c").unwrap();

        let payoffs = game.payoffs(&state);
        // P1 wins the entire 39-chip pot.
        assert!((payoffs[0] + 15.0).abs() < 1e-9);
        assert!((payoffs[1] - 27.0).abs() < 1e-9);
        assert!((payoffs[2] + 12.0).abs() < 1e-9);
        assert!(payoffs.iter().sum::<f64>().abs() < 1e-9);
    }

    #[test]
    fn limped_pot_checked_to_showdown() {
        let game = game();
        let mut state = new_hand(6);
        // Button calls, SB completes, BB checks; then every street checks
        // through: postflop order is SB, BB, button.
        play_script(
            &mut state,
            &[
                CHECK_CALL, CHECK_CALL, CHECK_CALL, // preflop
                CHECK_CALL, CHECK_CALL, CHECK_CALL, // flop
                CHECK_CALL, CHECK_CALL, CHECK_CALL, // turn
                CHECK_CALL, CHECK_CALL, CHECK_CALL, // river
            ],
        );
        assert!(game.is_terminal(&state));
        assert_eq!(state.street, Street::Showdown);
        assert!((state.pot() - 3.0).abs() < 1e-9);

        let payoffs = game.payoffs(&state);
        assert!(payoffs.iter().sum::<f64>().abs() < 1e-9);
        let best = payoffs.iter().cloned().fold(f64::MIN, f64::max);
        // Winner takes the other two big blinds (or splits on a tie).
        assert!(best <= 2.0 + 1e-9);
        assert!(best > 0.0);
    }

    #[test]
    fn big_blind_gets_the_option_after_limps() {
        let game = game();
        let mut state = new_hand(7);
        game.apply_action(&mut state, CHECK_CALL);
        game.apply_action(&mut state, CHECK_CALL);
        // All bets are matched at 1bb but the BB has not acted: the round
        // must stay open.
        assert_eq!(game.current_player(&state), Some(2));
        let mask = game.legal_actions(&state);
        assert!(!mask.contains(FOLD));
        assert!(mask.contains(CHECK_CALL));
        // The BB can still raise.
        assert!(mask.iter().any(|a| (2..=8).contains(&a)));
    }

    #[test]
    fn apply_then_undo_restores_the_state_exactly() {
        let game = game();
        for seed in 0..20u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = game.deal_new_hand(&mut rng);
            // Walk a random line, checking every transition round-trips.
            while !game.is_terminal(&state) {
                if game.is_chance_node(&state) {
                    let before = state.clone();
                    let undo = game.sample_chance(&mut state, &mut rng);
                    game.undo_action(&mut state, undo);
                    assert_eq!(state, before);
                    game.sample_chance(&mut state, &mut rng);
                    continue;
                }
                let mask = game.legal_actions(&state);
                assert!(!mask.is_empty());
                let actions: Vec<u8> = mask.iter().collect();
                let pick = actions[rng.gen_range(0..actions.len())];
                let before = state.clone();
                let undo = game.apply_action(&mut state, pick);
                game.undo_action(&mut state, undo);
                assert_eq!(state, before);
                game.apply_action(&mut state, pick);
            }
        }
    }

    #[test]
    fn random_playouts_conserve_chips() {
        let game = game();
        for seed in 100..160u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = game.deal_new_hand(&mut rng);
            while !game.is_terminal(&state) {
                if game.is_chance_node(&state) {
                    game.sample_chance(&mut state, &mut rng);
                    continue;
                }
                let actions: Vec<u8> = game.legal_actions(&state).iter().collect();
                let pick = actions[rng.gen_range(0..actions.len())];
                game.apply_action(&mut state, pick);
            }
            let payoffs = game.payoffs(&state);
            assert!(
                payoffs.iter().sum::<f64>().abs() < 1e-6,
                "seed {}: payoffs {:?} do not sum to zero",
                seed,
                payoffs
            );
            // Nobody wins more than the pot or loses more than their stack.
            for p in 0..NUM_PLAYERS {
                assert!(payoffs[p] >= -20.0 - 1e-9);
                assert!(payoffs[p] <= state.pot() + 1e-9);
            }
        }
    }

    #[test]
    fn info_keys_differ_by_bucket_not_by_hidden_cards() {
        let game = game();
        let state = new_hand(8);
        let key0 = game.info_key(&state, 0);
        let key1 = game.info_key(&state, 1);
        // Same public history for everyone.
        assert_eq!(key0.history, key1.history);
        // History grows with actions and marks street boundaries.
        let mut state = state;
        game.apply_action(&mut state, CHECK_CALL);
        let key_after = game.info_key(&state, 1);
        assert_eq!(key_after.history, vec![CHECK_CALL]);
    }
}
