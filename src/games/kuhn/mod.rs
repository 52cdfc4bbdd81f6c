//! 3-player Kuhn poker, the validation game for the trainer.
//!
//! Four cards {0, 1, 2, 3}, one per player, everyone antes a chip. A single
//! betting round: each player in seat order may pass or bet one chip; after
//! a bet, the other two players each respond once (bet = call, pass =
//! fold). The best card among the players still in takes the pot.
//!
//! The game is small enough to compute an exact best response against the
//! trained average strategy, which is how the MCCFR implementation is
//! validated: exploitability must fall toward zero as iterations grow.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::cfr::game::{ActionMask, Game, InfoKey, NUM_PLAYERS};
use crate::cfr::solver::CfrTrainer;

/// Check, or fold when facing a bet.
pub const PASS: u8 = 0;
/// Bet one chip, or call when facing a bet.
pub const BET: u8 = 1;

/// Deck size; one rank per card, no suits.
const DECK: [u8; 4] = [0, 1, 2, 3];

/// State of one Kuhn hand: the deal and the action line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KuhnState {
    /// One card per player.
    pub cards: [u8; NUM_PLAYERS],
    /// Actions taken so far.
    pub history: Vec<u8>,
}

/// Undo token: actions only append to the history.
#[derive(Debug, Clone, Copy)]
pub struct KuhnUndo;

/// The 3-player Kuhn poker game.
#[derive(Debug, Clone, Copy, Default)]
pub struct KuhnGame;

impl KuhnGame {
    /// Create the game.
    pub fn new() -> Self {
        Self
    }

    /// Index of the first bet in the history, if any.
    fn bet_index(history: &[u8]) -> Option<usize> {
        history.iter().position(|&a| a == BET)
    }
}

impl Game for KuhnGame {
    type State = KuhnState;
    type Undo = KuhnUndo;

    fn deal_new_hand<R: Rng>(&self, rng: &mut R) -> KuhnState {
        let mut deck = DECK;
        deck.shuffle(rng);
        KuhnState {
            cards: [deck[0], deck[1], deck[2]],
            history: Vec::with_capacity(5),
        }
    }

    fn is_chance_node(&self, _state: &KuhnState) -> bool {
        false
    }

    fn sample_chance<R: Rng>(&self, _state: &mut KuhnState, _rng: &mut R) -> KuhnUndo {
        unreachable!("kuhn has no mid-hand chance nodes")
    }

    fn is_terminal(&self, state: &KuhnState) -> bool {
        let h = &state.history;
        match Self::bet_index(h) {
            // All three passed.
            None => h.len() == NUM_PLAYERS,
            // Both other players have responded to the bet.
            Some(bet) => h.len() >= bet + NUM_PLAYERS,
        }
    }

    fn current_player(&self, state: &KuhnState) -> Option<usize> {
        if self.is_terminal(state) {
            None
        } else {
            // Seats act in order 0, 1, 2, wrapping into the responses.
            Some(state.history.len() % NUM_PLAYERS)
        }
    }

    fn legal_actions(&self, _state: &KuhnState) -> ActionMask {
        [PASS, BET].into_iter().collect()
    }

    fn info_key(&self, state: &KuhnState, player: usize) -> InfoKey {
        InfoKey::new(state.cards[player] as u16, state.history.clone())
    }

    fn apply_action(&self, state: &mut KuhnState, action: u8) -> KuhnUndo {
        debug_assert!(action == PASS || action == BET);
        state.history.push(action);
        KuhnUndo
    }

    fn undo_action(&self, state: &mut KuhnState, _undo: KuhnUndo) {
        state.history.pop();
    }

    fn payoffs(&self, state: &KuhnState) -> [f64; NUM_PLAYERS] {
        debug_assert!(self.is_terminal(state));
        let h = &state.history;

        let bet = match Self::bet_index(h) {
            None => {
                // Showdown among all three for the antes.
                let winner = best_card(state, [true; NUM_PLAYERS]);
                let mut payoffs = [-1.0; NUM_PLAYERS];
                payoffs[winner] = 2.0;
                return payoffs;
            }
            Some(bet) => bet,
        };

        // The bettor and every caller put in a second chip; folders keep
        // theirs but forfeit the ante.
        let bettor = bet % NUM_PLAYERS;
        let mut in_hand = [false; NUM_PLAYERS];
        let mut contribution = [1.0; NUM_PLAYERS];
        in_hand[bettor] = true;
        contribution[bettor] = 2.0;
        for (i, &response) in h[bet + 1..].iter().enumerate() {
            let seat = (bettor + 1 + i) % NUM_PLAYERS;
            if response == BET {
                in_hand[seat] = true;
                contribution[seat] = 2.0;
            }
        }

        let pot: f64 = contribution.iter().sum();
        let winner = best_card(state, in_hand);
        let mut payoffs = [0.0; NUM_PLAYERS];
        for p in 0..NUM_PLAYERS {
            payoffs[p] = -contribution[p];
        }
        payoffs[winner] += pot;
        payoffs
    }

    fn action_name(&self, action: u8) -> &'static str {
        match action {
            PASS => "pass",
            BET => "bet",
            _ => "?",
        }
    }
}

/// Seat with the highest card among those still in the hand.
fn best_card(state: &KuhnState, in_hand: [bool; NUM_PLAYERS]) -> usize {
    (0..NUM_PLAYERS)
        .filter(|&p| in_hand[p])
        .max_by_key(|&p| state.cards[p])
        .expect("no player left in the hand")
}

/// Exact exploitability of the trained average strategy: the summed gain
/// each player could get by best-responding while the others keep playing
/// the average strategy, averaged over all 24 equally likely deals.
pub fn exploitability(trainer: &CfrTrainer<KuhnGame>) -> f64 {
    let game = trainer.game();
    let deals = all_deals();
    let mut total = 0.0;
    for responder in 0..NUM_PLAYERS {
        let mut gain = 0.0;
        for &cards in &deals {
            let mut state = KuhnState {
                cards,
                history: Vec::new(),
            };
            gain += best_response_value(game, trainer, &mut state, responder)
                - average_value(game, trainer, &mut state, responder);
        }
        total += gain / deals.len() as f64;
    }
    total
}

/// All ordered deals of three distinct cards from the four-card deck.
fn all_deals() -> Vec<[u8; NUM_PLAYERS]> {
    let mut deals = Vec::with_capacity(24);
    for a in DECK {
        for b in DECK {
            for c in DECK {
                if a != b && b != c && a != c {
                    deals.push([a, b, c]);
                }
            }
        }
    }
    deals
}

/// Value to `responder` when they best-respond and everyone else plays the
/// average strategy.
fn best_response_value(
    game: &KuhnGame,
    trainer: &CfrTrainer<KuhnGame>,
    state: &mut KuhnState,
    responder: usize,
) -> f64 {
    if game.is_terminal(state) {
        return game.payoffs(state)[responder];
    }
    let player = game.current_player(state).unwrap();
    let mask = game.legal_actions(state);

    if player == responder {
        let mut best = f64::NEG_INFINITY;
        for action in mask.iter() {
            let undo = game.apply_action(state, action);
            best = best.max(best_response_value(game, trainer, state, responder));
            game.undo_action(state, undo);
        }
        best
    } else {
        let key = game.info_key(state, player);
        let strategy = trainer.average_strategy(&key, mask);
        let mut value = 0.0;
        for action in mask.iter() {
            let undo = game.apply_action(state, action);
            value += strategy[action as usize]
                * best_response_value(game, trainer, state, responder);
            game.undo_action(state, undo);
        }
        value
    }
}

/// Value to `player` when everyone plays the average strategy.
fn average_value(
    game: &KuhnGame,
    trainer: &CfrTrainer<KuhnGame>,
    state: &mut KuhnState,
    player: usize,
) -> f64 {
    if game.is_terminal(state) {
        return game.payoffs(state)[player];
    }
    let acting = game.current_player(state).unwrap();
    let mask = game.legal_actions(state);
    let key = game.info_key(state, acting);
    let strategy = trainer.average_strategy(&key, mask);
    let mut value = 0.0;
    for action in mask.iter() {
        let undo = game.apply_action(state, action);
        value += strategy[action as usize] * average_value(game, trainer, state, player);
        game.undo_action(state, undo);
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfr::config::CfrConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn deals_are_distinct_cards() {
        let game = KuhnGame::new();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let state = game.deal_new_hand(&mut rng);
            assert_ne!(state.cards[0], state.cards[1]);
            assert_ne!(state.cards[1], state.cards[2]);
            assert_ne!(state.cards[0], state.cards[2]);
        }
    }

    #[test]
    fn terminal_detection() {
        let game = KuhnGame::new();
        let state = |h: &[u8]| KuhnState {
            cards: [3, 1, 0],
            history: h.to_vec(),
        };
        assert!(!game.is_terminal(&state(&[PASS, PASS])));
        assert!(game.is_terminal(&state(&[PASS, PASS, PASS])));
        assert!(!game.is_terminal(&state(&[BET, PASS])));
        assert!(game.is_terminal(&state(&[BET, PASS, PASS])));
        assert!(game.is_terminal(&state(&[PASS, BET, BET, PASS])));
        assert!(!game.is_terminal(&state(&[PASS, PASS, BET])));
        assert!(game.is_terminal(&state(&[PASS, PASS, BET, PASS, BET])));
    }

    #[test]
    fn seat_order_wraps_through_responses() {
        let game = KuhnGame::new();
        let state = |h: &[u8]| KuhnState {
            cards: [3, 1, 0],
            history: h.to_vec(),
        };
        assert_eq!(game.current_player(&state(&[])), Some(0));
        assert_eq!(game.current_player(&state(&[PASS])), Some(1));
        assert_eq!(game.current_player(&state(&[PASS, BET])), Some(2));
        assert_eq!(game.current_player(&state(&[PASS, BET, PASS])), Some(0));
    }

    #[test]
    fn payoffs_sum_to_zero_on_every_line() {
        let game = KuhnGame::new();
        // Enumerate every action line on a fixed deal.
        fn walk(game: &KuhnGame, state: &mut KuhnState) {
            if game.is_terminal(state) {
                let payoffs = game.payoffs(state);
                assert!(payoffs.iter().sum::<f64>().abs() < 1e-12, "{:?}", state);
                return;
            }
            for action in [PASS, BET] {
                let undo = game.apply_action(state, action);
                walk(game, state);
                game.undo_action(state, undo);
            }
        }
        let mut state = KuhnState {
            cards: [2, 0, 3],
            history: Vec::new(),
        };
        walk(&game, &mut state);
    }

    #[test]
    fn all_pass_showdown_pays_the_best_card() {
        let game = KuhnGame::new();
        let state = KuhnState {
            cards: [1, 3, 0],
            history: vec![PASS, PASS, PASS],
        };
        assert_eq!(game.payoffs(&state), [-1.0, 2.0, -1.0]);
    }

    #[test]
    fn bet_and_folds_pay_the_bettor_without_showdown() {
        let game = KuhnGame::new();
        // P1 bets the worst card and both opponents fold.
        let state = KuhnState {
            cards: [3, 0, 2],
            history: vec![PASS, BET, PASS, PASS],
        };
        assert_eq!(game.payoffs(&state), [-1.0, 2.0, -1.0]);
    }

    #[test]
    fn call_forces_a_showdown_among_callers() {
        let game = KuhnGame::new();
        // P0 bets, P1 folds, P2 calls with the better card.
        let state = KuhnState {
            cards: [2, 3, 1],
            history: vec![BET, PASS, BET],
        };
        // P2's call loses to P0's card at showdown; P1's better card is
        // dead. Pot is 5 with P0 and P2 in for 2 each.
        assert_eq!(game.payoffs(&state), [3.0, -1.0, -2.0]);
    }

    #[test]
    fn mccfr_converges_on_kuhn() {
        let config = CfrConfig::default().with_seed(42);
        let mut trainer = CfrTrainer::new(KuhnGame::new(), config);

        trainer.train(1_000);
        let early = exploitability(&trainer);

        trainer.train(49_000);
        let late = exploitability(&trainer);

        assert!(
            late < 0.1,
            "exploitability {} still above threshold after 50k iterations",
            late
        );
        assert!(
            late <= early,
            "exploitability rose from {} to {}",
            early,
            late
        );
    }

    #[test]
    fn average_strategies_are_distributions() {
        let mut trainer =
            CfrTrainer::new(KuhnGame::new(), CfrConfig::default().with_seed(7));
        trainer.train(2_000);

        let game = KuhnGame::new();
        let mask = game.legal_actions(&KuhnState {
            cards: [0, 1, 2],
            history: Vec::new(),
        });
        for card in 0..4u16 {
            let key = InfoKey::new(card, Vec::new());
            let strategy = trainer.average_strategy(&key, mask);
            let total: f64 = strategy.iter().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
    }
}
