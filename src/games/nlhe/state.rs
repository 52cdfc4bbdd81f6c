//! Mutable hand state for 3-player NLHE.
//!
//! A single `NlheState` is reused across a whole traversal: transitions
//! mutate it in place and hand back an [`NlheUndo`] snapshot that restores
//! it exactly. Player 0 is the button, player 1 the small blind, player 2
//! the big blind.

use rand::Rng;

use super::card::{Board, Card, Deck, HoleCards};
use crate::cfr::game::NUM_PLAYERS;

/// History byte marking a street boundary (chance event). Action ids
/// occupy 0..=9, so this cannot collide.
pub const STREET_DELIM: u8 = 0xFF;

/// Tolerance for chip-amount comparisons. Bet targets come from pot
/// fractions, so exact equality is only reliable where we assign directly.
pub const CHIP_EPS: f64 = 1e-9;

/// Betting street, in play order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    /// Next street in order. Showdown has no successor.
    pub fn next(self) -> Street {
        match self {
            Street::Preflop => Street::Flop,
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River | Street::Showdown => Street::Showdown,
        }
    }

    /// Community cards revealed when dealing into this street's successor.
    pub fn cards_to_deal(self) -> usize {
        match self {
            Street::Preflop => 3,
            Street::Flop | Street::Turn => 1,
            Street::River | Street::Showdown => 0,
        }
    }

    /// Whether this is a postflop street.
    pub fn is_postflop(self) -> bool {
        self != Street::Preflop
    }
}

/// Stakes and stack depth.
#[derive(Debug, Clone)]
pub struct NlheConfig {
    /// Starting stack in big blinds.
    pub stack_bb: f64,
    /// Small blind.
    pub sb: f64,
    /// Big blind.
    pub bb: f64,
}

impl Default for NlheConfig {
    fn default() -> Self {
        Self {
            stack_bb: 20.0,
            sb: 0.5,
            bb: 1.0,
        }
    }
}

/// Seats in postflop acting order (SB, BB, button). Also the deterministic
/// order for awarding division residues in split pots.
pub const POSTFLOP_ORDER: [usize; NUM_PLAYERS] = [1, 2, 0];

/// State of one hand, mutated in place during a traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct NlheState {
    /// Shuffled deck with dealing cursor.
    pub deck: Deck,
    /// Private cards per player.
    pub hole: [HoleCards; NUM_PLAYERS],
    /// Community cards revealed so far.
    pub board: Board,
    /// Current betting street.
    pub street: Street,
    /// Remaining chips per player.
    pub stacks: [f64; NUM_PLAYERS],
    /// Chips committed in the current betting round.
    pub bets: [f64; NUM_PLAYERS],
    /// Total chips committed this hand, across all rounds.
    pub committed: [f64; NUM_PLAYERS],
    /// Whether each player has folded.
    pub folded: [bool; NUM_PLAYERS],
    /// Whether each player is all-in.
    pub all_in: [bool; NUM_PLAYERS],
    /// Whether each player has acted in the current round.
    pub acted: [bool; NUM_PLAYERS],
    /// Player to act, `None` at chance and terminal states.
    pub to_act: Option<usize>,
    /// Last player to make a full raise this round.
    pub last_raiser: Option<usize>,
    /// Increment of the last full raise; the minimum raise size.
    pub last_raise: f64,
    /// Abstract action ids with street delimiters, in order.
    pub history: Vec<u8>,
    /// A street (or runout) is waiting to be dealt.
    pub chance_pending: bool,
    /// The hand is over.
    pub done: bool,
}

/// Snapshot taken by a betting action. Board and deck are untouched by
/// actions, so they are not captured.
#[derive(Debug, Clone)]
pub struct ActionUndo {
    stacks: [f64; NUM_PLAYERS],
    bets: [f64; NUM_PLAYERS],
    committed: [f64; NUM_PLAYERS],
    folded: [bool; NUM_PLAYERS],
    all_in: [bool; NUM_PLAYERS],
    acted: [bool; NUM_PLAYERS],
    to_act: Option<usize>,
    last_raiser: Option<usize>,
    last_raise: f64,
    street: Street,
    chance_pending: bool,
    done: bool,
}

/// Snapshot taken by a street deal.
#[derive(Debug, Clone)]
pub struct DealUndo {
    cards_dealt: usize,
    bets: [f64; NUM_PLAYERS],
    acted: [bool; NUM_PLAYERS],
    to_act: Option<usize>,
    last_raiser: Option<usize>,
    last_raise: f64,
    street: Street,
    done: bool,
}

/// Undo token for one NLHE transition.
#[derive(Debug, Clone)]
pub enum NlheUndo {
    /// Reverts an `apply_action`.
    Action(ActionUndo),
    /// Reverts a `sample_chance`.
    Deal(DealUndo),
}

impl NlheState {
    /// Deal a fresh hand: shuffle, deal hole cards, post blinds. The button
    /// acts first preflop; the big blind's post counts as the live raise
    /// for min-raise purposes.
    pub fn deal<R: Rng>(config: &NlheConfig, rng: &mut R) -> Self {
        let mut deck = Deck::shuffled(rng);
        let mut hole = [[Card::default(); 2]; NUM_PLAYERS];
        for cards in hole.iter_mut() {
            cards[0] = deck.deal();
            cards[1] = deck.deal();
        }

        let mut state = Self {
            deck,
            hole,
            board: Board::new(),
            street: Street::Preflop,
            stacks: [config.stack_bb; NUM_PLAYERS],
            bets: [0.0; NUM_PLAYERS],
            committed: [0.0; NUM_PLAYERS],
            folded: [false; NUM_PLAYERS],
            all_in: [false; NUM_PLAYERS],
            acted: [false; NUM_PLAYERS],
            to_act: Some(0),
            last_raiser: Some(2),
            last_raise: config.bb,
            history: Vec::with_capacity(32),
            chance_pending: false,
            done: false,
        };
        state.post_blind(1, config.sb);
        state.post_blind(2, config.bb);
        state
    }

    fn post_blind(&mut self, player: usize, amount: f64) {
        self.stacks[player] -= amount;
        self.bets[player] = amount;
        self.committed[player] = amount;
    }

    /// Total chips in the pot.
    pub fn pot(&self) -> f64 {
        self.committed.iter().sum()
    }

    /// Highest per-round commitment on the table.
    pub fn max_bet(&self) -> f64 {
        self.bets.iter().copied().fold(0.0, f64::max)
    }

    /// Chips `player` must add to match the current bet.
    pub fn to_call(&self, player: usize) -> f64 {
        self.max_bet() - self.bets[player]
    }

    /// Whether `player` can still take actions this hand.
    pub fn can_act(&self, player: usize) -> bool {
        !self.folded[player] && !self.all_in[player]
    }

    /// Number of players who have not folded.
    pub fn non_folded(&self) -> usize {
        self.folded.iter().filter(|&&f| !f).count()
    }

    /// Capture everything a betting action can change.
    pub fn action_snapshot(&self) -> ActionUndo {
        ActionUndo {
            stacks: self.stacks,
            bets: self.bets,
            committed: self.committed,
            folded: self.folded,
            all_in: self.all_in,
            acted: self.acted,
            to_act: self.to_act,
            last_raiser: self.last_raiser,
            last_raise: self.last_raise,
            street: self.street,
            chance_pending: self.chance_pending,
            done: self.done,
        }
    }

    /// Capture everything a street deal can change. `cards_dealt` is the
    /// number of board cards about to be revealed.
    pub fn deal_snapshot(&self, cards_dealt: usize) -> DealUndo {
        DealUndo {
            cards_dealt,
            bets: self.bets,
            acted: self.acted,
            to_act: self.to_act,
            last_raiser: self.last_raiser,
            last_raise: self.last_raise,
            street: self.street,
            done: self.done,
        }
    }

    /// Revert a transition.
    pub fn restore(&mut self, undo: NlheUndo) {
        match undo {
            NlheUndo::Action(snapshot) => {
                self.history.pop();
                self.stacks = snapshot.stacks;
                self.bets = snapshot.bets;
                self.committed = snapshot.committed;
                self.folded = snapshot.folded;
                self.all_in = snapshot.all_in;
                self.acted = snapshot.acted;
                self.to_act = snapshot.to_act;
                self.last_raiser = snapshot.last_raiser;
                self.last_raise = snapshot.last_raise;
                self.street = snapshot.street;
                self.chance_pending = snapshot.chance_pending;
                self.done = snapshot.done;
            }
            NlheUndo::Deal(snapshot) => {
                self.history.pop();
                for _ in 0..snapshot.cards_dealt {
                    self.board.pop();
                }
                self.deck.rewind(snapshot.cards_dealt);
                self.bets = snapshot.bets;
                self.acted = snapshot.acted;
                self.to_act = snapshot.to_act;
                self.last_raiser = snapshot.last_raiser;
                self.last_raise = snapshot.last_raise;
                self.street = snapshot.street;
                self.chance_pending = true;
                self.done = snapshot.done;
            }
        }
    }

    /// Chip-conservation and bookkeeping invariants, checked in debug
    /// builds after every transition.
    #[cfg(debug_assertions)]
    pub fn check_invariants(&self, config: &NlheConfig) {
        for p in 0..NUM_PLAYERS {
            debug_assert!(
                self.stacks[p] >= -CHIP_EPS,
                "negative stack for player {}: {:?}",
                p,
                self
            );
            debug_assert!(
                (self.stacks[p] + self.committed[p] - config.stack_bb).abs() < 1e-6,
                "chips not conserved for player {}: {:?}",
                p,
                self
            );
            debug_assert!(
                self.bets[p] <= self.committed[p] + CHIP_EPS,
                "round bet exceeds total committed for player {}: {:?}",
                p,
                self
            );
        }
        let expected_board = match self.street {
            Street::Preflop => 0,
            Street::Flop => 3,
            Street::Turn => 4,
            Street::River | Street::Showdown => 5,
        };
        // A pending runout can leave the board behind the street label
        // only between chance events; otherwise lengths must agree.
        if !self.chance_pending && !self.done {
            debug_assert_eq!(self.board.len(), expected_board, "{:?}", self);
        }
        if let Some(p) = self.to_act {
            debug_assert!(self.can_act(p), "to_act player cannot act: {:?}", self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn blinds_are_posted_and_button_acts_first() {
        let config = NlheConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        let state = NlheState::deal(&config, &mut rng);

        assert_eq!(state.to_act, Some(0));
        assert_eq!(state.stacks, [20.0, 19.5, 19.0]);
        assert_eq!(state.bets, [0.0, 0.5, 1.0]);
        assert!((state.pot() - 1.5).abs() < CHIP_EPS);
        assert_eq!(state.to_call(0), 1.0);
        assert_eq!(state.to_call(2), 0.0);
        assert_eq!(state.last_raiser, Some(2));
        assert_eq!(state.last_raise, 1.0);
        assert_eq!(state.deck.dealt(), 6);
    }

    #[test]
    fn hole_cards_are_distinct() {
        let config = NlheConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let state = NlheState::deal(&config, &mut rng);
        let mut ids: Vec<u8> = state
            .hole
            .iter()
            .flat_map(|h| h.iter().map(|c| c.id()))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn street_progression() {
        assert_eq!(Street::Preflop.next(), Street::Flop);
        assert_eq!(Street::River.next(), Street::Showdown);
        assert_eq!(Street::Preflop.cards_to_deal(), 3);
        assert_eq!(Street::Turn.cards_to_deal(), 1);
    }
}
