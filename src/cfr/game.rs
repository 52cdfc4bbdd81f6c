//! Game trait definition for the MCCFR trainer.
//!
//! Any game that implements the `Game` trait can be trained with the
//! external-sampling solver. The trait is the only dispatch surface between
//! the algorithm and a concrete game; the trainer is generic over it, so
//! there is no virtual dispatch in the hot loop.
//!
//! Unlike a copy-on-write design, transitions mutate the state in place and
//! return an undo token. The trainer applies an action, recurses, and then
//! undoes it, so a single state allocation serves an entire traversal.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of players. Both games in this crate are three-handed.
pub const NUM_PLAYERS: usize = 3;

/// Size of the abstract action alphabet. Every regret entry holds this many
/// slots; actions a game never emits stay at zero and are masked out.
pub const NUM_ACTIONS: usize = 10;

/// A set of legal abstract action ids, stored as a bitmask.
///
/// Masks are deterministic: two identical states must produce identical
/// masks. Iteration order is ascending action id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionMask(u16);

impl ActionMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    /// Add an action id to the mask.
    #[inline]
    pub fn insert(&mut self, action: u8) {
        debug_assert!((action as usize) < NUM_ACTIONS);
        self.0 |= 1 << action;
    }

    /// Whether the mask contains an action id.
    #[inline]
    pub fn contains(&self, action: u8) -> bool {
        (action as usize) < NUM_ACTIONS && self.0 & (1 << action) != 0
    }

    /// Number of legal actions.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether no action is legal.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate legal action ids in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..NUM_ACTIONS as u8).filter(move |&a| self.contains(a))
    }
}

impl FromIterator<u8> for ActionMask {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut mask = Self::EMPTY;
        for a in iter {
            mask.insert(a);
        }
        mask
    }
}

/// Compact information-set key: the acting player's card bucket plus the
/// public action history they have observed.
///
/// The history is one byte per abstract action, with chance events replaced
/// by a street-delimiter byte, so private card information enters the key
/// only through the bucket. Keys are stable across process runs and
/// injective over distinct histories sharing a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InfoKey {
    /// Per-street hand-strength bucket (or raw card for Kuhn).
    pub bucket: u16,
    /// Abstract action ids with street delimiters, in order.
    pub history: Vec<u8>,
}

impl InfoKey {
    /// Build a key from a bucket and a history byte string.
    pub fn new(bucket: u16, history: Vec<u8>) -> Self {
        Self { bucket, history }
    }
}

impl fmt::Display for InfoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};", self.bucket)?;
        for b in &self.history {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

/// The capability set a game exposes to the trainer.
///
/// Implemented by the 3-player Kuhn validation game and by 3-player NLHE.
/// The trainer drives one traversal per (iteration, traverser) pair:
///
/// 1. `deal_new_hand` produces a fresh root state.
/// 2. `is_chance_node` / `sample_chance` deal community cards mid-hand.
/// 3. `legal_actions`, `info_key`, `apply_action`, `undo_action` walk the
///    betting tree.
/// 4. `payoffs` scores terminal states as net chip deltas.
///
/// `apply_action` must be exactly invertible: applying an action and then
/// undoing its token restores the state bit for bit.
pub trait Game: Send + Sync {
    /// Mutable state of a single hand.
    type State: Send;

    /// Token returned by `apply_action` / `sample_chance`, consumed by
    /// `undo_action`.
    type Undo;

    /// Deal a fresh hand. Private cards are dealt here; later chance events
    /// (streets) go through `sample_chance`.
    fn deal_new_hand<R: Rng>(&self, rng: &mut R) -> Self::State;

    /// Whether the state is waiting on a chance event.
    fn is_chance_node(&self, state: &Self::State) -> bool;

    /// Resolve the pending chance event by sampling uniformly without
    /// replacement from the remaining deck.
    fn sample_chance<R: Rng>(&self, state: &mut Self::State, rng: &mut R) -> Self::Undo;

    /// Whether the hand is over.
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// The player to act, or `None` at chance and terminal states.
    fn current_player(&self, state: &Self::State) -> Option<usize>;

    /// Legal abstract actions for the player to act. Nonempty at every
    /// decision node.
    fn legal_actions(&self, state: &Self::State) -> ActionMask;

    /// Information-set key for `player` at this state.
    fn info_key(&self, state: &Self::State, player: usize) -> InfoKey;

    /// Apply an abstract action in place and return its undo token.
    fn apply_action(&self, state: &mut Self::State, action: u8) -> Self::Undo;

    /// Revert the most recent `apply_action` or `sample_chance`.
    fn undo_action(&self, state: &mut Self::State, undo: Self::Undo);

    /// Net chip delta per player at a terminal state. Sums to zero.
    fn payoffs(&self, state: &Self::State) -> [f64; NUM_PLAYERS];

    /// Human-readable name for an abstract action id, for output tables.
    fn action_name(&self, action: u8) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_iterates_in_ascending_order() {
        let mask: ActionMask = [9u8, 0, 1, 4].into_iter().collect();
        assert_eq!(mask.len(), 4);
        let ids: Vec<u8> = mask.iter().collect();
        assert_eq!(ids, vec![0, 1, 4, 9]);
        assert!(mask.contains(4));
        assert!(!mask.contains(5));
    }

    #[test]
    fn empty_mask() {
        let mask = ActionMask::EMPTY;
        assert!(mask.is_empty());
        assert_eq!(mask.iter().count(), 0);
    }

    #[test]
    fn info_key_ordering_and_display() {
        let a = InfoKey::new(3, vec![1, 2]);
        let b = InfoKey::new(3, vec![1, 3]);
        let c = InfoKey::new(4, vec![]);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "3;0102");
    }
}
