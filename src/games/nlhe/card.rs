//! Card, hole-card, board, and deck types.

use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;

/// Rank characters for display.
const RANK_CHARS: [char; 13] = ['2', '3', '4', '5', '6', '7', '8', '9', 'T', 'J', 'Q', 'K', 'A'];

/// Suit characters for display.
const SUIT_CHARS: [char; 4] = ['c', 'd', 'h', 's'];

/// Number of canonical starting-hand classes (13 pairs + 78 suited + 78
/// offsuit).
pub const NUM_CANONICAL_HANDS: usize = 169;

/// A single playing card, id 0-51 encoded as `rank * 4 + suit`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Card(u8);

impl Card {
    /// Create a card from rank (0-12: deuce to ace) and suit (0-3).
    #[inline]
    pub fn new(rank: u8, suit: u8) -> Self {
        debug_assert!(rank < 13 && suit < 4);
        Self(rank * 4 + suit)
    }

    /// Create a card from its id (0-51).
    #[inline]
    pub fn from_id(id: u8) -> Self {
        debug_assert!(id < 52);
        Self(id)
    }

    /// Parse a card like "As", "Kh", "2c".
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let rank_char = chars.next()?.to_ascii_uppercase();
        let suit_char = chars.next()?.to_ascii_lowercase();
        if chars.next().is_some() {
            return None;
        }
        let rank = RANK_CHARS.iter().position(|&c| c == rank_char)?;
        let suit = SUIT_CHARS.iter().position(|&c| c == suit_char)?;
        Some(Self::new(rank as u8, suit as u8))
    }

    /// Card id (0-51).
    #[inline]
    pub fn id(self) -> u8 {
        self.0
    }

    /// Rank (0-12: deuce to ace).
    #[inline]
    pub fn rank(self) -> u8 {
        self.0 / 4
    }

    /// Suit (0-3).
    #[inline]
    pub fn suit(self) -> u8 {
        self.0 % 4
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            RANK_CHARS[self.rank() as usize],
            SUIT_CHARS[self.suit() as usize]
        )
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A player's two private cards.
pub type HoleCards = [Card; 2];

/// Parse hole cards like "AhKs".
pub fn parse_hole(s: &str) -> Option<HoleCards> {
    let s = s.replace(' ', "");
    if s.len() != 4 {
        return None;
    }
    Some([Card::parse(&s[0..2])?, Card::parse(&s[2..4])?])
}

/// Canonical starting-hand index in [0, 169).
///
/// Pairs occupy 0-12 by rank; non-pairs follow in (high, low) order with
/// the suited combo immediately before the offsuit one. The bucket-table
/// builder enumerates hands in the same order, so this index is the lookup
/// key into the preflop table.
pub fn canonical_index(hole: HoleCards) -> u16 {
    let (r0, r1) = (hole[0].rank() as u16, hole[1].rank() as u16);
    let (high, low) = if r0 >= r1 { (r0, r1) } else { (r1, r0) };
    if high == low {
        return high;
    }
    let suited = hole[0].suit() == hole[1].suit();
    13 + (high - 1) * high + 2 * low + if suited { 0 } else { 1 }
}

/// Community cards revealed so far (0, 3, 4, or 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Board {
    cards: [Card; 5],
    len: u8,
}

impl Board {
    /// An empty board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cards revealed.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether no card has been revealed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Revealed cards as a slice.
    #[inline]
    pub fn cards(&self) -> &[Card] {
        &self.cards[..self.len as usize]
    }

    /// Reveal a card.
    pub fn push(&mut self, card: Card) {
        debug_assert!(self.len < 5);
        self.cards[self.len as usize] = card;
        self.len += 1;
    }

    /// Take back the most recently revealed card.
    pub fn pop(&mut self) {
        debug_assert!(self.len > 0);
        self.len -= 1;
    }

    /// Parse a board like "Qs Jc 7d" (spaces optional).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.replace(' ', "");
        if s.len() % 2 != 0 || s.len() > 10 {
            return None;
        }
        let mut board = Self::new();
        for i in (0..s.len()).step_by(2) {
            board.push(Card::parse(&s[i..i + 2])?);
        }
        Some(board)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, card) in self.cards().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", card)?;
        }
        Ok(())
    }
}

/// A 52-card deck with an in-order dealing cursor.
///
/// After one shuffle the order is fixed; `deal` advances the cursor and
/// `rewind` steps it back, which is all the undo machinery needs to take
/// back a street.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: [Card; 52],
    next: usize,
}

impl Deck {
    /// A fresh deck in id order, cursor at the top.
    pub fn fresh() -> Self {
        let mut cards = [Card::default(); 52];
        for (id, slot) in cards.iter_mut().enumerate() {
            *slot = Card::from_id(id as u8);
        }
        Self { cards, next: 0 }
    }

    /// A shuffled deck.
    pub fn shuffled<R: Rng>(rng: &mut R) -> Self {
        let mut deck = Self::fresh();
        deck.cards.shuffle(rng);
        deck
    }

    /// A shuffled deck with the given cards removed (for equity rollouts).
    pub fn shuffled_without<R: Rng>(dead: &[Card], rng: &mut R) -> Vec<Card> {
        let mut live: Vec<Card> = (0..52u8)
            .map(Card::from_id)
            .filter(|c| !dead.contains(c))
            .collect();
        live.shuffle(rng);
        live
    }

    /// Deal the next card.
    #[inline]
    pub fn deal(&mut self) -> Card {
        debug_assert!(self.next < 52);
        let card = self.cards[self.next];
        self.next += 1;
        card
    }

    /// Step the cursor back over the last `n` deals.
    #[inline]
    pub fn rewind(&mut self, n: usize) {
        debug_assert!(self.next >= n);
        self.next -= n;
    }

    /// Cards dealt so far.
    #[inline]
    pub fn dealt(&self) -> usize {
        self.next
    }
}
