//! 3-player No-Limit Hold'em at 20 big blinds.
//!
//! The production game: full deck, four betting rounds, a 10-slot action
//! abstraction, bucketed information sets, and side-pot showdowns.

pub mod actions;
pub mod bucket_build;
pub mod bucketing;
pub mod card;
pub mod game;
pub mod hand_eval;
pub mod state;

pub use bucketing::{Bucketing, PostflopTable, PreflopTable, POSTFLOP_BUCKETS, PREFLOP_BUCKETS};
pub use card::{Board, Card, Deck, HoleCards};
pub use game::NlheGame;
pub use hand_eval::{HandCategory, HandRank};
pub use state::{NlheConfig, NlheState, NlheUndo, Street};
