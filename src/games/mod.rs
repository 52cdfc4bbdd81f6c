//! Game implementations for the MCCFR trainer.
//!
//! - [`kuhn`]: 3-player Kuhn poker, small enough for an exact best
//!   response; validates the trainer.
//! - [`nlhe`]: 3-player 20bb No-Limit Hold'em, the game the blueprint is
//!   trained for.

pub mod kuhn;
pub mod nlhe;
