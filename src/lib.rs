//! # nlhe-blueprint
//!
//! Blueprint strategy trainer for 3-player, 20 big blind No-Limit Texas
//! Hold'em, using external-sampling Monte Carlo CFR with linear weighting
//! and regret-based pruning.
//!
//! ## Pipeline
//!
//! 1. `build_buckets` precomputes the information abstraction: 169
//!    canonical starting hands into 15 preflop buckets, and 50 equity
//!    clusters per postflop street. (Optional; a heuristic fallback keeps
//!    training running without tables.)
//! 2. `train` runs MCCFR iterations over the abstracted game and writes a
//!    checkpoint plus the blueprint (the normalized average strategy).
//! 3. `evaluate` plays the frozen blueprint against itself and reports
//!    per-seat win rates in mbb/g with bootstrap standard errors.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                cfr (generic trainer)                │
//! │  Game trait · regret table · external sampling ·    │
//! │  linear weighting · pruning · checkpoint/blueprint  │
//! └─────────────────────────────────────────────────────┘
//!                          │ implements Game
//!              ┌───────────┴───────────┐
//!              ▼                       ▼
//!        ┌──────────┐           ┌────────────┐
//!        │ kuhn 3p  │           │  nlhe 3p   │
//!        │ (exact   │           │ (buckets,  │
//!        │  BR test)│           │ side pots) │
//!        └──────────┘           └────────────┘
//! ```

#![warn(missing_docs)]

pub mod cfr;
pub mod error;
pub mod eval;
pub mod games;

pub use cfr::{Blueprint, CfrConfig, CfrStats, CfrTrainer, Checkpoint, Game, InfoKey};
pub use error::{Result, SolverError};
