//! dp_core: contest entities, identifiers, errors and the seeded vote RNG.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`dp_algo`, `dp_io`, `dp_engine`, `dp_cli`).
//!
//! - Identifiers: `CountryCode`, `StageId`, `PointsId`
//! - Points system, odds table, stages, votes, reveal state
//! - Simulation `Params` (seed, randomness level, default odds)
//! - Stable ordering helpers
//! - Seedable RNG (ChaCha20) with integer-only weighted picks
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod entities;
pub mod variables;
pub mod determinism;
pub mod rng;

pub use errors::{ConfigIssue, EngineError, EngineResult, Violation};
pub use ids::{CountryCode, IdError, PointsId, StageId};
pub use entities::{
    Country, CountryOdds, OddsTable, PointsItem, PointsSystem, Qualification, RevealPhase,
    RevealState, SourceVotes, Stage, StageVotes, Vote, VoteSource, VotingMode,
};
pub use variables::{Params, RandomnessLevel};
pub use rng::VoteRng;
