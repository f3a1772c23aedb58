// crates/dp_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Pure algorithms over `dp_core` entities. No I/O, no clocks; randomness only
//! through a caller-supplied `VoteRng`.

pub mod weights;
pub mod predefine;
pub mod aggregate;

// Tight, explicit re-exports (avoid wildcard export drift).
pub use predefine::{complete_source, predefine_source, predefine_stage_votes, required_votes};
pub use aggregate::{
    distribute_qualifiers, partial_totals, qualifiers, rank, total_for, totals, ResultView,
    RevealCursor, Standing,
};
pub use weights::{blend, source_weights};
