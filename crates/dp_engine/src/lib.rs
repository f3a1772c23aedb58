//! dp_engine — contest state and the stepped reveal.
//!
//! `Contest` owns the configured event, every stage's votes and the reveal
//! cursor of the stage in progress. It is I/O-free: snapshots are plain values
//! (`dp_io::ContestSnapshot`) that the caller reads and writes.

#![forbid(unsafe_code)]

pub mod contest;
pub mod edit;
pub mod resume;
pub mod sequencer;

pub use contest::Contest;
pub use sequencer::{expected_running_totals, televote_order, RevealEvent, RevealSequencer};

pub use dp_algo::{ResultView, Standing};
