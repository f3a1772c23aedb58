// crates/dp_core/src/rng.rs
//
// Deterministic, integer-only RNG for vote predefinition.
// Focus: unbiased range generation, stable seeding, weighted picks over integer weights.
//
// • Integer-only: no floating point. Unbiased ranges via rejection sampling.
// • Cross-platform determinism: explicit seeding and word counting.
// • One ChaCha20 stream per stage, so a stage's votes do not depend on what
//   was drawn for earlier stages.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

use crate::ids::StageId;

/// Seeded RNG for vote predefinition.
///
/// Internally uses ChaCha20 with an explicit 32-byte seed derived from the
/// 64-bit seed (little-endian bytes in the first 8 positions; the rest 0).
/// This avoids endianness ambiguity and keeps mapping stable across platforms.
#[derive(Debug, Clone)]
pub struct VoteRng {
    rng: ChaCha20Rng,
    words_consumed: u128,
}

impl VoteRng {
    /// Construct from a 64-bit seed on stream 0.
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&seed.to_le_bytes());
        Self {
            rng: ChaCha20Rng::from_seed(seed32),
            words_consumed: 0,
        }
    }

    /// Construct from a seed on the stream reserved for `stage`.
    #[inline]
    pub fn for_stage(seed: u64, stage: StageId) -> Self {
        let mut r = Self::from_seed_u64(seed);
        r.rng.set_stream(stage.get() as u64);
        r
    }

    /// Total number of 64-bit words consumed so far (saturating at `u128::MAX`).
    #[inline]
    pub fn words_consumed(&self) -> u128 {
        self.words_consumed
    }

    /// Draw the next u64 from the stream and increment the word counter.
    /// This is the only place where the counter is advanced.
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.words_consumed = self.words_consumed.saturating_add(1);
        self.rng.next_u64()
    }

    /// Unbiased integer in [0, n) using rejection sampling with the standard
    /// "threshold" trick. Returns `None` if `n == 0`.
    ///
    /// Let `threshold = 2^64 mod n` (computed via `wrapping_neg() % n`).
    /// Accept `x` if `x >= threshold`; then `x % n` is uniformly distributed.
    #[inline]
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n;
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    /// Choose a single index in `[0, n)`; returns `None` if `n == 0`.
    #[inline]
    pub fn choose_index(&mut self, n: usize) -> Option<usize> {
        self.gen_range(n as u64).map(|v| v as usize)
    }

    /// Pick an index with probability proportional to `weights[i]`.
    ///
    /// Returns `None` when the slice is empty or every weight is zero; the
    /// caller decides the fallback. Zero-weight entries are never picked
    /// otherwise.
    pub fn pick_weighted(&mut self, weights: &[u64]) -> Option<usize> {
        let total: u128 = weights.iter().map(|&w| w as u128).sum();
        if total == 0 {
            return None;
        }
        // Weights are capped upstream; a total beyond u64 only happens with
        // absurd inputs, in which case we scale everything down.
        let (scaled, total) = if total > u64::MAX as u128 {
            let shift = 128 - total.leading_zeros() - 63;
            let s: Vec<u64> = weights.iter().map(|&w| w >> shift).collect();
            let t: u128 = s.iter().map(|&w| w as u128).sum();
            (Some(s), t)
        } else {
            (None, total)
        };
        if total == 0 {
            return None;
        }
        let ws = scaled.as_deref().unwrap_or(weights);
        let mut r = self.gen_range(total as u64)?;
        for (i, &w) in ws.iter().enumerate() {
            if r < w {
                return Some(i);
            }
            r -= w;
        }
        // Unreachable for a consistent total; stay deterministic anyway.
        ws.iter().rposition(|&w| w > 0)
    }
}

impl Default for VoteRng {
    fn default() -> Self { VoteRng::from_seed_u64(0) }
}
