//! Odds → integer weights, blended with the randomness level.
//!
//! `w' = w·(100 − r) + mean(w)·r`
//!
//! At `r = 0` the weights are the odds as given; at `r = 100` every entry
//! equals the mean, i.e. a uniform draw. Everything is integer arithmetic on
//! milli-unit weights so picks are identical on every platform.

use dp_core::{CountryCode, OddsTable, Params, RandomnessLevel, VoteSource};

/// Raw milli-unit weights of `pool` for `source`, in pool order.
pub fn source_weights(
    pool: &[CountryCode],
    source: VoteSource,
    odds: &OddsTable,
    params: &Params,
) -> Vec<u64> {
    pool.iter()
        .map(|c| params.odds_for(odds, c).weight_milli(source))
        .collect()
}

/// Flatten `weights` toward their mean by `level`.
pub fn blend(weights: &[u64], level: RandomnessLevel) -> Vec<u64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let r = level.as_u8() as u128;
    let keep = RandomnessLevel::MAX as u128 - r;
    let sum: u128 = weights.iter().map(|&w| w as u128).sum();
    let mean = sum / weights.len() as u128;
    weights
        .iter()
        .map(|&w| {
            let v = (w as u128) * keep + mean * r;
            u64::try_from(v).unwrap_or(u64::MAX)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_core::CountryOdds;

    fn cc(s: &str) -> CountryCode { s.parse().unwrap() }

    #[test]
    fn zero_randomness_keeps_ratios() {
        let w = blend(&[1000, 3000], RandomnessLevel::odds_only());
        assert_eq!(w, vec![100_000, 300_000]);
    }

    #[test]
    fn full_randomness_is_uniform() {
        let w = blend(&[1000, 3000, 8000], RandomnessLevel::uniform());
        assert!(w.windows(2).all(|p| p[0] == p[1]));
    }

    #[test]
    fn midway_flattens() {
        let w = blend(&[0, 2000], RandomnessLevel::new(50).unwrap());
        // mean 1000 → 0·50 + 1000·50, 2000·50 + 1000·50
        assert_eq!(w, vec![50_000, 150_000]);
    }

    #[test]
    fn weights_use_source_field_and_defaults() {
        let mut odds = OddsTable::new();
        odds.insert(cc("SE"), CountryOdds::new(80.0, 10.0));
        let params = Params::default();
        let pool = [cc("SE"), cc("NO")];
        assert_eq!(source_weights(&pool, VoteSource::Jury, &odds, &params), vec![80_000, 50_000]);
        assert_eq!(source_weights(&pool, VoteSource::Televote, &odds, &params), vec![10_000, 50_000]);
        assert_eq!(source_weights(&pool, VoteSource::Combined, &odds, &params), vec![45_000, 50_000]);
    }
}
