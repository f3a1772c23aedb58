//! Simulation parameters with safe defaults.
//!
//! `Params` is what the settings collaborator hands the engine before a
//! predefinition run. It is read-only for the duration of one run.

#[cfg(feature = "serde")]
use serde::{de::Unexpected, Deserialize, Deserializer, Serialize};

use crate::entities::{CountryOdds, OddsTable};
use crate::errors::{ConfigIssue, EngineResult};
use crate::ids::CountryCode;

/// Randomness dial, 0..=100. 0 follows the odds, 100 ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct RandomnessLevel(u8);

impl RandomnessLevel {
    pub const MAX: u8 = 100;

    pub fn new(v: u8) -> Result<Self, String> {
        if v <= Self::MAX { Ok(Self(v)) } else { Err(format!("randomness level out of range: {v}")) }
    }

    pub const fn odds_only() -> Self { Self(0) }
    pub const fn uniform() -> Self { Self(Self::MAX) }

    #[inline] pub fn as_u8(self) -> u8 { self.0 }
}

impl Default for RandomnessLevel {
    fn default() -> Self { Self(50) }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for RandomnessLevel {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = u8::deserialize(d)?;
        if v <= Self::MAX { Ok(RandomnessLevel(v)) }
        else { Err(serde::de::Error::invalid_value(Unexpected::Unsigned(v as u64), &"0..=100")) }
    }
}

/// Engine parameters. Omitted fields take their defaults.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Params {
    /// Seed for vote predefinition. `None` means the caller picks one.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub seed: Option<u64>,
    pub randomness_level: RandomnessLevel,
    /// Odds for countries missing from the odds table.
    pub default_odds: CountryOdds,
}

impl Params {
    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed), ..Self::default() }
    }

    /// Odds for `code`, falling back to `default_odds`.
    pub fn odds_for<'a>(&'a self, table: &'a OddsTable, code: &CountryCode) -> &'a CountryOdds {
        table.get(code).unwrap_or(&self.default_odds)
    }

    pub fn seed_or(&self, fallback: u64) -> u64 {
        self.seed.unwrap_or(fallback)
    }
}

/// Domain checks that cannot be expressed in the types.
pub fn validate_domains(p: &Params) -> EngineResult<()> {
    if !p.default_odds.is_valid() {
        return Err(ConfigIssue::Other("default odds must be finite and non-negative".into()).into());
    }
    Ok(())
}
