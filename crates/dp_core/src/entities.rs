//! Domain entities: points system, countries, odds, stages, votes, reveal state.
//!
//! Wire names are camelCase (see the snapshot format in `dp_io`). Types that
//! carry invariants validate them on construction; deserialization goes
//! through the same constructors where the invariant is local to the value.

use std::collections::{BTreeMap, BTreeSet};
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{ConfigIssue, EngineError, EngineResult, Violation};
use crate::ids::{CountryCode, PointsId, StageId};

/* -------------------------------------------------------------------------- */
/*                                Points system                               */
/* -------------------------------------------------------------------------- */

/// One entry of the points palette.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointsItem {
    pub id: PointsId,
    pub value: u32,
}

impl PointsItem {
    pub fn new(id: u32, value: u32) -> Self {
        Self { id: PointsId(id), value }
    }
}

/// Ordered palette of distinct point values every voter distributes once.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<PointsItem>", into = "Vec<PointsItem>"))]
pub struct PointsSystem {
    items: Vec<PointsItem>,
}

impl PointsSystem {
    /// Validate and wrap a palette. Order is kept as given.
    pub fn new(items: Vec<PointsItem>) -> EngineResult<Self> {
        if items.is_empty() {
            return Err(ConfigIssue::EmptyPointsSystem.into());
        }
        let mut values = BTreeSet::new();
        let mut ids = BTreeSet::new();
        for it in &items {
            if it.value == 0 {
                return Err(ConfigIssue::NonPositivePoints(it.id).into());
            }
            if !values.insert(it.value) {
                return Err(ConfigIssue::DuplicatePointsValue(it.value).into());
            }
            if !ids.insert(it.id) {
                return Err(ConfigIssue::DuplicatePointsId(it.id).into());
            }
        }
        Ok(Self { items })
    }

    /// Build a palette from plain values; ids are assigned 1..=n in the given order.
    pub fn from_values(values: &[u32]) -> EngineResult<Self> {
        let items = values
            .iter()
            .enumerate()
            .map(|(i, &v)| PointsItem::new(i as u32 + 1, v))
            .collect();
        Self::new(items)
    }

    /// The classic 1–8, 10, 12 palette.
    pub fn eurovision() -> Self {
        let items = [1, 2, 3, 4, 5, 6, 7, 8, 10, 12]
            .iter()
            .enumerate()
            .map(|(i, &v)| PointsItem::new(i as u32 + 1, v))
            .collect();
        Self { items }
    }

    #[inline] pub fn items(&self) -> &[PointsItem] { &self.items }
    #[inline] pub fn len(&self) -> usize { self.items.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn get(&self, id: PointsId) -> Option<&PointsItem> {
        self.items.iter().find(|it| it.id == id)
    }

    /// The "douze points" value: the largest value in the palette.
    pub fn max_value(&self) -> u32 {
        self.items.iter().map(|it| it.value).max().unwrap_or(0)
    }

    /// Items sorted by ascending value.
    pub fn ascending(&self) -> Vec<PointsItem> {
        let mut xs = self.items.clone();
        xs.sort_by_key(|it| it.value);
        xs
    }

    /// The `n` items with the smallest values, ascending. `n` is clamped to `len()`.
    pub fn lowest(&self, n: usize) -> Vec<PointsItem> {
        let mut xs = self.ascending();
        xs.truncate(n);
        xs
    }
}

impl TryFrom<Vec<PointsItem>> for PointsSystem {
    type Error = EngineError;
    fn try_from(items: Vec<PointsItem>) -> Result<Self, Self::Error> {
        PointsSystem::new(items)
    }
}

impl From<PointsSystem> for Vec<PointsItem> {
    fn from(ps: PointsSystem) -> Self {
        ps.items
    }
}

/* -------------------------------------------------------------------------- */
/*                              Countries & odds                              */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Country {
    pub code: CountryCode,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub category: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub flag: Option<String>,
}

impl Country {
    pub fn new(code: CountryCode, name: impl Into<String>) -> Self {
        Self { code, name: name.into(), category: None, flag: None }
    }
}

/// Relative weights used to bias random allocation. Not probabilities.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CountryOdds {
    pub jury_odds: f64,
    pub televote_odds: f64,
}

impl Default for CountryOdds {
    fn default() -> Self {
        Self { jury_odds: 50.0, televote_odds: 50.0 }
    }
}

impl CountryOdds {
    pub fn new(jury_odds: f64, televote_odds: f64) -> Self {
        Self { jury_odds, televote_odds }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.jury_odds.is_finite()
            && self.televote_odds.is_finite()
            && self.jury_odds >= 0.0
            && self.televote_odds >= 0.0
    }

    /// Weight for `source` in integer milli-units. Combined uses the mean of both fields.
    pub fn weight_milli(&self, source: VoteSource) -> u64 {
        let raw = match source {
            VoteSource::Jury => self.jury_odds,
            VoteSource::Televote => self.televote_odds,
            VoteSource::Combined => (self.jury_odds + self.televote_odds) / 2.0,
        };
        to_milli(raw)
    }
}

/// Odds are capped so that summing a few thousand weights cannot overflow u64.
const MAX_MILLI: u64 = 1 << 40;

fn to_milli(x: f64) -> u64 {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    let m = (x * 1000.0).round();
    if m >= MAX_MILLI as f64 { MAX_MILLI } else { m as u64 }
}

/// Country code → odds.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OddsTable(BTreeMap<CountryCode, CountryOdds>);

impl OddsTable {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, code: CountryCode, odds: CountryOdds) -> Option<CountryOdds> {
        self.0.insert(code, odds)
    }

    pub fn get(&self, code: &CountryCode) -> Option<&CountryOdds> {
        self.0.get(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountryCode, &CountryOdds)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize { self.0.len() }
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Reject negative, NaN or infinite odds.
    pub fn validate(&self) -> EngineResult<()> {
        for (code, odds) in &self.0 {
            if !odds.is_valid() {
                return Err(ConfigIssue::InvalidOdds(code.clone()).into());
            }
        }
        Ok(())
    }
}

impl FromIterator<(CountryCode, CountryOdds)> for OddsTable {
    fn from_iter<I: IntoIterator<Item = (CountryCode, CountryOdds)>>(it: I) -> Self {
        OddsTable(it.into_iter().collect())
    }
}

/* -------------------------------------------------------------------------- */
/*                               Modes & sources                              */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VoteSource {
    Jury,
    Televote,
    Combined,
}

impl VoteSource {
    pub fn as_str(self) -> &'static str {
        match self {
            VoteSource::Jury => "jury",
            VoteSource::Televote => "televote",
            VoteSource::Combined => "combined",
        }
    }
}

impl fmt::Display for VoteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum VotingMode {
    JuryOnly,
    TelevoteOnly,
    JuryAndTelevote,
    Combined,
}

impl VotingMode {
    /// Sources that must be complete for a stage in this mode.
    pub fn sources(self) -> &'static [VoteSource] {
        match self {
            VotingMode::JuryOnly => &[VoteSource::Jury],
            VotingMode::TelevoteOnly => &[VoteSource::Televote],
            VotingMode::JuryAndTelevote => &[VoteSource::Jury, VoteSource::Televote],
            VotingMode::Combined => &[VoteSource::Combined],
        }
    }

    pub fn is_active(self, source: VoteSource) -> bool {
        self.sources().contains(&source)
    }

    /// Source revealed voter by voter.
    pub fn voter_source(self) -> VoteSource {
        match self {
            VotingMode::JuryOnly | VotingMode::JuryAndTelevote => VoteSource::Jury,
            VotingMode::TelevoteOnly => VoteSource::Televote,
            VotingMode::Combined => VoteSource::Combined,
        }
    }

    /// Whether televote results are read out per participant after the jury round.
    pub fn has_televote_phase(self) -> bool {
        matches!(self, VotingMode::JuryAndTelevote)
    }
}

/* -------------------------------------------------------------------------- */
/*                                   Stages                                   */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Qualification {
    pub target_stage_id: StageId,
    pub amount: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub order: u32,
    pub voting_mode: VotingMode,
    pub participants: Vec<CountryCode>,
    pub voters: Vec<CountryCode>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub qualifies_to: Vec<Qualification>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_over: bool,
}

impl Stage {
    pub fn new(id: u32, name: impl Into<String>, order: u32, voting_mode: VotingMode) -> Self {
        Self {
            id: StageId(id),
            name: name.into(),
            order,
            voting_mode,
            participants: Vec::new(),
            voters: Vec::new(),
            qualifies_to: Vec::new(),
            is_over: false,
        }
    }

    pub fn is_participant(&self, code: &CountryCode) -> bool {
        self.participants.contains(code)
    }

    pub fn is_voter(&self, code: &CountryCode) -> bool {
        self.voters.contains(code)
    }

    /// Participants `voter` may give points to, in participant order.
    pub fn pool_for(&self, voter: &CountryCode) -> Vec<CountryCode> {
        self.participants.iter().filter(|p| *p != voter).cloned().collect()
    }

    pub fn qualifying_total(&self) -> u64 {
        self.qualifies_to.iter().map(|q| q.amount as u64).sum()
    }
}

/* -------------------------------------------------------------------------- */
/*                                    Votes                                   */
/* -------------------------------------------------------------------------- */

/// Points one voter gave one participant. Stored under the voter's code.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Vote {
    country_code: CountryCode,
    points: u32,
    points_id: PointsId,
}

impl Vote {
    /// Build a vote from `voter` to `participant`; self votes are rejected.
    pub fn new(voter: &CountryCode, participant: CountryCode, item: PointsItem) -> Result<Self, Violation> {
        if *voter == participant {
            return Err(Violation::SelfVote(participant));
        }
        Ok(Self { country_code: participant, points: item.value, points_id: item.id })
    }

    #[inline] pub fn participant(&self) -> &CountryCode { &self.country_code }
    #[inline] pub fn points(&self) -> u32 { self.points }
    #[inline] pub fn points_id(&self) -> PointsId { self.points_id }
}

/// Voter code → the votes that voter cast in one source.
pub type SourceVotes = BTreeMap<CountryCode, Vec<Vote>>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageVotes {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub jury: Option<SourceVotes>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub televote: Option<SourceVotes>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub combined: Option<SourceVotes>,
}

impl StageVotes {
    pub fn source(&self, source: VoteSource) -> Option<&SourceVotes> {
        match source {
            VoteSource::Jury => self.jury.as_ref(),
            VoteSource::Televote => self.televote.as_ref(),
            VoteSource::Combined => self.combined.as_ref(),
        }
    }

    /// Mutable access, creating an empty source map on first use.
    pub fn source_mut(&mut self, source: VoteSource) -> &mut SourceVotes {
        let slot = match source {
            VoteSource::Jury => &mut self.jury,
            VoteSource::Televote => &mut self.televote,
            VoteSource::Combined => &mut self.combined,
        };
        slot.get_or_insert_with(BTreeMap::new)
    }

    /// Mutable access to a source only if it already exists.
    pub fn existing_source_mut(&mut self, source: VoteSource) -> Option<&mut SourceVotes> {
        match source {
            VoteSource::Jury => self.jury.as_mut(),
            VoteSource::Televote => self.televote.as_mut(),
            VoteSource::Combined => self.combined.as_mut(),
        }
    }

    pub fn set_source(&mut self, source: VoteSource, votes: SourceVotes) {
        *self.source_mut(source) = votes;
    }

    /// Votes `voter` cast in `source` (empty if none).
    pub fn voter_votes(&self, source: VoteSource, voter: &CountryCode) -> &[Vote] {
        self.source(source)
            .and_then(|m| m.get(voter))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Present sources with their maps, in jury → televote → combined order.
    pub fn sources(&self) -> impl Iterator<Item = (VoteSource, &SourceVotes)> {
        [
            (VoteSource::Jury, self.jury.as_ref()),
            (VoteSource::Televote, self.televote.as_ref()),
            (VoteSource::Combined, self.combined.as_ref()),
        ]
        .into_iter()
        .filter_map(|(s, m)| m.map(|m| (s, m)))
    }

    pub fn is_empty(&self) -> bool {
        self.sources().all(|(_, m)| m.values().all(Vec::is_empty))
    }
}

/* -------------------------------------------------------------------------- */
/*                                Reveal state                                */
/* -------------------------------------------------------------------------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RevealPhase {
    /// Voter by voter, point by point.
    #[default]
    Voters,
    /// Aggregate televote per participant (jury-and-televote stages only).
    Televote,
}

/// Cursor of a reveal in progress. Indices only move forward until reset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RevealState {
    #[cfg_attr(feature = "serde", serde(default, rename = "revealPhase"))]
    pub phase: RevealPhase,
    #[cfg_attr(feature = "serde", serde(default))]
    pub voting_country_index: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub voting_points_index: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub televote_index: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub per_country_running_total: BTreeMap<CountryCode, u64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub complete: bool,
}

impl RevealState {
    /// Fresh cursor with every participant at zero.
    pub fn fresh(participants: &[CountryCode]) -> Self {
        Self {
            per_country_running_total: participants.iter().map(|c| (c.clone(), 0)).collect(),
            ..Self::default()
        }
    }
}
