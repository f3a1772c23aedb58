//! Contest state: the configured event plus every stage's votes and the
//! reveal cursor of the stage in progress.
//!
//! All transitions take `&mut self`; there is exactly one owner and no
//! global state. Completed stages are read-only history.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use dp_algo::aggregate::{distribute_qualifiers, rank, totals, ResultView, Standing};
use dp_algo::predefine::complete_source;
use dp_core::variables::validate_domains;
use dp_core::{
    ConfigIssue, Country, CountryCode, EngineResult, OddsTable, Params, PointsId, PointsSystem,
    RevealState, Stage, StageId, StageVotes, Violation, VoteRng, VoteSource,
};

use crate::edit;
use crate::sequencer::{RevealEvent, RevealSequencer};

#[derive(Debug, Clone, PartialEq)]
pub struct Contest {
    pub(crate) countries: Vec<Country>,
    pub(crate) points: PointsSystem,
    pub(crate) odds: OddsTable,
    pub(crate) stages: Vec<Stage>,
    pub(crate) votes: BTreeMap<StageId, StageVotes>,
    pub(crate) current: Option<StageId>,
    pub(crate) reveal: RevealState,
}

impl Contest {
    /// Validate a configured event. No stage is started.
    pub fn new(countries: Vec<Country>, points: PointsSystem, odds: OddsTable, stages: Vec<Stage>) -> EngineResult<Self> {
        odds.validate()?;
        validate_catalog(&countries)?;
        validate_stages(&countries, &stages)?;
        info!(countries = countries.len(), stages = stages.len(), points = points.len(), "contest configured");
        Ok(Self {
            countries,
            points,
            odds,
            stages,
            votes: BTreeMap::new(),
            current: None,
            reveal: RevealState::default(),
        })
    }

    #[inline] pub fn countries(&self) -> &[Country] { &self.countries }
    #[inline] pub fn points_system(&self) -> &PointsSystem { &self.points }
    #[inline] pub fn odds(&self) -> &OddsTable { &self.odds }
    #[inline] pub fn stages(&self) -> &[Stage] { &self.stages }
    #[inline] pub fn current_stage_id(&self) -> Option<StageId> { self.current }
    #[inline] pub fn reveal_state(&self) -> &RevealState { &self.reveal }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn votes(&self, id: StageId) -> Option<&StageVotes> {
        self.votes.get(&id)
    }

    fn stage_index(&self, id: StageId) -> EngineResult<usize> {
        self.stages
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| ConfigIssue::UnknownStage(id).into())
    }

    /// The lowest-order stage that is not over (ties: lowest id).
    pub fn next_stage(&self) -> Option<StageId> {
        self.stages
            .iter()
            .filter(|s| !s.is_over)
            .min_by_key(|s| (s.order, s.id))
            .map(|s| s.id)
    }

    /// Generate (or complete) the stage's votes and reset the reveal.
    ///
    /// Votes entered by hand beforehand are kept. Restarting the stage in
    /// progress resets its reveal but keeps its votes.
    pub fn start_stage(&mut self, id: StageId, params: &Params) -> EngineResult<()> {
        validate_domains(params)?;
        let idx = self.stage_index(id)?;
        let stage = &self.stages[idx];
        if stage.is_over {
            return Err(ConfigIssue::StageOver(id).into());
        }
        if let Some(cur) = self.current {
            if cur != id {
                return Err(ConfigIssue::StageInProgress(cur).into());
            }
        }
        check_qualification_room(stage)?;

        let seed = stage_seed(params, id);
        let mut rng = VoteRng::for_stage(seed, id);
        let mut votes = self.votes.get(&id).cloned().unwrap_or_default();
        fill_votes(stage, &self.points, &self.odds, params, &mut votes, &mut rng)?;

        self.reveal = RevealState::fresh(&stage.participants);
        info!(stage = %id, name = %stage.name, mode = ?stage.voting_mode, seed, "stage started");
        self.votes.insert(id, votes);
        self.current = Some(id);
        Ok(())
    }

    /// One reveal step of the stage in progress. Completing the reveal closes
    /// the stage and applies its qualification.
    pub fn advance_point(&mut self) -> EngineResult<Vec<RevealEvent>> {
        let id = self.current.ok_or(ConfigIssue::NoActiveStage)?;
        let idx = self.stage_index(id)?;
        let empty = StageVotes::default();
        let votes = self.votes.get(&id).unwrap_or(&empty);
        let mut seq = RevealSequencer::new(&self.stages[idx], votes, &self.points, &mut self.reveal);
        let events = seq.advance_point();
        let done = seq.is_complete();
        if done {
            self.close_stage(idx)?;
        }
        Ok(events)
    }

    /// Complete any missing votes and jump to the end of the current stage's
    /// reveal. Emits only `StageComplete`.
    pub fn finish_randomly(&mut self, params: &Params) -> EngineResult<Vec<RevealEvent>> {
        validate_domains(params)?;
        let id = self.current.ok_or(ConfigIssue::NoActiveStage)?;
        let idx = self.stage_index(id)?;
        let mut rng = VoteRng::for_stage(stage_seed(params, id), id);
        let mut votes = self.votes.get(&id).cloned().unwrap_or_default();
        fill_votes(&self.stages[idx], &self.points, &self.odds, params, &mut votes, &mut rng)?;

        let mut seq = RevealSequencer::new(&self.stages[idx], &votes, &self.points, &mut self.reveal);
        let events = seq.finish();
        self.votes.insert(id, votes);
        self.close_stage(idx)?;
        Ok(events)
    }

    /// Final standings of a stage in `view`, from its votes.
    pub fn standings(&self, id: StageId, view: ResultView) -> EngineResult<Vec<Standing>> {
        let stage = &self.stages[self.stage_index(id)?];
        let empty = StageVotes::default();
        let votes = self.votes.get(&id).unwrap_or(&empty);
        Ok(rank(&stage.participants, &totals(&stage.participants, votes, view)))
    }

    /// Scoreboard of what the current reveal has shown so far.
    pub fn live_standings(&self) -> Option<Vec<Standing>> {
        let stage = self.stage(self.current?)?;
        Some(rank(&stage.participants, &self.reveal.per_country_running_total))
    }

    /// Manual edit. Refused once the stage's reveal has begun.
    pub fn set_vote(
        &mut self,
        stage: StageId,
        source: VoteSource,
        voter: &CountryCode,
        participant: &CountryCode,
        points_id: PointsId,
    ) -> EngineResult<()> {
        let idx = self.editable_stage(stage)?;
        let mut votes = self.votes.get(&stage).cloned().unwrap_or_default();
        edit::set_vote(&self.stages[idx], &self.points, &mut votes, source, voter, participant, points_id)?;
        self.votes.insert(stage, votes);
        Ok(())
    }

    pub fn clear_vote(
        &mut self,
        stage: StageId,
        source: VoteSource,
        voter: &CountryCode,
        points_id: PointsId,
    ) -> EngineResult<()> {
        let idx = self.editable_stage(stage)?;
        let Some(votes) = self.votes.get_mut(&stage) else {
            return Ok(());
        };
        edit::clear_vote(&self.stages[idx], votes, source, voter, points_id)?;
        Ok(())
    }

    fn editable_stage(&self, id: StageId) -> EngineResult<usize> {
        let idx = self.stage_index(id)?;
        if self.current == Some(id) && !self.stages[idx].is_over && self.reveal_started() {
            return Err(Violation::RevealInProgress(id).into());
        }
        Ok(idx)
    }

    fn reveal_started(&self) -> bool {
        let r = &self.reveal;
        r.voting_country_index > 0 || r.voting_points_index > 0 || r.televote_index > 0 || r.complete
    }

    /// Mark the stage over, hand its qualifiers to their target stages and
    /// clear the reveal cursor.
    fn close_stage(&mut self, idx: usize) -> EngineResult<()> {
        let id = self.stages[idx].id;
        let empty = StageVotes::default();
        let votes = self.votes.get(&id).unwrap_or(&empty);
        let handed = distribute_qualifiers(&self.stages[idx], votes)?;

        self.stages[idx].is_over = true;
        for (target, codes) in handed {
            let Some(t) = self.stages.iter_mut().find(|s| s.id == target) else {
                return Err(ConfigIssue::BadQualificationTarget { stage: id, target }.into());
            };
            if t.is_over {
                warn!(stage = %id, target = %target, "target stage already over; qualifiers dropped");
                continue;
            }
            for code in codes {
                if !t.participants.contains(&code) {
                    debug!(from = %id, to = %target, country = %code, "qualified");
                    t.participants.push(code);
                }
            }
        }

        self.current = None;
        self.reveal = RevealState::default();
        info!(stage = %id, "stage over");
        Ok(())
    }
}

fn stage_seed(params: &Params, id: StageId) -> u64 {
    if params.seed.is_none() {
        warn!(stage = %id, "no seed supplied; using 0");
    }
    params.seed_or(0)
}

/// Predefine or complete every active source of `stage` in `votes`.
fn fill_votes(
    stage: &Stage,
    points: &PointsSystem,
    odds: &OddsTable,
    params: &Params,
    votes: &mut StageVotes,
    rng: &mut VoteRng,
) -> EngineResult<()> {
    for &source in stage.voting_mode.sources() {
        let existing = votes.source(source).cloned().unwrap_or_default();
        let filled = complete_source(stage, source, points, odds, params, &existing, rng)?;
        votes.set_source(source, filled);
    }
    Ok(())
}

fn validate_catalog(countries: &[Country]) -> EngineResult<()> {
    let mut seen = BTreeSet::new();
    for c in countries {
        if !seen.insert(&c.code) {
            return Err(ConfigIssue::DuplicateCatalogCountry(c.code.clone()).into());
        }
    }
    Ok(())
}

fn validate_stages(countries: &[Country], stages: &[Stage]) -> EngineResult<()> {
    let known: BTreeSet<&CountryCode> = countries.iter().map(|c| &c.code).collect();
    let mut ids = BTreeSet::new();
    for st in stages {
        if !ids.insert(st.id) {
            return Err(ConfigIssue::DuplicateStage(st.id).into());
        }
    }
    let targets: BTreeSet<StageId> = stages
        .iter()
        .flat_map(|s| s.qualifies_to.iter().map(|q| q.target_stage_id))
        .collect();

    for st in stages {
        for list in [&st.participants, &st.voters] {
            let mut seen = BTreeSet::new();
            for code in list {
                if !known.contains(code) {
                    return Err(ConfigIssue::UnknownCountry { stage: st.id, code: code.clone() }.into());
                }
                if !seen.insert(code) {
                    return Err(ConfigIssue::DuplicateCountry { stage: st.id, code: code.clone() }.into());
                }
            }
        }
        for q in &st.qualifies_to {
            let ok = stages.iter().any(|t| t.id == q.target_stage_id && t.order > st.order);
            if !ok {
                return Err(ConfigIssue::BadQualificationTarget { stage: st.id, target: q.target_stage_id }.into());
            }
        }
        // Stages filled by qualification are checked when they start.
        if !targets.contains(&st.id) {
            check_qualification_room(st)?;
        }
    }
    Ok(())
}

fn check_qualification_room(stage: &Stage) -> EngineResult<()> {
    let wanted = stage.qualifying_total();
    if wanted > stage.participants.len() as u64 {
        return Err(ConfigIssue::QualificationOverflow {
            stage: stage.id,
            amount: u32::try_from(wanted).unwrap_or(u32::MAX),
            participants: stage.participants.len(),
        }
        .into());
    }
    Ok(())
}
