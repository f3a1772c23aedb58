//! Vote predefinition (deterministic given the RNG; integers only).
//!
//! For every voter and every active source:
//! - the pool is the stage's participants minus the voter itself;
//! - the voter uses the `min(points.len(), pool.len())` lowest point values;
//! - values are handed out from the highest down, each to a weighted-random
//!   pick from what is left of the pool, so the top value is the pick most
//!   influenced by the odds;
//! - a picked participant leaves the pool (no participant gets two values
//!   from the same voter in the same source).
//!
//! `complete_source` runs the same procedure on top of votes that were
//! already entered by hand, leaving those untouched.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use dp_core::{
    ConfigIssue, CountryCode, EngineResult, OddsTable, Params, PointsId, PointsItem, PointsSystem,
    SourceVotes, Stage, StageVotes, Vote, VoteRng, VoteSource,
};

use crate::weights::{blend, source_weights};

/// Number of votes `voter` must cast in one source for the stage to be complete.
pub fn required_votes(stage: &Stage, points: &PointsSystem, voter: &CountryCode) -> usize {
    points.len().min(stage.pool_for(voter).len())
}

/// Generate every active source of `stage` from scratch.
pub fn predefine_stage_votes(
    stage: &Stage,
    points: &PointsSystem,
    odds: &OddsTable,
    params: &Params,
    rng: &mut VoteRng,
) -> EngineResult<StageVotes> {
    let mut out = StageVotes::default();
    for &source in stage.voting_mode.sources() {
        let sv = predefine_source(stage, source, points, odds, params, rng)?;
        out.set_source(source, sv);
    }
    debug!(stage = %stage.id, mode = ?stage.voting_mode, "predefined stage votes");
    Ok(out)
}

/// Generate one source from scratch.
pub fn predefine_source(
    stage: &Stage,
    source: VoteSource,
    points: &PointsSystem,
    odds: &OddsTable,
    params: &Params,
    rng: &mut VoteRng,
) -> EngineResult<SourceVotes> {
    complete_source(stage, source, points, odds, params, &SourceVotes::new(), rng)
}

/// Fill every voter of one source up to `required_votes`, keeping `existing` votes.
pub fn complete_source(
    stage: &Stage,
    source: VoteSource,
    points: &PointsSystem,
    odds: &OddsTable,
    params: &Params,
    existing: &SourceVotes,
    rng: &mut VoteRng,
) -> EngineResult<SourceVotes> {
    if stage.participants.is_empty() {
        return Err(ConfigIssue::NoParticipants(stage.id).into());
    }
    // A single ineligible voter is skipped; a source nobody can vote in is not.
    if stage.voters.iter().all(|v| stage.pool_for(v).is_empty()) {
        return Err(ConfigIssue::NoVoters { stage: stage.id, kind: source }.into());
    }

    let mut out = SourceVotes::new();
    for voter in &stage.voters {
        let mut cast: Vec<Vote> = existing
            .get(voter)
            .map(|vs| vs.iter().filter(|v| stage.is_participant(v.participant())).cloned().collect())
            .unwrap_or_default();
        fill_voter(stage, voter, source, points, odds, params, &mut cast, rng);
        cast.sort_by_key(Vote::points);
        out.insert(voter.clone(), cast);
    }
    Ok(out)
}

/// Complete one voter's ballot in place.
#[allow(clippy::too_many_arguments)]
fn fill_voter(
    stage: &Stage,
    voter: &CountryCode,
    source: VoteSource,
    points: &PointsSystem,
    odds: &OddsTable,
    params: &Params,
    cast: &mut Vec<Vote>,
    rng: &mut VoteRng,
) {
    let need = required_votes(stage, points, voter);
    if cast.len() >= need {
        return;
    }

    let used_ids: BTreeSet<PointsId> = cast.iter().map(Vote::points_id).collect();
    let taken: BTreeSet<&CountryCode> = cast.iter().map(Vote::participant).collect();
    let mut pool: Vec<CountryCode> = stage
        .pool_for(voter)
        .into_iter()
        .filter(|c| !taken.contains(c))
        .collect();

    // Lowest unused values, then handed out highest first.
    let mut values: Vec<PointsItem> = points
        .lowest(need)
        .into_iter()
        .filter(|it| !used_ids.contains(&it.id))
        .take(need - cast.len())
        .collect();
    values.reverse();

    for item in values {
        if pool.is_empty() {
            break;
        }
        let weights = blend(&source_weights(&pool, source, odds, params), params.randomness_level);
        let idx = match rng.pick_weighted(&weights) {
            Some(i) => i,
            None => {
                trace!(voter = %voter, "all remaining odds are zero; drawing uniformly");
                match rng.choose_index(pool.len()) {
                    Some(i) => i,
                    None => break,
                }
            }
        };
        let participant = pool.remove(idx);
        // The pool never contains the voter, so this cannot be a self vote.
        if let Ok(v) = Vote::new(voter, participant, item) {
            cast.push(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_core::{CountryOdds, EngineError, RandomnessLevel, VotingMode};
    use std::collections::BTreeSet;

    fn cc(s: &str) -> CountryCode { s.parse().unwrap() }

    fn stage(mode: VotingMode, participants: &[&str], voters: &[&str]) -> Stage {
        let mut st = Stage::new(1, "Semi", 0, mode);
        st.participants = participants.iter().map(|s| cc(s)).collect();
        st.voters = voters.iter().map(|s| cc(s)).collect();
        st
    }

    fn check_ballot(st: &Stage, ps: &PointsSystem, voter: &CountryCode, votes: &[Vote]) {
        assert_eq!(votes.len(), required_votes(st, ps, voter));
        let ids: BTreeSet<_> = votes.iter().map(Vote::points_id).collect();
        let who: BTreeSet<_> = votes.iter().map(Vote::participant).collect();
        assert_eq!(ids.len(), votes.len());
        assert_eq!(who.len(), votes.len());
        assert!(votes.iter().all(|v| v.participant() != voter));
        assert!(votes.iter().all(|v| st.is_participant(v.participant())));
    }

    #[test]
    fn every_active_source_is_complete() {
        let names = ["SE", "NO", "FI", "DK", "IS", "EE", "LV", "LT", "PL", "DE", "FR", "IT"];
        let st = stage(VotingMode::JuryAndTelevote, &names, &names);
        let ps = PointsSystem::eurovision();
        let mut rng = VoteRng::for_stage(11, st.id);
        let sv = predefine_stage_votes(&st, &ps, &OddsTable::new(), &Params::default(), &mut rng).unwrap();
        assert!(sv.combined.is_none());
        for source in [VoteSource::Jury, VoteSource::Televote] {
            for voter in &st.voters {
                let votes = sv.voter_votes(source, voter);
                assert_eq!(votes.len(), 10);
                check_ballot(&st, &ps, voter, votes);
            }
        }
    }

    #[test]
    fn small_pool_uses_lowest_values() {
        let st = stage(VotingMode::TelevoteOnly, &["A", "B", "C", "D", "E"], &["A", "B", "C"]);
        let ps = PointsSystem::eurovision();
        let mut rng = VoteRng::from_seed_u64(3);
        let sv = predefine_source(&st, VoteSource::Televote, &ps, &OddsTable::new(), &Params::default(), &mut rng)
            .unwrap();
        for voter in &st.voters {
            let values: Vec<u32> = sv[voter].iter().map(Vote::points).collect();
            assert_eq!(values, vec![1, 2, 3, 4]);
        }
    }

    #[test]
    fn outside_voter_gets_full_pool() {
        let st = stage(VotingMode::TelevoteOnly, &["A", "B"], &["ROW"]);
        let ps = PointsSystem::from_values(&[1, 2, 3]).unwrap();
        let mut rng = VoteRng::from_seed_u64(5);
        let sv = predefine_source(&st, VoteSource::Televote, &ps, &OddsTable::new(), &Params::default(), &mut rng)
            .unwrap();
        let values: Vec<u32> = sv[&cc("ROW")].iter().map(Vote::points).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn empty_stage_is_configuration_error() {
        let ps = PointsSystem::eurovision();
        let mut rng = VoteRng::default();
        let no_parts = stage(VotingMode::JuryOnly, &[], &["A"]);
        assert!(matches!(
            predefine_stage_votes(&no_parts, &ps, &OddsTable::new(), &Params::default(), &mut rng),
            Err(EngineError::Configuration(ConfigIssue::NoParticipants(_)))
        ));
        let no_voters = stage(VotingMode::Combined, &["A", "B"], &[]);
        assert!(matches!(
            predefine_stage_votes(&no_voters, &ps, &OddsTable::new(), &Params::default(), &mut rng),
            Err(EngineError::Configuration(ConfigIssue::NoVoters { kind: VoteSource::Combined, .. }))
        ));
        let only_self = stage(VotingMode::TelevoteOnly, &["A"], &["A"]);
        assert!(matches!(
            predefine_stage_votes(&only_self, &ps, &OddsTable::new(), &Params::default(), &mut rng),
            Err(EngineError::Configuration(ConfigIssue::NoVoters { kind: VoteSource::Televote, .. }))
        ));
        // One voter with nobody to vote for is fine while another can vote.
        let mixed = stage(VotingMode::JuryOnly, &["A"], &["A", "ROW"]);
        let sv = predefine_stage_votes(&mixed, &ps, &OddsTable::new(), &Params::default(), &mut rng).unwrap();
        assert!(sv.voter_votes(VoteSource::Jury, &cc("A")).is_empty());
        assert_eq!(sv.voter_votes(VoteSource::Jury, &cc("ROW")).len(), 1);
    }

    #[test]
    fn same_seed_same_votes() {
        let st = stage(VotingMode::Combined, &["A", "B", "C", "D"], &["A", "B", "C", "D"]);
        let ps = PointsSystem::from_values(&[1, 2, 4]).unwrap();
        let params = Params::default();
        let a = predefine_stage_votes(&st, &ps, &OddsTable::new(), &params, &mut VoteRng::for_stage(9, st.id)).unwrap();
        let b = predefine_stage_votes(&st, &ps, &OddsTable::new(), &params, &mut VoteRng::for_stage(9, st.id)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn odds_dominate_top_value_without_randomness() {
        let st = stage(VotingMode::JuryOnly, &["FAV", "B", "C", "D"], &["V1"]);
        let ps = PointsSystem::from_values(&[1, 12]).unwrap();
        let mut odds = OddsTable::new();
        odds.insert(cc("FAV"), CountryOdds::new(1000.0, 1.0));
        for name in ["B", "C", "D"] {
            odds.insert(cc(name), CountryOdds::new(0.0, 1.0));
        }
        let params = Params { randomness_level: RandomnessLevel::odds_only(), ..Params::default() };
        for seed in 0..20 {
            let mut rng = VoteRng::from_seed_u64(seed);
            let sv = predefine_source(&st, VoteSource::Jury, &ps, &odds, &params, &mut rng).unwrap();
            let top = sv[&cc("V1")].iter().find(|v| v.points() == 12).unwrap();
            assert_eq!(top.participant(), &cc("FAV"));
        }
    }

    #[test]
    fn completion_keeps_manual_votes() {
        let st = stage(VotingMode::JuryOnly, &["A", "B", "C", "D"], &["A"]);
        let ps = PointsSystem::from_values(&[1, 2, 12]).unwrap();
        let a = cc("A");
        let twelve = *ps.items().iter().find(|i| i.value == 12).unwrap();
        let mut existing = SourceVotes::new();
        existing.insert(a.clone(), vec![Vote::new(&a, cc("C"), twelve).unwrap()]);
        let mut rng = VoteRng::from_seed_u64(1);
        let sv = complete_source(&st, VoteSource::Jury, &ps, &OddsTable::new(), &Params::default(), &existing, &mut rng)
            .unwrap();
        let votes = &sv[&a];
        check_ballot(&st, &ps, &a, votes);
        assert!(votes.iter().any(|v| v.points() == 12 && v.participant() == &cc("C")));
    }
}
