//! Snapshot ↔ contest.
//!
//! Loading re-runs the configuration checks and then checks the stored votes
//! and reveal cursor against each other. Nothing is clamped: an out-of-range
//! or inconsistent cursor is an `InvalidResumeState`.

use tracing::{debug, info};

use dp_core::{EngineError, EngineResult, RevealPhase, RevealState};
use dp_io::ContestSnapshot;

use crate::contest::Contest;
use crate::edit::check_ballot;
use crate::sequencer::expected_running_totals;

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidResumeState(msg.into())
}

impl Contest {
    pub fn to_snapshot(&self) -> ContestSnapshot {
        let mut snap = ContestSnapshot::new(
            self.countries.clone(),
            self.points.clone(),
            self.odds.clone(),
            self.stages.clone(),
        );
        snap.predefined_votes = self.votes.clone();
        snap.current_stage_id = self.current;
        snap.set_reveal_state(self.reveal.clone());
        snap
    }

    pub fn from_snapshot(snap: ContestSnapshot) -> EngineResult<Self> {
        let reveal = snap.reveal_state();
        let ContestSnapshot { countries, points_system, country_odds, stages, predefined_votes, current_stage_id, .. } = snap;
        let mut contest = Contest::new(countries, points_system, country_odds, stages)?;

        for (id, votes) in &predefined_votes {
            let stage = contest
                .stage(*id)
                .ok_or_else(|| invalid(format!("votes stored for unknown stage {id}")))?;
            for (source, by_voter) in votes.sources() {
                for (voter, ballot) in by_voter {
                    check_ballot(stage, &contest.points, source, voter, ballot)
                        .map_err(|v| invalid(format!("stage {id}, {source} ballot of {voter}: {v}")))?;
                }
            }
        }
        contest.votes = predefined_votes;

        match current_stage_id {
            None => {
                if reveal != RevealState::default() {
                    return Err(invalid("reveal cursor set but no stage is in progress"));
                }
            }
            Some(id) => {
                check_cursor(&contest, id, &reveal)?;
                contest.current = Some(id);
                contest.reveal = reveal;
            }
        }
        info!(current = ?contest.current, "contest resumed");
        Ok(contest)
    }
}

fn check_cursor(contest: &Contest, id: dp_core::StageId, r: &RevealState) -> EngineResult<()> {
    let stage = contest.stage(id).ok_or_else(|| invalid(format!("current stage {id} does not exist")))?;
    if stage.is_over {
        return Err(invalid(format!("current stage {id} is already over")));
    }
    let votes = contest
        .votes(id)
        .ok_or_else(|| invalid(format!("current stage {id} has no votes")))?;
    if r.complete {
        return Err(invalid("a completed reveal cannot be resumed"));
    }

    let voters = stage.voters.len();
    if r.voting_country_index > voters {
        return Err(invalid(format!("votingCountryIndex {} > {voters} voters", r.voting_country_index)));
    }
    match stage.voters.get(r.voting_country_index) {
        Some(voter) => {
            let cast = votes.voter_votes(stage.voting_mode.voter_source(), voter).len();
            if r.voting_points_index > cast {
                return Err(invalid(format!(
                    "votingPointsIndex {} > {cast} votes of {voter}",
                    r.voting_points_index
                )));
            }
        }
        None if r.voting_points_index != 0 => {
            return Err(invalid("votingPointsIndex must be 0 once every voter is done"));
        }
        None => {}
    }

    match r.phase {
        RevealPhase::Voters if r.televote_index != 0 => {
            return Err(invalid("televoteIndex set before the televote phase"));
        }
        RevealPhase::Voters => {}
        RevealPhase::Televote => {
            if !stage.voting_mode.has_televote_phase() {
                return Err(invalid(format!("stage {id} has no televote phase")));
            }
            if r.voting_country_index != voters {
                return Err(invalid("televote phase before every jury voter is done"));
            }
            if r.televote_index > stage.participants.len() {
                return Err(invalid(format!(
                    "televoteIndex {} > {} participants",
                    r.televote_index,
                    stage.participants.len()
                )));
            }
        }
    }

    let expected = expected_running_totals(stage, votes, r);
    if expected != r.per_country_running_total {
        debug!(?expected, stored = ?r.per_country_running_total, "running totals differ");
        return Err(invalid("perCountryRunningTotal does not match the revealed votes"));
    }
    Ok(())
}
