//! Manual vote entry.
//!
//! Every check runs before anything is written, so a rejected edit leaves the
//! votes exactly as they were.

use dp_core::{
    CountryCode, PointsId, PointsSystem, Stage, StageVotes, Vote, VoteSource, Violation,
};
use tracing::debug;

fn check_target(stage: &Stage, source: VoteSource, voter: &CountryCode) -> Result<(), Violation> {
    if stage.is_over {
        return Err(Violation::StageClosed(stage.id));
    }
    if !stage.voting_mode.is_active(source) {
        return Err(Violation::InactiveSource { stage: stage.id, kind: source });
    }
    if !stage.is_voter(voter) {
        return Err(Violation::UnknownVoter(voter.clone()));
    }
    Ok(())
}

/// Give `points_id` from `voter` to `participant` in `source`.
///
/// Setting a vote that is already present is a no-op.
pub fn set_vote(
    stage: &Stage,
    points: &PointsSystem,
    votes: &mut StageVotes,
    source: VoteSource,
    voter: &CountryCode,
    participant: &CountryCode,
    points_id: PointsId,
) -> Result<(), Violation> {
    check_target(stage, source, voter)?;
    if !stage.is_participant(participant) {
        return Err(Violation::UnknownParticipant(participant.clone()));
    }
    let item = *points.get(points_id).ok_or(Violation::UnknownPoints(points_id))?;
    let vote = Vote::new(voter, participant.clone(), item)?;

    let ballot = votes.voter_votes(source, voter);
    if ballot.contains(&vote) {
        return Ok(());
    }
    if let Some(held) = ballot.iter().find(|v| v.points_id() == points_id) {
        return Err(Violation::PointsAlreadyUsed {
            voter: voter.clone(),
            points: points_id,
            holder: held.participant().clone(),
        });
    }
    if let Some(held) = ballot.iter().find(|v| v.participant() == participant) {
        return Err(Violation::ParticipantAlreadyScored {
            voter: voter.clone(),
            participant: participant.clone(),
            points: held.points_id(),
        });
    }

    let ballot = votes.source_mut(source).entry(voter.clone()).or_default();
    ballot.push(vote);
    ballot.sort_by_key(Vote::points);
    debug!(stage = %stage.id, %source, %voter, %participant, points = item.value, "vote set");
    Ok(())
}

/// Remove the vote carrying `points_id` from `voter`'s ballot, if any.
pub fn clear_vote(
    stage: &Stage,
    votes: &mut StageVotes,
    source: VoteSource,
    voter: &CountryCode,
    points_id: PointsId,
) -> Result<Option<Vote>, Violation> {
    check_target(stage, source, voter)?;
    let Some(ballot) = votes.existing_source_mut(source).and_then(|m| m.get_mut(voter)) else {
        return Ok(None);
    };
    let at = ballot.iter().position(|v| v.points_id() == points_id);
    let removed = at.map(|i| ballot.remove(i));
    if removed.is_some() {
        debug!(stage = %stage.id, %source, %voter, %points_id, "vote cleared");
    }
    Ok(removed)
}

/// Check a stored ballot against the same rules `set_vote` enforces.
pub fn check_ballot(
    stage: &Stage,
    points: &PointsSystem,
    source: VoteSource,
    voter: &CountryCode,
    ballot: &[Vote],
) -> Result<(), Violation> {
    if !stage.voting_mode.is_active(source) {
        return Err(Violation::InactiveSource { stage: stage.id, kind: source });
    }
    if !stage.is_voter(voter) {
        return Err(Violation::UnknownVoter(voter.clone()));
    }
    for (i, v) in ballot.iter().enumerate() {
        if v.participant() == voter {
            return Err(Violation::SelfVote(voter.clone()));
        }
        if !stage.is_participant(v.participant()) {
            return Err(Violation::UnknownParticipant(v.participant().clone()));
        }
        match points.get(v.points_id()) {
            Some(item) if item.value == v.points() => {}
            _ => return Err(Violation::UnknownPoints(v.points_id())),
        }
        for earlier in &ballot[..i] {
            if earlier.points_id() == v.points_id() {
                return Err(Violation::PointsAlreadyUsed {
                    voter: voter.clone(),
                    points: v.points_id(),
                    holder: earlier.participant().clone(),
                });
            }
            if earlier.participant() == v.participant() {
                return Err(Violation::ParticipantAlreadyScored {
                    voter: voter.clone(),
                    participant: v.participant().clone(),
                    points: earlier.points_id(),
                });
            }
        }
    }
    Ok(())
}
