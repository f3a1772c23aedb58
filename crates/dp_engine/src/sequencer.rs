//! Reveal sequencer: walks a stage's votes one reveal unit at a time.
//!
//! Voter phase: voters in stage order, each voter's votes from the smallest
//! value up. Jury-and-televote stages then read out the televote as one
//! aggregate per participant, lowest jury total first.
//!
//! The sequencer holds no state of its own: everything lives in the
//! `RevealState` it borrows, so a snapshot of that state resumes the reveal
//! exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use dp_algo::aggregate::{partial_totals, rank, reveal_order, total_for, totals, ResultView, RevealCursor, Standing};
use dp_core::{
    determinism::order_by_score_asc_reversed_ties, CountryCode, PointsId, PointsSystem,
    RevealPhase, RevealState, Stage, StageVotes, VoteSource,
};

/// What the UI should show after one step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RevealEvent {
    PointRevealed {
        voter: CountryCode,
        participant: CountryCode,
        points: u32,
        #[serde(rename = "pointsId")]
        points_id: PointsId,
        source: VoteSource,
    },
    /// The top value of the palette was just given. Never stored.
    DouzePoints { voter: CountryCode, participant: CountryCode },
    VoterFinished { voter: CountryCode },
    TelevoteRevealed { participant: CountryCode, points: u64 },
    StageComplete { standings: Vec<Standing> },
}

/// Participants in televote read-out order: ascending jury total, later
/// participant first among ties.
pub fn televote_order(stage: &Stage, votes: &StageVotes) -> Vec<CountryCode> {
    let jury = totals(&stage.participants, votes, ResultView::Jury);
    order_by_score_asc_reversed_ties(&stage.participants, |c| jury.get(c).copied().unwrap_or(0))
        .into_iter()
        .map(|i| stage.participants[i].clone())
        .collect()
}

/// Running totals a reveal must show at `state`, recomputed from the votes.
pub fn expected_running_totals(stage: &Stage, votes: &StageVotes, state: &RevealState) -> BTreeMap<CountryCode, u64> {
    if state.complete {
        return totals(&stage.participants, votes, ResultView::Total);
    }
    let cursor = RevealCursor {
        voter_index: state.voting_country_index,
        points_index: state.voting_points_index,
    };
    let mut out = partial_totals(stage, votes, stage.voting_mode.voter_source(), cursor);
    if state.phase == RevealPhase::Televote {
        for code in televote_order(stage, votes).iter().take(state.televote_index) {
            if let Some(t) = out.get_mut(code) {
                *t += total_for(votes, code, ResultView::Televote);
            }
        }
    }
    out
}

pub struct RevealSequencer<'a> {
    stage: &'a Stage,
    votes: &'a StageVotes,
    points: &'a PointsSystem,
    state: &'a mut RevealState,
}

impl<'a> RevealSequencer<'a> {
    pub fn new(stage: &'a Stage, votes: &'a StageVotes, points: &'a PointsSystem, state: &'a mut RevealState) -> Self {
        Self { stage, votes, points, state }
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.state.complete
    }

    /// Scoreboard of what has been revealed so far.
    pub fn standings(&self) -> Vec<Standing> {
        rank(&self.stage.participants, &self.state.per_country_running_total)
    }

    /// Reveal the next unit. Returns no events once the stage is complete.
    pub fn advance_point(&mut self) -> Vec<RevealEvent> {
        if self.state.complete {
            return Vec::new();
        }
        let mut events = Vec::new();
        match self.state.phase {
            RevealPhase::Voters => self.step_voters(&mut events),
            RevealPhase::Televote => self.step_televote(&mut events),
        }
        events
    }

    /// Jump to the end of the reveal. Emits only `StageComplete`.
    pub fn finish(&mut self) -> Vec<RevealEvent> {
        if self.state.complete {
            return Vec::new();
        }
        self.state.voting_country_index = self.stage.voters.len();
        self.state.voting_points_index = 0;
        if self.stage.voting_mode.has_televote_phase() {
            self.state.phase = RevealPhase::Televote;
            self.state.televote_index = self.stage.participants.len();
        }
        self.state.per_country_running_total = totals(&self.stage.participants, self.votes, ResultView::Total);
        let mut events = Vec::new();
        self.complete(&mut events);
        events
    }

    fn step_voters(&mut self, events: &mut Vec<RevealEvent>) {
        let (stage, votes): (&'a Stage, &'a StageVotes) = (self.stage, self.votes);
        let source = stage.voting_mode.voter_source();
        let voters = &stage.voters;

        while self.state.voting_country_index < voters.len() {
            let voter = &voters[self.state.voting_country_index];
            let ordered = reveal_order(votes.voter_votes(source, voter));
            let Some(&vote) = ordered.get(self.state.voting_points_index) else {
                // Nothing (left) to show for this voter.
                trace!(voter = %voter, "skipping voter without votes");
                self.next_voter();
                continue;
            };

            *self
                .state
                .per_country_running_total
                .entry(vote.participant().clone())
                .or_insert(0) += vote.points() as u64;
            self.state.voting_points_index += 1;

            events.push(RevealEvent::PointRevealed {
                voter: voter.clone(),
                participant: vote.participant().clone(),
                points: vote.points(),
                points_id: vote.points_id(),
                source,
            });
            if vote.points() == self.points.max_value() {
                events.push(RevealEvent::DouzePoints {
                    voter: voter.clone(),
                    participant: vote.participant().clone(),
                });
            }
            if self.state.voting_points_index >= ordered.len() {
                events.push(RevealEvent::VoterFinished { voter: voter.clone() });
                self.next_voter();
            }
            break;
        }
        // Trailing voters with nothing to show would only produce empty steps.
        while self.state.voting_points_index == 0
            && voters
                .get(self.state.voting_country_index)
                .is_some_and(|v| votes.voter_votes(source, v).is_empty())
        {
            self.next_voter();
        }

        if self.state.voting_country_index >= voters.len() {
            if stage.voting_mode.has_televote_phase() {
                debug!(stage = %stage.id, "jury reveal done; televote next");
                self.state.phase = RevealPhase::Televote;
                self.state.televote_index = 0;
                if events.is_empty() {
                    // Every remaining voter was empty; show something on this step.
                    self.step_televote(events);
                }
            } else {
                self.complete(events);
            }
        }
    }

    fn step_televote(&mut self, events: &mut Vec<RevealEvent>) {
        let votes: &'a StageVotes = self.votes;
        let order = televote_order(self.stage, votes);
        if let Some(code) = order.get(self.state.televote_index) {
            let points = total_for(votes, code, ResultView::Televote);
            *self.state.per_country_running_total.entry(code.clone()).or_insert(0) += points;
            self.state.televote_index += 1;
            events.push(RevealEvent::TelevoteRevealed { participant: code.clone(), points });
        }
        if self.state.televote_index >= order.len() {
            self.complete(events);
        }
    }

    fn next_voter(&mut self) {
        self.state.voting_points_index = 0;
        self.state.voting_country_index += 1;
    }

    fn complete(&mut self, events: &mut Vec<RevealEvent>) {
        self.state.complete = true;
        debug!(stage = %self.stage.id, "reveal complete");
        events.push(RevealEvent::StageComplete { standings: self.standings() });
    }
}
