//! Results aggregation (deterministic, integers only).
//!
//! - Totals are plain sums over voters; voter order never matters.
//! - Ranking is by descending total with ties kept in participant order.
//! - Partial totals sum only what a reveal cursor has passed, so they are
//!   always a sub-sum of the final totals and equal them once the cursor is
//!   past the last voter.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use dp_core::{
    determinism::{order_by_score_desc, sum_by_key}, ConfigIssue, CountryCode, EngineResult, Stage, StageId,
    StageVotes, Vote, VoteSource,
};

/// Which sources a total is read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ResultView {
    Total,
    Jury,
    Televote,
    Combined,
}

impl ResultView {
    pub fn includes(self, source: VoteSource) -> bool {
        match self {
            ResultView::Total => true,
            ResultView::Jury => source == VoteSource::Jury,
            ResultView::Televote => source == VoteSource::Televote,
            ResultView::Combined => source == VoteSource::Combined,
        }
    }
}

impl From<VoteSource> for ResultView {
    fn from(s: VoteSource) -> Self {
        match s {
            VoteSource::Jury => ResultView::Jury,
            VoteSource::Televote => ResultView::Televote,
            VoteSource::Combined => ResultView::Combined,
        }
    }
}

/// One line of a scoreboard.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Standing {
    /// 1-based position in the ordering.
    pub place: u32,
    pub code: CountryCode,
    pub total: u64,
}

/// Position of a reveal: voters `[0, voter_index)` are fully counted, plus the
/// `points_index` smallest votes of the voter at `voter_index`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RevealCursor {
    pub voter_index: usize,
    pub points_index: usize,
}

/// Points `participant` received in `view`.
pub fn total_for(votes: &StageVotes, participant: &CountryCode, view: ResultView) -> u64 {
    votes
        .sources()
        .filter(|(s, _)| view.includes(*s))
        .flat_map(|(_, by_voter)| by_voter.values())
        .flatten()
        .filter(|v| v.participant() == participant)
        .map(|v| v.points() as u64)
        .sum()
}

/// Totals for every participant (zero-filled), in `view`.
pub fn totals(participants: &[CountryCode], votes: &StageVotes, view: ResultView) -> BTreeMap<CountryCode, u64> {
    let zeros = participants.iter().map(|c| (c.clone(), 0));
    let cast = votes
        .sources()
        .filter(|(s, _)| view.includes(*s))
        .flat_map(|(_, by_voter)| by_voter.values())
        .flatten()
        .filter(|v| participants.contains(v.participant()))
        .map(|v| (v.participant().clone(), v.points() as u64));
    sum_by_key(zeros.chain(cast))
}

/// A voter's votes in reveal order: ascending by value.
pub fn reveal_order(votes: &[Vote]) -> Vec<&Vote> {
    let mut xs: Vec<&Vote> = votes.iter().collect();
    xs.sort_by_key(|v| v.points());
    xs
}

/// Totals of `source` counted up to `cursor`, voters taken in stage order.
pub fn partial_totals(
    stage: &Stage,
    votes: &StageVotes,
    source: VoteSource,
    cursor: RevealCursor,
) -> BTreeMap<CountryCode, u64> {
    let mut out: BTreeMap<CountryCode, u64> = stage.participants.iter().map(|c| (c.clone(), 0)).collect();
    for (i, voter) in stage.voters.iter().enumerate().take(cursor.voter_index.saturating_add(1)) {
        let ordered = reveal_order(votes.voter_votes(source, voter));
        let upto = if i < cursor.voter_index { ordered.len() } else { cursor.points_index.min(ordered.len()) };
        for v in &ordered[..upto] {
            if let Some(t) = out.get_mut(v.participant()) {
                *t += v.points() as u64;
            }
        }
    }
    out
}

/// Scoreboard: descending total; ties stay in participant order.
pub fn rank(participants: &[CountryCode], totals: &BTreeMap<CountryCode, u64>) -> Vec<Standing> {
    let score = |c: &CountryCode| totals.get(c).copied().unwrap_or(0);
    order_by_score_desc(participants, score)
        .into_iter()
        .enumerate()
        .map(|(pos, i)| Standing {
            place: pos as u32 + 1,
            code: participants[i].clone(),
            total: score(&participants[i]),
        })
        .collect()
}

/// Top `amount` participants of `stage` by total.
pub fn qualifiers(stage: &Stage, votes: &StageVotes, amount: usize) -> Vec<CountryCode> {
    let t = totals(&stage.participants, votes, ResultView::Total);
    rank(&stage.participants, &t)
        .into_iter()
        .take(amount)
        .map(|s| s.code)
        .collect()
}

/// Hand consecutive slices of the ranking to each `qualifies_to` target, in list order.
pub fn distribute_qualifiers(stage: &Stage, votes: &StageVotes) -> EngineResult<Vec<(StageId, Vec<CountryCode>)>> {
    let wanted = stage.qualifying_total();
    if wanted > stage.participants.len() as u64 {
        return Err(ConfigIssue::QualificationOverflow {
            stage: stage.id,
            amount: u32::try_from(wanted).unwrap_or(u32::MAX),
            participants: stage.participants.len(),
        }
        .into());
    }
    let ranked = qualifiers(stage, votes, wanted as usize);
    let mut rest = ranked.as_slice();
    let mut out = Vec::with_capacity(stage.qualifies_to.len());
    for q in &stage.qualifies_to {
        let (head, tail) = rest.split_at(q.amount as usize);
        out.push((q.target_stage_id, head.to_vec()));
        rest = tail;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dp_core::{PointsItem, Qualification, SourceVotes, VotingMode};

    fn cc(s: &str) -> CountryCode { s.parse().unwrap() }

    fn vote(voter: &str, to: &str, id: u32, value: u32) -> Vote {
        Vote::new(&cc(voter), cc(to), PointsItem::new(id, value)).unwrap()
    }

    fn sample() -> (Stage, StageVotes) {
        let mut st = Stage::new(1, "Semi", 0, VotingMode::JuryAndTelevote);
        st.participants = vec![cc("A"), cc("B"), cc("C")];
        st.voters = vec![cc("A"), cc("B"), cc("C")];
        let mut jury = SourceVotes::new();
        jury.insert(cc("A"), vec![vote("A", "B", 2, 12), vote("A", "C", 1, 8)]);
        jury.insert(cc("B"), vec![vote("B", "A", 2, 12), vote("B", "C", 1, 8)]);
        jury.insert(cc("C"), vec![vote("C", "B", 2, 12), vote("C", "A", 1, 8)]);
        let mut tele = SourceVotes::new();
        tele.insert(cc("A"), vec![vote("A", "C", 2, 12), vote("A", "B", 1, 8)]);
        let mut sv = StageVotes::default();
        sv.set_source(VoteSource::Jury, jury);
        sv.set_source(VoteSource::Televote, tele);
        (st, sv)
    }

    #[test]
    fn totals_per_view() {
        let (st, sv) = sample();
        assert_eq!(total_for(&sv, &cc("B"), ResultView::Jury), 24);
        assert_eq!(total_for(&sv, &cc("B"), ResultView::Televote), 8);
        assert_eq!(total_for(&sv, &cc("B"), ResultView::Total), 32);
        let t = totals(&st.participants, &sv, ResultView::Total);
        assert_eq!(t[&cc("A")], 20);
        assert_eq!(t[&cc("C")], 28);
        for p in &st.participants {
            assert_eq!(t[p], total_for(&sv, p, ResultView::Total));
        }
    }

    #[test]
    fn rank_breaks_ties_by_participant_order() {
        let (st, sv) = sample();
        // Jury: A 20, B 24, C 16; lift A to force a tie with B.
        let mut t = totals(&st.participants, &sv, ResultView::Jury);
        t.insert(cc("A"), 24);
        let r = rank(&st.participants, &t);
        let codes: Vec<&str> = r.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B", "C"]);
        assert_eq!(r[0].place, 1);
        assert_eq!(r[1].place, 2);
    }

    #[test]
    fn partial_totals_reach_final() {
        let (st, sv) = sample();
        let start = partial_totals(&st, &sv, VoteSource::Jury, RevealCursor::default());
        assert!(start.values().all(|&v| v == 0));
        // A's smallest vote only: 8 to C
        let one = partial_totals(&st, &sv, VoteSource::Jury, RevealCursor { voter_index: 0, points_index: 1 });
        assert_eq!(one[&cc("C")], 8);
        assert_eq!(one.values().sum::<u64>(), 8);
        let end = partial_totals(&st, &sv, VoteSource::Jury, RevealCursor { voter_index: 3, points_index: 0 });
        assert_eq!(end, totals(&st.participants, &sv, ResultView::Jury));
    }

    #[test]
    fn qualifiers_are_split_across_targets() {
        let (mut st, sv) = sample();
        st.qualifies_to = vec![
            Qualification { target_stage_id: StageId(5), amount: 1 },
            Qualification { target_stage_id: StageId(6), amount: 1 },
        ];
        // Totals: A 20, B 32, C 28
        let d = distribute_qualifiers(&st, &sv).unwrap();
        assert_eq!(d, vec![(StageId(5), vec![cc("B")]), (StageId(6), vec![cc("C")])]);
        assert_eq!(qualifiers(&st, &sv, 10), vec![cc("B"), cc("C"), cc("A")]);

        st.qualifies_to.push(Qualification { target_stage_id: StageId(7), amount: 2 });
        assert!(distribute_qualifiers(&st, &sv).is_err());
    }
}
