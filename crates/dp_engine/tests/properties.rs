use std::collections::BTreeSet;

use proptest::prelude::*;

use dp_algo::aggregate::{total_for, totals};
use dp_algo::predefine::required_votes;
use dp_core::{
    Country, CountryCode, CountryOdds, OddsTable, Params, PointsSystem, RandomnessLevel, Stage,
    StageId, VotingMode,
};
use dp_engine::{expected_running_totals, Contest, ResultView};

fn mode_strategy() -> impl Strategy<Value = VotingMode> {
    prop_oneof![
        Just(VotingMode::JuryOnly),
        Just(VotingMode::TelevoteOnly),
        Just(VotingMode::JuryAndTelevote),
        Just(VotingMode::Combined),
    ]
}

/// A one-stage contest with `n` participants, every one of them voting, plus
/// `outside` extra voters who do not compete.
fn build(n: usize, outside: usize, mode: VotingMode, odds: &[(u16, u16)], palette: &[u32]) -> Contest {
    let parts: Vec<CountryCode> = (0..n).map(|i| format!("C{i}").parse().unwrap()).collect();
    let extra: Vec<CountryCode> = (0..outside).map(|i| format!("X{i}").parse().unwrap()).collect();
    let countries: Vec<Country> = parts.iter().chain(&extra).map(|c| Country::new(c.clone(), c.as_str())).collect();
    let table: OddsTable = parts
        .iter()
        .zip(odds.iter().cycle())
        .map(|(c, &(j, t))| (c.clone(), CountryOdds::new(j as f64, t as f64)))
        .collect();
    let mut st = Stage::new(1, "Stage", 0, mode);
    st.participants = parts.clone();
    st.voters = parts.into_iter().chain(extra).collect();
    let ps = PointsSystem::from_values(palette).unwrap();
    Contest::new(countries, ps, table, vec![st]).unwrap()
}

fn palette_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::btree_set(1u32..40, 1..12).prop_map(|s| s.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, ..ProptestConfig::default() })]

    #[test]
    fn predefined_ballots_satisfy_constraints(
        n in 2usize..9,
        outside in 0usize..3,
        mode in mode_strategy(),
        odds in prop::collection::vec((0u16..100, 0u16..100), 1..6),
        palette in palette_strategy(),
        seed in any::<u64>(),
        level in 0u8..=100,
    ) {
        let mut contest = build(n, outside, mode, &odds, &palette);
        let params = Params { seed: Some(seed), randomness_level: RandomnessLevel::new(level).unwrap(), ..Params::default() };
        contest.start_stage(StageId(1), &params).unwrap();
        let stage = contest.stage(StageId(1)).unwrap().clone();
        let votes = contest.votes(StageId(1)).unwrap().clone();

        for &source in mode.sources() {
            for voter in &stage.voters {
                let ballot = votes.voter_votes(source, voter);
                prop_assert_eq!(ballot.len(), required_votes(&stage, contest.points_system(), voter));
                let ids: BTreeSet<_> = ballot.iter().map(|v| v.points_id()).collect();
                let who: BTreeSet<_> = ballot.iter().map(|v| v.participant().clone()).collect();
                prop_assert_eq!(ids.len(), ballot.len());
                prop_assert_eq!(who.len(), ballot.len());
                prop_assert!(!who.contains(voter));
                prop_assert!(who.iter().all(|p| stage.is_participant(p)));
            }
        }
    }

    #[test]
    fn totals_equal_per_participant_sums(
        n in 2usize..8,
        mode in mode_strategy(),
        palette in palette_strategy(),
        seed in any::<u64>(),
    ) {
        let mut contest = build(n, 1, mode, &[(50, 50)], &palette);
        contest.start_stage(StageId(1), &Params::with_seed(seed)).unwrap();
        let stage = contest.stage(StageId(1)).unwrap();
        let votes = contest.votes(StageId(1)).unwrap();
        let all = totals(&stage.participants, votes, ResultView::Total);
        for p in &stage.participants {
            prop_assert_eq!(all[p], total_for(votes, p, ResultView::Total));
        }
        let cast: u64 = votes
            .sources()
            .flat_map(|(_, m)| m.values())
            .flatten()
            .map(|v| v.points() as u64)
            .sum();
        prop_assert_eq!(all.values().sum::<u64>(), cast);
    }

    #[test]
    fn reveal_is_monotone_and_ends_at_final_totals(
        n in 2usize..7,
        mode in mode_strategy(),
        palette in palette_strategy(),
        seed in any::<u64>(),
    ) {
        let mut contest = build(n, 1, mode, &[(10, 90), (90, 10)], &palette);
        contest.start_stage(StageId(1), &Params::with_seed(seed)).unwrap();
        let stage = contest.stage(StageId(1)).unwrap().clone();
        let votes = contest.votes(StageId(1)).unwrap().clone();
        let final_totals = totals(&stage.participants, &votes, ResultView::Total);

        let mut prev = contest.reveal_state().clone();
        let mut last_standings = None;
        while contest.current_stage_id().is_some() {
            for ev in contest.advance_point().unwrap() {
                if let dp_engine::RevealEvent::StageComplete { standings } = ev {
                    last_standings = Some(standings);
                }
            }
            let now = contest.reveal_state().clone();
            if contest.current_stage_id().is_none() {
                break;
            }
            prop_assert!((now.phase, now.voting_country_index, now.televote_index)
                >= (prev.phase, prev.voting_country_index, prev.televote_index));
            if now.phase == prev.phase && now.voting_country_index == prev.voting_country_index {
                prop_assert!(now.voting_points_index >= prev.voting_points_index);
            }
            for (code, total) in &now.per_country_running_total {
                prop_assert!(*total >= prev.per_country_running_total.get(code).copied().unwrap_or(0));
                prop_assert!(*total <= final_totals[code]);
            }
            prop_assert_eq!(&now.per_country_running_total, &expected_running_totals(&stage, &votes, &now));
            prev = now;
        }
        let standings = last_standings.unwrap();
        for s in &standings {
            prop_assert_eq!(s.total, final_totals[&s.code]);
        }
    }

    #[test]
    fn resume_from_any_step_matches_straight_run(
        n in 2usize..6,
        mode in mode_strategy(),
        seed in any::<u64>(),
        cut in 0usize..40,
    ) {
        let mut straight = build(n, 1, mode, &[(30, 70)], &[1, 2, 3, 5, 8]);
        straight.start_stage(StageId(1), &Params::with_seed(seed)).unwrap();
        let mut partial = straight.clone();

        let mut all = Vec::new();
        while straight.current_stage_id().is_some() {
            all.extend(straight.advance_point().unwrap());
        }

        let mut events = Vec::new();
        for _ in 0..cut {
            if partial.current_stage_id().is_none() {
                break;
            }
            events.extend(partial.advance_point().unwrap());
        }
        let text = serde_json::to_string(&partial.to_snapshot()).unwrap();
        let mut resumed = Contest::from_snapshot(serde_json::from_str(&text).unwrap()).unwrap();
        while resumed.current_stage_id().is_some() {
            events.extend(resumed.advance_point().unwrap());
        }
        prop_assert_eq!(events, all);
        prop_assert_eq!(resumed, straight);
    }
}
