use std::fs;

use assert_json_diff::assert_json_include;
use serde_json::json;

use dp_core::{
    Country, CountryCode, CountryOdds, OddsTable, PointsItem, PointsSystem, RevealPhase, Stage,
    StageId, StageVotes, Vote, VoteSource, VotingMode,
};
use dp_io::{load_snapshot, save_snapshot, snapshot_id, ContestSnapshot, IoError};

fn cc(s: &str) -> CountryCode {
    s.parse().unwrap()
}

fn sample() -> ContestSnapshot {
    let countries = vec![Country::new(cc("SE"), "Sweden"), Country::new(cc("NO"), "Norway")];
    let mut odds = OddsTable::new();
    odds.insert(cc("SE"), CountryOdds::new(70.0, 30.0));
    let mut st = Stage::new(1, "Final", 0, VotingMode::JuryOnly);
    st.participants = vec![cc("SE"), cc("NO")];
    st.voters = vec![cc("SE"), cc("NO")];

    let mut snap = ContestSnapshot::new(countries, PointsSystem::from_values(&[1, 12]).unwrap(), odds, vec![st]);
    let mut votes = StageVotes::default();
    let se = cc("SE");
    let v = Vote::new(&se, cc("NO"), PointsItem::new(2, 12)).unwrap();
    votes.source_mut(VoteSource::Jury).insert(se, vec![v]);
    snap.predefined_votes.insert(StageId(1), votes);
    snap.current_stage_id = Some(StageId(1));
    snap.voting_country_index = 1;
    snap.per_country_running_total.insert(cc("NO"), 12);
    snap.per_country_running_total.insert(cc("SE"), 0);
    snap
}

#[test]
fn save_then_load_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("contest.json");
    let snap = sample();
    let id = save_snapshot(&p, &snap).unwrap();
    assert!(id.starts_with("SNP:"));
    assert_eq!(id.len(), 4 + 64);

    let back = load_snapshot(&p).unwrap();
    assert_eq!(back, snap);
    assert_eq!(snapshot_id(&back).unwrap(), id);
    assert_eq!(back.reveal_state().voting_country_index, 1);
}

#[test]
fn wire_shape_is_camel_case_and_flat() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("contest.json");
    save_snapshot(&p, &sample()).unwrap();
    let text = fs::read_to_string(&p).unwrap();
    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_json_include!(
        actual: v,
        expected: json!({
            "schemaVersion": 1,
            "currentStageId": 1,
            "votingCountryIndex": 1,
            "votingPointsIndex": 0,
            "revealPhase": "voters",
            "complete": false,
            "perCountryRunningTotal": {"NO": 12, "SE": 0},
            "pointsSystem": [{"id": 1, "value": 1}, {"id": 2, "value": 12}],
            "countryOdds": {"SE": {"juryOdds": 70.0, "televoteOdds": 30.0}},
            "stages": [{"votingMode": "JURY_ONLY", "isOver": false}],
            "predefinedVotes": {"1": {"jury": {"SE": [{"countryCode": "NO", "points": 12, "pointsId": 2}]}}}
        })
    );
    // Canonical: compact, keys sorted.
    assert!(text.starts_with(r#"{"complete":false,"countries":"#));
}

#[test]
fn minimal_snapshot_takes_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("min.json");
    fs::write(
        &p,
        r#"{"countries":[{"code":"SE","name":"Sweden"}],"pointsSystem":[{"id":1,"value":12}],"stages":[]}"#,
    )
    .unwrap();
    let snap = load_snapshot(&p).unwrap();
    assert_eq!(snap.schema_version, 1);
    assert!(snap.current_stage_id.is_none());
    assert_eq!(snap.reveal_phase, RevealPhase::Voters);
    assert!(snap.country_odds.is_empty());
}

#[test]
fn malformed_snapshots_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("bad.json");

    fs::write(&p, r#"{"schemaVersion":9,"countries":[],"pointsSystem":[{"id":1,"value":1}],"stages":[]}"#).unwrap();
    assert!(matches!(load_snapshot(&p), Err(IoError::Invalid(_))));

    // Duplicate points values fail inside the points system itself.
    fs::write(&p, r#"{"countries":[],"pointsSystem":[{"id":1,"value":1},{"id":2,"value":1}],"stages":[]}"#).unwrap();
    assert!(matches!(load_snapshot(&p), Err(IoError::Json { .. })));

    fs::write(&p, r#"{"countries":[{"code":"no way","name":"x"}],"pointsSystem":[{"id":1,"value":1}],"stages":[]}"#)
        .unwrap();
    assert!(matches!(load_snapshot(&p), Err(IoError::Json { .. })));

    assert!(matches!(load_snapshot(&dir.path().join("absent.json")), Err(IoError::Path(_))));
}
