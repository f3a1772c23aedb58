//! Contest snapshot: everything needed to resume an event exactly where it
//! stopped. Wire names are camelCase; the reveal cursor sits at the top level
//! next to `currentStageId`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use dp_core::{
    Country, CountryCode, OddsTable, PointsSystem, RevealPhase, RevealState, Stage, StageId,
    StageVotes,
};

use crate::canonical_json::write_canonical_file;
use crate::hasher::snapshot_id;
use crate::{json_err, read_limited, IoError, IoResult};

pub const SCHEMA_VERSION: u32 = 1;

/// Snapshots larger than this are refused.
pub const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub countries: Vec<Country>,
    pub points_system: PointsSystem,
    #[serde(default)]
    pub country_odds: OddsTable,
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub predefined_votes: BTreeMap<StageId, StageVotes>,
    #[serde(default)]
    pub current_stage_id: Option<StageId>,

    // Reveal cursor of the current stage.
    #[serde(default)]
    pub reveal_phase: RevealPhase,
    #[serde(default)]
    pub voting_country_index: usize,
    #[serde(default)]
    pub voting_points_index: usize,
    #[serde(default)]
    pub televote_index: usize,
    #[serde(default)]
    pub per_country_running_total: BTreeMap<CountryCode, u64>,
    #[serde(default)]
    pub complete: bool,
}

impl ContestSnapshot {
    /// A snapshot of a configured event that has not started any stage.
    pub fn new(countries: Vec<Country>, points_system: PointsSystem, country_odds: OddsTable, stages: Vec<Stage>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            countries,
            points_system,
            country_odds,
            stages,
            predefined_votes: BTreeMap::new(),
            current_stage_id: None,
            reveal_phase: RevealPhase::Voters,
            voting_country_index: 0,
            voting_points_index: 0,
            televote_index: 0,
            per_country_running_total: BTreeMap::new(),
            complete: false,
        }
    }

    pub fn reveal_state(&self) -> RevealState {
        RevealState {
            phase: self.reveal_phase,
            voting_country_index: self.voting_country_index,
            voting_points_index: self.voting_points_index,
            televote_index: self.televote_index,
            per_country_running_total: self.per_country_running_total.clone(),
            complete: self.complete,
        }
    }

    pub fn set_reveal_state(&mut self, r: RevealState) {
        self.reveal_phase = r.phase;
        self.voting_country_index = r.voting_country_index;
        self.voting_points_index = r.voting_points_index;
        self.televote_index = r.televote_index;
        self.per_country_running_total = r.per_country_running_total;
        self.complete = r.complete;
    }
}

/// Read and parse a snapshot. Only the wire shape is checked here; resume
/// validates the contents.
pub fn load_snapshot(path: &Path) -> IoResult<ContestSnapshot> {
    let bytes = read_limited(path, MAX_SNAPSHOT_BYTES)?;
    let snap: ContestSnapshot = serde_json::from_slice(&bytes).map_err(|e| json_err(path, e))?;
    if snap.schema_version != SCHEMA_VERSION {
        return Err(IoError::Invalid(format!(
            "{}: unsupported schemaVersion {} (expected {SCHEMA_VERSION})",
            path.display(),
            snap.schema_version
        )));
    }
    let id = snapshot_id(&snap)?;
    info!(path = %path.display(), snapshot = %id, "loaded snapshot");
    Ok(snap)
}

/// Write a snapshot as canonical JSON; returns its `SNP:` id.
pub fn save_snapshot(path: &Path, snap: &ContestSnapshot) -> IoResult<String> {
    let id = snapshot_id(snap)?;
    write_canonical_file(path, snap)?;
    debug!(stages = snap.stages.len(), current = ?snap.current_stage_id, "snapshot written");
    info!(path = %path.display(), snapshot = %id, "saved snapshot");
    Ok(id)
}
