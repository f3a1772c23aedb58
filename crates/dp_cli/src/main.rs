// `douze`: run a contest from snapshot files.
//
// Exit codes: 0 OK, 2 validation/configuration (including rejected edits
// and bad flags), 3 snapshot that cannot be resumed, 4 I/O.

mod args;

mod exitcodes {
    pub const OK: u8 = 0;
    pub const VALIDATION: u8 = 2;
    pub const RESUME: u8 = 3;
    pub const IO: u8 = 4;
}

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dp_core::{EngineError, Params, RandomnessLevel, StageId};
use dp_engine::{Contest, RevealEvent};
use dp_io::IoError;

use args::{parse_and_validate as parse_cli, Args, Command, RevealArgs, SimulateArgs, SnapshotArg, StandingsArgs};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Configuration, rejected edits, JSON shape, bad flags.
    Validation(String),
    /// Snapshot parsed but its reveal cannot be resumed.
    Resume(String),
    /// Read/write/path/limits.
    Io(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "{m}"),
            MainError::Resume(m) => write!(f, "{m}"),
            MainError::Io(m) => write!(f, "{m}"),
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("douze: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION);
        }
    };

    let rc = match run(&args) {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("douze: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc)
}

/// Logs go to stderr so stdout carries only JSON. `RUST_LOG` overrides the
/// default `info` filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let init = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if let Err(err) = init {
        eprintln!("douze: tracing already initialised: {err}");
    }
}

fn run(args: &Args) -> Result<(), MainError> {
    match &args.command {
        Command::Simulate(a) => simulate(a, args.quiet),
        Command::Reveal(a) => reveal(a, args.quiet),
        Command::Standings(a) => standings(a),
        Command::Validate(a) => validate(a, args.quiet),
    }
}

fn map_error(e: &MainError) -> u8 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::Resume(_) => RESUME,
        MainError::Io(_) => IO,
    }
}

fn map_engine_err(e: EngineError) -> MainError {
    match e {
        EngineError::InvalidResumeState(_) => MainError::Resume(e.to_string()),
        EngineError::Configuration(_) | EngineError::ConstraintViolation(_) => MainError::Validation(e.to_string()),
    }
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Path(_) | IoError::TooLarge { .. } => MainError::Io(e.to_string()),
        IoError::Json { .. } | IoError::Invalid(_) => MainError::Validation(e.to_string()),
    }
}

fn load_contest(path: &Path) -> Result<Contest, MainError> {
    let snap = dp_io::load_snapshot(path).map_err(map_io_err)?;
    Contest::from_snapshot(snap).map_err(map_engine_err)
}

fn save_contest(contest: &Contest, path: &Path, quiet: bool) -> Result<(), MainError> {
    let id = dp_io::save_snapshot(path, &contest.to_snapshot()).map_err(map_io_err)?;
    if !quiet {
        eprintln!("snapshot {id} written to {}", path.display());
    }
    Ok(())
}

/// One JSON object per line.
fn print_events(events: &[RevealEvent]) -> Result<(), MainError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for ev in events {
        let line = serde_json::to_string(ev).map_err(|e| MainError::Validation(format!("event to JSON: {e}")))?;
        writeln!(out, "{line}").map_err(|e| MainError::Io(format!("stdout: {e}")))?;
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<(), MainError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "{value}").map_err(|e| MainError::Io(format!("stdout: {e}")))
}

/// Params file first, then flag overrides; a missing seed comes from the clock.
fn resolve_params(a: &SimulateArgs) -> Result<Params, MainError> {
    let mut params = match &a.params {
        Some(p) => dp_io::load_params(p).map_err(map_io_err)?,
        None => Params::default(),
    };
    if let Some(seed) = a.seed {
        params.seed = Some(seed);
    }
    if let Some(level) = a.randomness {
        params.randomness_level = RandomnessLevel::new(level).map_err(MainError::Validation)?;
    }
    if params.seed.is_none() {
        let seed = clock_seed();
        info!(seed, "no seed given; derived one from the clock");
        params.seed = Some(seed);
    }
    Ok(params)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

fn simulate(a: &SimulateArgs, quiet: bool) -> Result<(), MainError> {
    let mut contest = load_contest(&a.input.snapshot)?;
    let params = resolve_params(a)?;
    let id = match a.stage {
        Some(id) => StageId(id),
        None => contest
            .next_stage()
            .ok_or_else(|| MainError::Validation("every stage is already over".into()))?,
    };
    debug!(stage = %id, ?params, "simulate");

    contest.start_stage(id, &params).map_err(map_engine_err)?;
    if a.finish {
        let events = contest.finish_randomly(&params).map_err(map_engine_err)?;
        print_events(&events)?;
    }
    save_contest(&contest, a.out.as_deref().unwrap_or(&a.input.snapshot), quiet)
}

fn reveal(a: &RevealArgs, quiet: bool) -> Result<(), MainError> {
    let mut contest = load_contest(&a.input.snapshot)?;
    if contest.current_stage_id().is_none() {
        return Err(MainError::Validation("no stage is in progress; run `simulate` first".into()));
    }

    let mut events = Vec::new();
    let mut taken = 0u32;
    while contest.current_stage_id().is_some() && (a.all || taken < a.steps) {
        events.extend(contest.advance_point().map_err(map_engine_err)?);
        taken += 1;
    }
    debug!(steps = taken, events = events.len(), "reveal");
    print_events(&events)?;
    save_contest(&contest, a.out.as_deref().unwrap_or(&a.input.snapshot), quiet)
}

fn standings(a: &StandingsArgs) -> Result<(), MainError> {
    let contest = load_contest(&a.input.snapshot)?;
    let table = match a.stage {
        Some(id) => contest.standings(StageId(id), a.view.into()).map_err(map_engine_err)?,
        None => contest
            .live_standings()
            .ok_or_else(|| MainError::Validation("no stage is in progress; pass --stage".into()))?,
    };
    let value = serde_json::to_value(&table).map_err(|e| MainError::Validation(format!("standings to JSON: {e}")))?;
    print_json(&value)
}

fn validate(a: &SnapshotArg, quiet: bool) -> Result<(), MainError> {
    let snap = dp_io::load_snapshot(&a.snapshot).map_err(map_io_err)?;
    let id = dp_io::snapshot_id(&snap).map_err(map_io_err)?;
    let contest = Contest::from_snapshot(snap).map_err(map_engine_err)?;
    print_json(&json!({
        "snapshotId": id,
        "currentStageId": contest.current_stage_id().map(StageId::get),
        "nextStageId": contest.next_stage().map(StageId::get),
    }))?;
    if !quiet {
        eprintln!("validate: snapshot OK");
    }
    Ok(())
}
