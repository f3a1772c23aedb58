// Command line surface of `douze`.
//
// Every subcommand reads one contest snapshot. Commands that change the
// contest write it back, either in place or to `--out`.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};

use dp_algo::ResultView;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "douze",
    version,
    disable_help_subcommand = true,
    about = "Deterministic points allocation and results reveal for song contests"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress the summary line on stderr.
    #[arg(long, global = true)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Start a stage: generate its missing votes and reset the reveal.
    Simulate(SimulateArgs),
    /// Advance the reveal of the stage in progress, printing events as JSON lines.
    Reveal(RevealArgs),
    /// Print a stage's scoreboard as JSON.
    Standings(StandingsArgs),
    /// Load a snapshot and check that it can be resumed.
    Validate(SnapshotArg),
}

#[derive(Debug, clap::Args, Clone)]
pub struct SnapshotArg {
    /// Contest snapshot JSON path.
    #[arg(long)]
    pub snapshot: PathBuf,
}

#[derive(Debug, clap::Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub input: SnapshotArg,

    /// Stage to start (default: the next stage that is not over).
    #[arg(long)]
    pub stage: Option<u32>,

    /// Params JSON path (seed, randomnessLevel, defaultOdds).
    #[arg(long)]
    pub params: Option<PathBuf>,

    /// Predefinition seed. Accepts decimal u64 or 0x-hex (≤16 hex digits).
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,

    /// Randomness level 0..=100 (0 follows the odds, 100 ignores them).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub randomness: Option<u8>,

    /// Run the whole reveal right away and print the final scoreboard event.
    #[arg(long)]
    pub finish: bool,

    /// Where to write the updated snapshot (default: overwrite --snapshot).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, clap::Args, Clone)]
pub struct RevealArgs {
    #[command(flatten)]
    pub input: SnapshotArg,

    /// Number of reveal steps to take.
    #[arg(long, default_value_t = 1, conflicts_with = "all")]
    pub steps: u32,

    /// Reveal until the stage completes.
    #[arg(long)]
    pub all: bool,

    /// Where to write the updated snapshot (default: overwrite --snapshot).
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, clap::Args, Clone)]
pub struct StandingsArgs {
    #[command(flatten)]
    pub input: SnapshotArg,

    /// Stage to score. Without it, the live scoreboard of the reveal in progress.
    #[arg(long)]
    pub stage: Option<u32>,

    /// Which votes to count (ignored for the live scoreboard).
    #[arg(long, value_enum, default_value_t = View::Total)]
    pub view: View,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum View {
    Total,
    Jury,
    Televote,
    Combined,
}

impl From<View> for ResultView {
    fn from(v: View) -> Self {
        match v {
            View::Total => ResultView::Total,
            View::Jury => ResultView::Jury,
            View::Televote => ResultView::Televote,
            View::Combined => ResultView::Combined,
        }
    }
}

/// Errors surfaced after clap has parsed the line.
#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Seed parser: decimal u64 or 0x-hex (1..=16 nybbles).
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty seed".into());
    }
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("hex seed must be 1..16 hex digits".into());
        }
        u64::from_str_radix(rest, 16).map_err(|_| "hex seed out of range".into())
    } else {
        s.parse::<u64>().map_err(|_| "decimal seed must be a valid u64".into())
    }
}

#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    match p.to_str() {
        Some(s) if has_scheme(s) => Err(CliError::NonLocalPath(s.to_string())),
        _ => Ok(()),
    }
}

impl Args {
    fn paths(&self) -> Vec<&Path> {
        match &self.command {
            Command::Simulate(a) => [Some(a.input.snapshot.as_path()), a.params.as_deref(), a.out.as_deref()]
                .into_iter()
                .flatten()
                .collect(),
            Command::Reveal(a) => [Some(a.input.snapshot.as_path()), a.out.as_deref()].into_iter().flatten().collect(),
            Command::Standings(a) => vec![a.input.snapshot.as_path()],
            Command::Validate(a) => vec![a.snapshot.as_path()],
        }
    }
}

/// Parse the process arguments. Missing files are left to the loaders so
/// they surface as I/O errors.
pub fn parse_and_validate() -> Result<Args, CliError> {
    let args = Args::parse();
    for p in args.paths() {
        ensure_local_path(p)?;
    }
    Ok(args)
}
