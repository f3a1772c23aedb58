//! Engine error kinds.
//!
//! All three kinds are local, recoverable conditions: they are returned to the
//! caller and never retried. `Configuration` and `InvalidResumeState` are meant
//! to be shown to a user; `ConstraintViolation` guards the manual edit path.

use thiserror::Error;

use crate::ids::{CountryCode, PointsId, StageId};
use crate::entities::VoteSource;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Configuration(ConfigIssue),

    #[error("constraint violation: {0}")]
    ConstraintViolation(Violation),

    #[error("invalid resume state: {0}")]
    InvalidResumeState(String),
}

/// What is wrong with the configured event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigIssue {
    #[error("points system is empty")]
    EmptyPointsSystem,
    #[error("points value must be positive (points id {0})")]
    NonPositivePoints(PointsId),
    #[error("duplicate points value {0}")]
    DuplicatePointsValue(u32),
    #[error("duplicate points id {0}")]
    DuplicatePointsId(PointsId),
    #[error("odds for {0} must be finite and non-negative")]
    InvalidOdds(CountryCode),
    #[error("stage {0} has no participants")]
    NoParticipants(StageId),
    #[error("stage {stage} has no {kind} voters")]
    NoVoters { stage: StageId, kind: VoteSource },
    #[error("duplicate stage id {0}")]
    DuplicateStage(StageId),
    #[error("unknown stage {0}")]
    UnknownStage(StageId),
    #[error("unknown country {code} in stage {stage}")]
    UnknownCountry { stage: StageId, code: CountryCode },
    #[error("duplicate country {code} in stage {stage}")]
    DuplicateCountry { stage: StageId, code: CountryCode },
    #[error("duplicate country {0} in catalog")]
    DuplicateCatalogCountry(CountryCode),
    #[error("stage {stage} qualifies {amount} but has only {participants} participants")]
    QualificationOverflow { stage: StageId, amount: u32, participants: usize },
    #[error("stage {stage} cannot qualify into stage {target} (target must exist and come later)")]
    BadQualificationTarget { stage: StageId, target: StageId },
    #[error("stage {0} is already over")]
    StageOver(StageId),
    #[error("no stage is in progress")]
    NoActiveStage,
    #[error("stage {0} is still in progress")]
    StageInProgress(StageId),
    #[error("{0}")]
    Other(String),
}

/// Why a manual vote edit was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("stage {0} is over; its votes are read-only")]
    StageClosed(StageId),
    #[error("stage {0} is being revealed; its votes are frozen")]
    RevealInProgress(StageId),
    #[error("source {kind} is not active in stage {stage}")]
    InactiveSource { stage: StageId, kind: VoteSource },
    #[error("{0} is not a voter in this stage")]
    UnknownVoter(CountryCode),
    #[error("{0} is not a participant in this stage")]
    UnknownParticipant(CountryCode),
    #[error("{0} cannot vote for itself")]
    SelfVote(CountryCode),
    #[error("unknown points id {0}")]
    UnknownPoints(PointsId),
    #[error("{voter} already gave points id {points} to {holder}")]
    PointsAlreadyUsed { voter: CountryCode, points: PointsId, holder: CountryCode },
    #[error("{participant} already holds points id {points} from {voter}")]
    ParticipantAlreadyScored { voter: CountryCode, participant: CountryCode, points: PointsId },
}

impl From<ConfigIssue> for EngineError {
    fn from(issue: ConfigIssue) -> Self {
        EngineError::Configuration(issue)
    }
}

impl From<Violation> for EngineError {
    fn from(v: Violation) -> Self {
        EngineError::ConstraintViolation(v)
    }
}
