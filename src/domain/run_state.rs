//! Run state of the two extraction workflow paths.
//!
//! Each path (`persist` and `csv`) has its own state machine:
//! `Idle -> InFlight -> Succeeded | Failed`, and any finished state may be
//! re-triggered.

use serde::Serialize;

/// Which workflow path a state or outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPath {
    /// Extract server-side and write fields back to the repository.
    Persist,
    /// Extract and buffer results for a CSV download.
    CsvPrepare,
}

impl std::fmt::Display for RunPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persist => write!(f, "persist"),
            Self::CsvPrepare => write!(f, "csv"),
        }
    }
}

/// State of one workflow path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed(String),
}

impl RunState {
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    /// Error banner for this path, if the last run failed.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Try to start a run. Refused while a run is already in flight.
    ///
    /// # Errors
    /// Returns `SkipReason::AlreadyInFlight` if the path is busy.
    pub fn begin(&mut self) -> Result<(), SkipReason> {
        if self.is_in_flight() {
            return Err(SkipReason::AlreadyInFlight);
        }
        *self = Self::InFlight;
        Ok(())
    }

    pub fn succeed(&mut self) {
        *self = Self::Succeeded;
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        *self = Self::Failed(reason.into());
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::InFlight => write!(f, "in flight"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Why a trigger did not start a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The selection is empty; the trigger is disabled.
    NothingSelected,
    /// The same path is still running.
    AlreadyInFlight,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingSelected => write!(f, "no notes selected"),
            Self::AlreadyInFlight => write!(f, "a run is already in flight"),
        }
    }
}

/// Result of triggering one workflow path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// No run was started and no network call was made.
    Skipped { reason: SkipReason },
    /// The run completed. `warning` carries a non-fatal follow-up failure.
    Succeeded { warning: Option<String> },
    /// The run failed; the path state holds the same message.
    Failed { message: String },
}

impl RunOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}
