/// Country state definitions for tracking batch progress
///
/// Every country in the directory listing moves through this state machine
/// exactly once per run.
use std::fmt;

/// Represents the current state of a country in the batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountryState {
    // ===== Active States =====
    /// Country is listed but has not been attempted in this run
    Pending,

    /// Country page is being fetched and extracted
    InProgress,

    // ===== Terminal States =====
    /// Record was built and stored
    Done,

    /// Record already present in loaded progress, no request made
    Skipped,

    /// Fetch failed; the failure is in the error log
    Errored,
}

impl CountryState {
    /// Returns true if this is a terminal state (no further processing this run)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped | Self::Errored)
    }

    /// Returns true if the state machine allows moving from `self` to `next`
    ///
    /// ```text
    /// Pending -> InProgress -> {Done | Errored}
    /// Pending -> Skipped
    /// ```
    pub fn can_transition_to(&self, next: CountryState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Skipped)
                | (Self::InProgress, Self::Done)
                | (Self::InProgress, Self::Errored)
        )
    }

    /// Converts the state to its string representation used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Skipped => "skipped",
            Self::Errored => "errored",
        }
    }
}

impl fmt::Display for CountryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
