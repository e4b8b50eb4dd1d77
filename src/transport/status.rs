//! Stream termination status

/// Status a stream is finished with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishStatus {
    /// Normal completion
    Ok,
    /// Peer or framework cancelled, or a write failed
    Cancelled,
    /// Server-side abort
    Aborted,
    /// Stream was in a state that did not allow the operation
    FailedPrecondition,
}

impl FinishStatus {
    /// Whether this status reports a successful stream
    pub fn is_ok(&self) -> bool {
        matches!(self, FinishStatus::Ok)
    }
}

impl std::fmt::Display for FinishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FinishStatus::Ok => write!(f, "ok"),
            FinishStatus::Cancelled => write!(f, "cancelled"),
            FinishStatus::Aborted => write!(f, "aborted"),
            FinishStatus::FailedPrecondition => write!(f, "failed precondition"),
        }
    }
}
