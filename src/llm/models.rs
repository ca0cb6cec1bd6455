/// Lifecycle states the assistant API reports for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed { error: String },
    Expired,
    /// Anything else the API reports (requires_action, cancelling, ...).
    Other(String),
}

impl RunStatus {
    pub fn from_api(status: &str, last_error: Option<&str>) -> Self {
        match status {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed {
                error: last_error.unwrap_or("Unknown error").to_string(),
            },
            "expired" => RunStatus::Expired,
            other => RunStatus::Other(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Failed { .. } | RunStatus::Expired
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed { .. } => "failed",
            RunStatus::Expired => "expired",
            RunStatus::Other(s) => s,
        }
    }
}
