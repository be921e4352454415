use serde::{Deserialize, Serialize};

/// Why a background job ended without producing its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The recipient spreadsheet could not be read.
    Extraction,
    /// The uploaded template is not a decodable image.
    TemplateDecode,
    /// A single certificate failed to rasterize.
    Render,
    /// The archive could not be assembled.
    Archive,
    /// Anything outside the certificate pipeline (panics, lost tasks).
    Internal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    /// Percentage of recipients rendered so far.
    InProgress(u32),
    Completed(String),
    /// Number of recipients completed before the job was cancelled.
    Cancelled(u32),
    Failed {
        reason: FailureReason,
        message: String,
    },
}

impl JobStatus {
    /// Terminal states never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed(_) | JobStatus::Cancelled(_) | JobStatus::Failed { .. }
        )
    }

    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        JobStatus::Failed {
            reason,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_finished_states_are_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::InProgress(99).is_terminal());
        assert!(JobStatus::Completed("done".into()).is_terminal());
        assert!(JobStatus::Cancelled(3).is_terminal());
        assert!(JobStatus::failed(FailureReason::Render, "boom").is_terminal());
    }

    #[test]
    fn failure_reason_is_serialized_in_snake_case() {
        let json = serde_json::to_value(JobStatus::failed(FailureReason::TemplateDecode, "bad png"))
            .unwrap();
        assert_eq!(json["Failed"]["reason"], "template_decode");
        assert_eq!(json["Failed"]["message"], "bad png");
    }
}
