use serde::{Deserialize, Serialize};

/// Outcome of reading the recipient spreadsheet, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientsState {
    /// At least one name was found.
    Ready,
    /// The spreadsheet was read but holds no usable names.
    NoRecipients,
    /// The uploaded file is not a spreadsheet we can read.
    Unreadable,
    /// No spreadsheet has been uploaded for the session yet.
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientsResponse {
    pub state: RecipientsState,
    pub count: usize,
    pub names: Vec<String>,
    /// Parser diagnostics when `state` is `Unreadable`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RecipientsResponse {
    pub fn from_names(names: Vec<String>) -> Self {
        let state = if names.is_empty() {
            RecipientsState::NoRecipients
        } else {
            RecipientsState::Ready
        };
        Self {
            state,
            count: names.len(),
            names,
            message: None,
        }
    }

    pub fn unreadable(message: impl Into<String>) -> Self {
        Self {
            state: RecipientsState::Unreadable,
            count: 0,
            names: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn missing() -> Self {
        Self {
            state: RecipientsState::Missing,
            count: 0,
            names: Vec::new(),
            message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetUploadResponse {
    /// True when the uploaded bytes match the spreadsheet already stored.
    pub unchanged: bool,
    pub recipients: RecipientsResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_list_is_reported_as_no_recipients() {
        let response = RecipientsResponse::from_names(Vec::new());
        assert_eq!(response.state, RecipientsState::NoRecipients);
        assert_eq!(response.count, 0);

        let response = RecipientsResponse::from_names(vec!["Ada".into(), "Ada".into()]);
        assert_eq!(response.state, RecipientsState::Ready);
        assert_eq!(response.count, 2);
    }
}
