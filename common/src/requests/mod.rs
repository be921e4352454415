use serde::Deserialize;

/// Request payload for the merge start endpoint.
/// Identifies the wizard session whose template, style and recipients are merged.
#[derive(Deserialize)]
pub struct StartMergeRequest {
    pub session_id: String,
}
