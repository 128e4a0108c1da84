use serde::Deserialize;

/// Error body returned by the backend on non-success statuses.
/// `detail` is usually a string; validation failures send a list instead.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => {
                Some(detail.clone())
            }
            _ => None,
        }
    }
}

/// Parses an error body, returning the human-readable detail if present.
pub fn parse_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail_message())
}
