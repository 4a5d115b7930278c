use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parsed PageSpeed Insights response body. Opaque to this crate; persisted
/// as received.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ScoreReport(pub Map<String, Value>);

impl ScoreReport {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}
