use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// pub struct for individual audit results
//
// Legacy reports carry boolean scores and raw values, modern ones carry
// `numericValue`, so the loosely typed fields stay as `Value`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// pub struct for each category score
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Category {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Audit {
    /// Score on the 0-100 scale. Binary audits report `true`/`false`.
    pub fn score(&self) -> Option<f64> {
        match self.score.as_ref()? {
            Value::Bool(true) => Some(100.0),
            Value::Bool(false) => Some(0.0),
            other => other.as_f64(),
        }
    }

    pub fn value(&self) -> Option<f64> {
        let raw = match self.raw_value.as_ref() {
            Some(Value::Bool(passed)) => Some(if *passed { 1.0 } else { 0.0 }),
            Some(other) => other.as_f64(),
            None => None,
        };
        raw.or(self.numeric_value)
    }

    pub fn optimal(&self) -> Option<f64> {
        self.optimal_value.as_ref().and_then(Value::as_f64)
    }
}
