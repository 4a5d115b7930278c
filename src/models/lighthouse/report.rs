use crate::models::lighthouse::audit::{Audit, Category};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Full Lighthouse output for one run. Fields the normalizer does not read
/// are kept in `extra` so the report can be written back out verbatim.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAuditReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_url: Option<String>,
    // Legacy aggregate, 0-100
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub categories: HashMap<String, Category>,
    #[serde(default)]
    pub audits: HashMap<String, Audit>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawAuditReport {
    /// Engine-provided overall score on the 0-100 scale, if any.
    pub fn aggregate_score(&self) -> Option<f64> {
        if let Some(score) = self.score.as_ref().and_then(Value::as_f64) {
            return Some(score);
        }
        self.categories
            .get("performance")
            .and_then(|c| c.score)
            .map(|score| score * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct NormalizedMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal: Option<f64>,
}

impl From<&Audit> for NormalizedMetric {
    fn from(audit: &Audit) -> Self {
        NormalizedMetric {
            score: audit.score(),
            value: audit.value(),
            optimal: audit.optimal(),
        }
    }
}

/// The document persisted for the audit pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NormalizedReport {
    pub score: i64,
    pub date: DateTime<Utc>,
    pub results: BTreeMap<String, NormalizedMetric>,
}
