use serde::Serialize;
use std::fmt;
use uuid::Uuid;

pub const PAGESPEED_COLLECTION: &str = "pagespeed";
pub const LIGHTHOUSE_COLLECTION: &str = "lighthouse";

/// Write acknowledgment from the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    pub collection: String,
    pub id: Uuid,
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipeline {
    PageSpeed,
    Lighthouse,
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pipeline::PageSpeed => "pagespeed",
            Pipeline::Lighthouse => "lighthouse",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PipelineOutcome {
    Stored { ack: Ack },
    Failed { message: String },
}

impl PipelineOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, PipelineOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub url: String,
    pub pagespeed: PipelineOutcome,
    pub lighthouse: PipelineOutcome,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        [&self.pagespeed, &self.lighthouse]
            .iter()
            .filter(|outcome| outcome.is_failure())
            .count()
    }
}
