// src/models/mod.rs

pub mod lighthouse;
pub mod pagespeed;
pub mod run;
pub mod target;

pub use lighthouse::{Audit, Category, NormalizedMetric, NormalizedReport, RawAuditReport};
pub use pagespeed::ScoreReport;
pub use run::{
    Ack, Pipeline, PipelineOutcome, RunSummary, LIGHTHOUSE_COLLECTION, PAGESPEED_COLLECTION,
};
pub use target::{InvalidTargetUrl, TargetUrl};
