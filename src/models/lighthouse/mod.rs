pub mod audit;
pub mod report;

pub use audit::{Audit, Category};
pub use report::{NormalizedMetric, NormalizedReport, RawAuditReport};
