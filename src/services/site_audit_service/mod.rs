// src/services/site_audit_service/mod.rs

pub mod browser;
pub mod lighthouse;
pub mod normalize;

pub use browser::{BrowserLauncher, BrowserProcessHandle, ChromeLauncher};
pub use lighthouse::{AuditConfig, AuditEngine, LighthouseCli, DEFAULT_METRICS};
pub use normalize::{normalize, MISSING_SCORE};
