pub mod orchestrator;
pub mod pagespeed;
pub mod site_audit_service;

pub use orchestrator::Orchestrator;
pub use pagespeed::{PageSpeedClient, ScoreSource};
pub use site_audit_service::{
    normalize, AuditConfig, AuditEngine, BrowserLauncher, BrowserProcessHandle, ChromeLauncher,
    LighthouseCli,
};
