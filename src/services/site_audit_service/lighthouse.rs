use crate::error::AuditError;
use crate::models::{RawAuditReport, TargetUrl};
use crate::services::site_audit_service::browser::BrowserProcessHandle;
use async_trait::async_trait;
use log::info;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Metrics carried into the normalized report, in the order they are read.
pub const DEFAULT_METRICS: &[&str] = &[
    "first-meaningful-paint",
    "speed-index-metric",
    "estimated-input-latency",
    "time-to-interactive",
    "dom-size",
    "total-byte-weight",
    "link-blocking-first-paint",
    "script-blocking-first-paint",
];

#[derive(Debug, Clone)]
pub struct AuditConfig {
    pub only_categories: Vec<String>,
    pub metrics: Vec<String>,
    pub max_wait_for_load_ms: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        AuditConfig {
            only_categories: vec!["performance".to_string()],
            metrics: DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            max_wait_for_load_ms: crate::config::DEFAULT_MAX_WAIT_MS,
        }
    }
}

#[async_trait]
pub trait AuditEngine: Send + Sync {
    async fn run_audit(
        &self,
        url: &TargetUrl,
        handle: &BrowserProcessHandle,
        config: &AuditConfig,
    ) -> Result<RawAuditReport, AuditError>;
}

/// Runs the `lighthouse` CLI against an already running browser.
pub struct LighthouseCli {
    executable: PathBuf,
}

impl LighthouseCli {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        LighthouseCli {
            executable: executable.into(),
        }
    }

    fn args(url: &TargetUrl, port: u16, config: &AuditConfig) -> Vec<String> {
        let mut args = vec![
            url.as_str().to_string(),
            format!("--port={}", port),
            "--output=json".to_string(),
            "--output-path=stdout".to_string(),
            "--quiet".to_string(),
            "--no-enable-error-reporting".to_string(),
            format!("--max-wait-for-load={}", config.max_wait_for_load_ms),
        ];
        if !config.only_categories.is_empty() {
            args.push(format!("--only-categories={}", config.only_categories.join(",")));
        }
        args
    }
}

#[async_trait]
impl AuditEngine for LighthouseCli {
    async fn run_audit(
        &self,
        url: &TargetUrl,
        handle: &BrowserProcessHandle,
        config: &AuditConfig,
    ) -> Result<RawAuditReport, AuditError> {
        info!("Running lighthouse for {} on port {}", url, handle.port());
        let output = Command::new(&self.executable)
            .args(Self::args(url, handle.port(), config))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| AuditError::Spawn {
                executable: self.executable.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(AuditError::Failed {
                url: url.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let report: RawAuditReport =
            serde_json::from_slice(&output.stdout).map_err(|source| AuditError::Decode {
                url: url.to_string(),
                source,
            })?;
        info!(
            "Lighthouse report received for {} ({} audits)",
            url,
            report.audits.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_point_lighthouse_at_the_port() {
        let url = TargetUrl::parse("https://example.com").unwrap();
        let args = LighthouseCli::args(&url, 9333, &AuditConfig::default());

        assert_eq!(args[0], "https://example.com");
        assert!(args.contains(&"--port=9333".to_string()));
        assert!(args.contains(&"--output=json".to_string()));
        assert!(args.contains(&"--max-wait-for-load=120000".to_string()));
        assert!(args.contains(&"--only-categories=performance".to_string()));
    }

    #[test]
    fn empty_category_list_runs_everything() {
        let url = TargetUrl::parse("https://example.com").unwrap();
        let config = AuditConfig {
            only_categories: Vec::new(),
            ..AuditConfig::default()
        };
        let args = LighthouseCli::args(&url, 1, &config);
        assert!(!args.iter().any(|a| a.starts_with("--only-categories")));
    }

    #[cfg(unix)]
    mod with_fake_lighthouse {
        use super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::path::Path;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-lighthouse");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn stdout_is_decoded() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(
                dir.path(),
                r#"echo '{"requestedUrl": "https://example.com", "audits": {"dom-size": {"score": 80, "rawValue": 1200}}}'"#,
            );
            let url = TargetUrl::parse("https://example.com").unwrap();
            let handle = BrowserProcessHandle::detached(9222);

            let report = LighthouseCli::new(exe)
                .run_audit(&url, &handle, &AuditConfig::default())
                .await
                .unwrap();

            assert_eq!(report.requested_url.as_deref(), Some("https://example.com"));
            assert_eq!(report.audits["dom-size"].score(), Some(80.0));
        }

        #[tokio::test]
        async fn failing_run_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "echo 'Unable to connect to Chrome' >&2\nexit 1");
            let url = TargetUrl::parse("https://example.com").unwrap();
            let handle = BrowserProcessHandle::detached(9222);

            match LighthouseCli::new(exe)
                .run_audit(&url, &handle, &AuditConfig::default())
                .await
            {
                Err(AuditError::Failed { stderr, .. }) => {
                    assert_eq!(stderr, "Unable to connect to Chrome")
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }

        #[tokio::test]
        async fn non_json_output_is_a_decode_error() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "echo 'Runtime error encountered'");
            let url = TargetUrl::parse("https://example.com").unwrap();
            let handle = BrowserProcessHandle::detached(9222);

            assert!(matches!(
                LighthouseCli::new(exe)
                    .run_audit(&url, &handle, &AuditConfig::default())
                    .await,
                Err(AuditError::Decode { .. })
            ));
        }
    }
}
