use crate::models::RawAuditReport;
use std::io;
use std::path::{Path, PathBuf};

pub fn sanitize_filename(url: &str) -> String {
    url.replace(|c: char| !c.is_alphanumeric() && c != '.', "_")
}

/// Writes the raw report as pretty JSON to `<dir>/<sanitized url>.json` and
/// returns the path written.
pub async fn save_raw_report(
    dir: &Path,
    url: &str,
    report: &RawAuditReport,
) -> io::Result<PathBuf> {
    let contents = serde_json::to_vec_pretty(report)?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}.json", sanitize_filename(url)));
    tokio::fs::write(&path, contents).await?;
    Ok(path)
}
