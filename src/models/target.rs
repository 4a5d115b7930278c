use reqwest::Url;
use std::fmt;

#[derive(Debug, thiserror::Error)]
#[error("invalid target url {input:?}: {reason}")]
pub struct InvalidTargetUrl {
    pub input: String,
    pub reason: String,
}

/// Page under test. Only absolute http(s) URLs are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetUrl(String);

impl TargetUrl {
    pub fn parse(input: &str) -> Result<Self, InvalidTargetUrl> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed).map_err(|e| InvalidTargetUrl {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(TargetUrl(trimmed.to_string())),
            other => Err(InvalidTargetUrl {
                input: input.to_string(),
                reason: format!("unsupported scheme {}", other),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
