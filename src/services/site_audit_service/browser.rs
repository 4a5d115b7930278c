use crate::config::ChromeConfig;
use crate::error::LaunchError;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout};

const STDERR_PREVIEW_LINES: usize = 8;
const PROFILE_PREFIX: &str = "speedaudit-chrome-";
const PROFILE_REMOVE_RETRY_DELAY: Duration = Duration::from_millis(250);

/// A running headless browser and the control port it listens on.
///
/// Owns the child process and its throwaway profile directory. Both are
/// released at most once. Dropping the handle without releasing it still
/// kills the child and then deletes the profile, in field order.
#[derive(Debug)]
pub struct BrowserProcessHandle {
    port: u16,
    process: Option<Child>,
    profile_dir: Option<TempDir>,
}

impl BrowserProcessHandle {
    /// Handle for a browser this crate did not spawn.
    pub fn detached(port: u16) -> Self {
        BrowserProcessHandle {
            port,
            process: None,
            profile_dir: None,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn profile_dir(&self) -> Option<&Path> {
        self.profile_dir.as_ref().map(TempDir::path)
    }

    pub fn is_released(&self) -> bool {
        self.process.is_none() && self.profile_dir.is_none()
    }

    pub async fn terminate(&mut self) {
        if let Some(mut child) = self.process.take() {
            match child.kill().await {
                Ok(()) => info!("Stopped chrome on port {}", self.port),
                Err(e) => warn!("failed to kill chrome on port {}: {}", self.port, e),
            }
        }
        if let Some(dir) = self.profile_dir.take() {
            if let Err(e) = remove_profile(dir.path()).await {
                warn!("failed to remove chrome profile {}: {}", dir.path().display(), e);
            }
        }
    }
}

/// Chrome helper processes can outlive the main pid for a moment and keep
/// writing into the profile, so a failed removal is retried once.
async fn remove_profile(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => {
            debug!("retrying removal of chrome profile {}: {}", path.display(), e);
            sleep(PROFILE_REMOVE_RETRY_DELAY).await;
            match tokio::fs::remove_dir_all(path).await {
                Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
                _ => Ok(()),
            }
        }
    }
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn acquire(&self) -> Result<BrowserProcessHandle, LaunchError>;

    /// Idempotent; a released handle is left untouched.
    async fn release(&self, handle: &mut BrowserProcessHandle);
}

pub struct ChromeLauncher {
    config: ChromeConfig,
}

impl ChromeLauncher {
    pub fn new(config: ChromeConfig) -> Self {
        ChromeLauncher { config }
    }

    fn args(profile_dir: &Path) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--remote-debugging-port=0".to_string(),
            format!("--user-data-dir={}", profile_dir.display()),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
            "--disable-background-networking".to_string(),
            "--disable-extensions".to_string(),
            "--disable-sync".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "about:blank".to_string(),
        ]
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn acquire(&self) -> Result<BrowserProcessHandle, LaunchError> {
        let profile_dir = tempfile::Builder::new()
            .prefix(PROFILE_PREFIX)
            .tempdir()
            .map_err(LaunchError::Profile)?;

        let spawned = Command::new(&self.config.executable)
            .args(Self::args(profile_dir.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let child = match spawned {
            Ok(child) => child,
            Err(source) => {
                drop(profile_dir);
                return Err(LaunchError::Spawn {
                    executable: self.config.executable.display().to_string(),
                    source,
                });
            }
        };

        let mut handle = BrowserProcessHandle {
            port: 0,
            process: Some(child),
            profile_dir: Some(profile_dir),
        };

        match discover_port(&mut handle, self.config.startup_timeout).await {
            Ok(port) => {
                info!("Chrome listening for control on port {}", port);
                handle.port = port;
                Ok(handle)
            }
            Err(e) => {
                handle.terminate().await;
                Err(e)
            }
        }
    }

    async fn release(&self, handle: &mut BrowserProcessHandle) {
        handle.terminate().await;
    }
}

async fn discover_port(
    handle: &mut BrowserProcessHandle,
    startup_timeout: Duration,
) -> Result<u16, LaunchError> {
    let stderr = handle
        .process
        .as_mut()
        .and_then(|child| child.stderr.take())
        .ok_or(LaunchError::MissingStderr)?;
    let mut segments = BufReader::new(stderr).split(b'\n');

    let port = timeout(startup_timeout, wait_for_port(&mut segments))
        .await
        .map_err(|_| LaunchError::Timeout(startup_timeout))??;

    // Keep the pipe drained so chrome never blocks on a full stderr buffer
    tokio::spawn(async move {
        loop {
            match segments.next_segment().await {
                Ok(Some(segment)) => debug!(target: "chrome", "{}", decode_line(&segment)),
                Ok(None) => break,
                Err(e) => {
                    debug!(target: "chrome", "stderr closed: {}", e);
                    break;
                }
            }
        }
    });

    Ok(port)
}

/// Chrome's stderr is not guaranteed to be UTF-8; bad bytes are replaced
/// rather than ending the read.
fn decode_line(segment: &[u8]) -> String {
    String::from_utf8_lossy(segment)
        .trim_end_matches('\r')
        .to_string()
}

pub(crate) async fn wait_for_port<R>(segments: &mut Split<R>) -> Result<u16, LaunchError>
where
    R: AsyncBufRead + Unpin,
{
    let mut captured = Vec::new();
    loop {
        match segments.next_segment().await {
            Ok(Some(segment)) => {
                let line = decode_line(&segment);
                if let Some(port) = parse_devtools_port(&line) {
                    return Ok(port);
                }
                if captured.len() < STDERR_PREVIEW_LINES {
                    captured.push(line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                captured.push(e.to_string());
                break;
            }
        }
    }
    Err(LaunchError::Exited {
        preview: captured.join(" | "),
    })
}

/// Extracts the port from `DevTools listening on ws://127.0.0.1:<port>/devtools/browser/<id>`.
pub fn parse_devtools_port(line: &str) -> Option<u16> {
    let (_, ws) = line.rsplit_once("listening on ")?;
    let ws = ws.trim();
    if !ws.starts_with("ws") || !ws.contains("/devtools/browser") {
        return None;
    }
    let authority = ws.split("://").nth(1)?.split('/').next()?;
    let (_, port) = authority.rsplit_once(':')?;
    port.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_devtools_banner() {
        assert_eq!(
            parse_devtools_port(
                "DevTools listening on ws://127.0.0.1:36117/devtools/browser/6b8e2f62-0d1a"
            ),
            Some(36117)
        );
        assert_eq!(
            parse_devtools_port("DevTools listening on ws://[::1]:9222/devtools/browser/x"),
            Some(9222)
        );
    }

    #[test]
    fn ignores_other_lines() {
        assert_eq!(parse_devtools_port("[0101/000000.0:ERROR:gpu_init.cc] Passthrough"), None);
        assert_eq!(parse_devtools_port("listening on http://127.0.0.1:80/"), None);
        assert_eq!(
            parse_devtools_port("DevTools listening on ws://127.0.0.1:notaport/devtools/browser/x"),
            None
        );
    }

    #[tokio::test]
    async fn port_found_after_noise() {
        let stderr: &[u8] = b"[WARNING] sandbox disabled\nDevTools listening on ws://127.0.0.1:4100/devtools/browser/abc\nmore\n";
        let mut segments = BufReader::new(stderr).split(b'\n');
        assert_eq!(wait_for_port(&mut segments).await.unwrap(), 4100);
    }

    #[tokio::test]
    async fn invalid_utf8_before_banner_is_skipped() {
        let stderr: &[u8] = b"\xff\xfe garbage\r\nDevTools listening on ws://127.0.0.1:45124/devtools/browser/x\n";
        let mut segments = BufReader::new(stderr).split(b'\n');
        assert_eq!(wait_for_port(&mut segments).await.unwrap(), 45124);
    }

    #[tokio::test]
    async fn missing_profile_counts_as_removed() {
        let dir = tempfile::tempdir().unwrap();
        remove_profile(&dir.path().join("gone")).await.unwrap();
    }

    #[tokio::test]
    async fn early_exit_reports_preview() {
        let stderr: &[u8] = b"cannot open display\nbye\n";
        let mut segments = BufReader::new(stderr).split(b'\n');
        match wait_for_port(&mut segments).await {
            Err(LaunchError::Exited { preview }) => {
                assert_eq!(preview, "cannot open display | bye")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn release_is_idempotent_on_detached_handle() {
        let launcher = ChromeLauncher::new(ChromeConfig {
            executable: "google-chrome".into(),
            startup_timeout: Duration::from_secs(1),
        });
        let mut handle = BrowserProcessHandle::detached(9222);
        launcher.release(&mut handle).await;
        launcher.release(&mut handle).await;
        assert!(handle.is_released());
        assert_eq!(handle.port(), 9222);
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_error() {
        let launcher = ChromeLauncher::new(ChromeConfig {
            executable: "/nonexistent/speedaudit-chrome".into(),
            startup_timeout: Duration::from_secs(1),
        });
        assert!(matches!(
            launcher.acquire().await,
            Err(LaunchError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    mod with_fake_chrome {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-chrome");
            std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        fn launcher(executable: PathBuf, startup_timeout: Duration) -> ChromeLauncher {
            ChromeLauncher::new(ChromeConfig {
                executable,
                startup_timeout,
            })
        }

        #[tokio::test]
        async fn acquire_then_release() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(
                dir.path(),
                "echo 'DevTools listening on ws://127.0.0.1:45123/devtools/browser/fake' >&2\nsleep 30",
            );
            let launcher = launcher(exe, Duration::from_secs(5));

            let mut handle = launcher.acquire().await.unwrap();
            assert_eq!(handle.port(), 45123);
            assert!(!handle.is_released());
            let profile = handle.profile_dir().unwrap().to_path_buf();
            assert!(profile.is_dir());

            launcher.release(&mut handle).await;
            assert!(handle.is_released());
            assert!(!profile.exists());
            launcher.release(&mut handle).await;
        }

        #[tokio::test]
        async fn binary_stderr_before_banner_still_acquires() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(
                dir.path(),
                "printf '\\377\\376 garbage\\n' >&2\necho 'DevTools listening on ws://127.0.0.1:45124/devtools/browser/fake' >&2\nprintf '\\377 after\\n' >&2\nsleep 30",
            );
            let launcher = launcher(exe, Duration::from_secs(5));

            let mut handle = launcher.acquire().await.unwrap();
            assert_eq!(handle.port(), 45124);
            launcher.release(&mut handle).await;
        }

        #[tokio::test]
        async fn release_removes_profile_written_by_browser() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(
                dir.path(),
                concat!(
                    "for arg in \"$@\"; do case \"$arg\" in --user-data-dir=*) profile=\"${arg#--user-data-dir=}\";; esac; done\n",
                    "mkdir -p \"$profile/Default\"\n",
                    "echo '{}' > \"$profile/Default/Preferences\"\n",
                    "echo 'DevTools listening on ws://127.0.0.1:45125/devtools/browser/fake' >&2\n",
                    "sleep 30"
                ),
            );
            let launcher = launcher(exe, Duration::from_secs(5));

            let mut handle = launcher.acquire().await.unwrap();
            let profile = handle.profile_dir().unwrap().to_path_buf();
            assert!(profile.join("Default").join("Preferences").is_file());

            launcher.release(&mut handle).await;
            assert!(!profile.exists());
        }

        #[tokio::test]
        async fn dropped_handle_removes_profile() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(
                dir.path(),
                "echo 'DevTools listening on ws://127.0.0.1:45126/devtools/browser/fake' >&2\nsleep 30",
            );
            let launcher = launcher(exe, Duration::from_secs(5));

            let handle = launcher.acquire().await.unwrap();
            let profile = handle.profile_dir().unwrap().to_path_buf();
            assert!(profile.is_dir());

            drop(handle);
            assert!(!profile.exists());
        }

        #[tokio::test]
        async fn silent_browser_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "sleep 30");
            let launcher = launcher(exe, Duration::from_millis(200));

            assert!(matches!(
                launcher.acquire().await,
                Err(LaunchError::Timeout(_))
            ));
        }

        #[tokio::test]
        async fn crashing_browser_fails_launch() {
            let dir = tempfile::tempdir().unwrap();
            let exe = script(dir.path(), "echo 'no usable sandbox' >&2\nexit 1");
            let launcher = launcher(exe, Duration::from_secs(5));

            match launcher.acquire().await {
                Err(LaunchError::Exited { preview }) => assert_eq!(preview, "no usable sandbox"),
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }
}
