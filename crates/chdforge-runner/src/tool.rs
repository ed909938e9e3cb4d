//! Locating and probing the chdman executable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use chdforge_core::config::DEFAULT_TOOL_NAME;
use tokio::process::Command;

/// Result of a [`probe_tool`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolProbe {
    /// The program that was invoked.
    pub path: PathBuf,
    /// Whether it started and exited on its own within the timeout.
    pub available: bool,
    /// First non-empty line the tool printed, usually its name and version.
    pub banner: Option<String>,
}

/// Resolve the program to run.
///
/// A configured, non-empty path is used as-is. Otherwise `chdman` is looked
/// up on `PATH` with [`which::which`]; if that fails the bare name is
/// returned and the OS search applies at spawn time.
pub fn resolve_tool(configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => which::which(DEFAULT_TOOL_NAME).unwrap_or_else(|_| PathBuf::from(DEFAULT_TOOL_NAME)),
    }
}

/// Run `<program> -help` and wait up to `timeout` for it to exit.
///
/// Any exit code counts as available (chdman exits non-zero after printing
/// usage); spawn failure, a signal, or the timeout do not.
pub async fn probe_tool(program: &Path, timeout: Duration) -> ToolProbe {
    let mut cmd = Command::new(program);
    cmd.arg("-help")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let unavailable = || ToolProbe {
        path: program.to_path_buf(),
        available: false,
        banner: None,
    };

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::debug!("probe of {} failed to spawn: {e}", program.display());
            return unavailable();
        }
    };

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let banner = [&output.stdout, &output.stderr]
                .into_iter()
                .flat_map(|bytes| {
                    String::from_utf8_lossy(bytes)
                        .lines()
                        .map(str::trim)
                        .filter(|l| !l.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .next();
            ToolProbe {
                path: program.to_path_buf(),
                available: output.status.code().is_some(),
                banner,
            }
        }
        Ok(Err(e)) => {
            tracing::debug!("probe of {} failed while waiting: {e}", program.display());
            unavailable()
        }
        Err(_elapsed) => {
            // The child was moved into the timed-out future; kill_on_drop
            // reaps it.
            tracing::debug!("probe of {} timed out after {timeout:?}", program.display());
            unavailable()
        }
    }
}
