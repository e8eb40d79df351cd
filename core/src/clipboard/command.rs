//! Clipboard reads through the desktop's command-line tools
//!
//! Wayland sessions use `wl-paste`; X11 sessions use `xclip` or `xsel`. The
//! tool is picked once at startup from what is on `PATH` and picked again on
//! [`ClipboardSource::reinitialize`].

use std::env;
use std::ffi::OsStr;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use super::{ClipboardError, ClipboardSource};

/// Upper bound on a single clipboard read
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ─────────────────────────────────────────────────────────────────────────────
// Session detection
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Wayland,
    X11,
    Unknown,
}

impl SessionKind {
    /// Detect the graphical session from the process environment
    pub fn detect() -> Self {
        Self::from_env(
            env::var("XDG_SESSION_TYPE").ok().as_deref(),
            env::var_os("WAYLAND_DISPLAY").is_some(),
            env::var_os("DISPLAY").is_some(),
        )
    }

    /// `XDG_SESSION_TYPE` wins; otherwise whichever display variable is set.
    pub fn from_env(session_type: Option<&str>, wayland_display: bool, x_display: bool) -> Self {
        match session_type.map(str::to_ascii_lowercase).as_deref() {
            Some("wayland") => return Self::Wayland,
            Some("x11") => return Self::X11,
            _ => {}
        }
        if wayland_display {
            Self::Wayland
        } else if x_display {
            Self::X11
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Wayland => "wayland",
            Self::X11 => "x11",
            Self::Unknown => "unknown",
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    WlPaste,
    Xclip,
    Xsel,
}

impl ClipboardTool {
    pub const ALL: [ClipboardTool; 3] = [Self::WlPaste, Self::Xclip, Self::Xsel];

    pub fn program(self) -> &'static str {
        match self {
            Self::WlPaste => "wl-paste",
            Self::Xclip => "xclip",
            Self::Xsel => "xsel",
        }
    }

    fn args(self) -> &'static [&'static str] {
        match self {
            Self::WlPaste => &["--no-newline", "--type", "text"],
            Self::Xclip => &["-selection", "clipboard", "-o"],
            Self::Xsel => &["--clipboard", "--output"],
        }
    }

    /// Tools to try for a session, most preferred first
    pub fn preference(session: SessionKind) -> &'static [ClipboardTool] {
        match session {
            SessionKind::Wayland => &[Self::WlPaste, Self::Xclip, Self::Xsel],
            SessionKind::X11 | SessionKind::Unknown => &[Self::Xclip, Self::Xsel, Self::WlPaste],
        }
    }
}

impl fmt::Display for ClipboardTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl FromStr for ClipboardTool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.program().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!("unknown clipboard tool '{s}' (expected wl-paste, xclip or xsel)")
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend
// ─────────────────────────────────────────────────────────────────────────────

/// Clipboard source backed by an external tool
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    tool: ClipboardTool,
    program: PathBuf,
    forced: Option<ClipboardTool>,
    timeout: Duration,
}

impl CommandClipboard {
    /// Pick a tool for the current session, or use `forced` when given.
    pub fn detect(forced: Option<ClipboardTool>) -> Result<Self, ClipboardError> {
        let (tool, program) = resolve_tool(forced)?;
        tracing::info!(tool = %tool, path = %program.display(), "Clipboard backend selected");
        Ok(Self {
            tool,
            program,
            forced,
            timeout: READ_TIMEOUT,
        })
    }

    pub fn tool(&self) -> ClipboardTool {
        self.tool
    }
}

impl ClipboardSource for CommandClipboard {
    fn read_text(&mut self) -> Result<Option<String>, ClipboardError> {
        run_tool(
            &self.program,
            self.tool.args(),
            self.tool.program(),
            self.timeout,
        )
    }

    fn reinitialize(&mut self) -> Result<(), ClipboardError> {
        let (tool, program) = resolve_tool(self.forced)?;
        if tool != self.tool {
            tracing::info!(from = %self.tool, to = %tool, "Clipboard backend changed");
        }
        self.tool = tool;
        self.program = program;
        Ok(())
    }

    fn name(&self) -> &str {
        self.tool.program()
    }
}

fn resolve_tool(forced: Option<ClipboardTool>) -> Result<(ClipboardTool, PathBuf), ClipboardError> {
    if let Some(tool) = forced {
        return find_in_path(tool.program())
            .map(|path| (tool, path))
            .ok_or_else(|| ClipboardError::NoBackend {
                looked_for: tool.program().to_string(),
            });
    }

    let session = SessionKind::detect();
    let candidates = ClipboardTool::preference(session);
    tracing::debug!(session = %session, "Detecting clipboard tool");

    candidates
        .iter()
        .find_map(|tool| find_in_path(tool.program()).map(|path| (*tool, path)))
        .ok_or_else(|| ClipboardError::NoBackend {
            looked_for: candidates
                .iter()
                .map(|t| t.program())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Locate an executable on `PATH`
pub(crate) fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Run a clipboard tool and collect its stdout, killing it after `timeout`.
///
/// A non-zero exit with nothing on stdout is how these tools report an empty
/// clipboard, so it maps to `Ok(None)`.
fn run_tool(
    program: &Path,
    args: &[&str],
    label: &str,
    timeout: Duration,
) -> Result<Option<String>, ClipboardError> {
    let deadline = Instant::now() + timeout;

    let mut child = Command::new(program)
        .args(args.iter().map(OsStr::new))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ClipboardError::Spawn {
            tool: label.to_string(),
            source: e,
        })?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut out = Vec::new();
        let mut err = Vec::new();
        if let Some(pipe) = stdout.as_mut() {
            let _ = pipe.read_to_end(&mut out);
        }
        if let Some(pipe) = stderr.as_mut() {
            let _ = pipe.read_to_end(&mut err);
        }
        let _ = tx.send((out, err));
    });

    let remaining = deadline.saturating_duration_since(Instant::now());
    let Ok((out, err)) = rx.recv_timeout(remaining) else {
        kill(&mut child, label);
        return Err(ClipboardError::Timeout {
            tool: label.to_string(),
            timeout,
        });
    };

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() < deadline => thread::sleep(WAIT_POLL_INTERVAL),
            Ok(None) => {
                kill(&mut child, label);
                return Err(ClipboardError::Timeout {
                    tool: label.to_string(),
                    timeout,
                });
            }
            Err(e) => {
                return Err(ClipboardError::Spawn {
                    tool: label.to_string(),
                    source: e,
                });
            }
        }
    };

    if status.success() {
        return Ok((!out.is_empty()).then(|| String::from_utf8_lossy(&out).into_owned()));
    }

    if out.is_empty() {
        return Ok(None);
    }

    Err(ClipboardError::Failed {
        tool: label.to_string(),
        status: status.to_string(),
        stderr: String::from_utf8_lossy(&err).trim().to_string(),
    })
}

fn kill(child: &mut Child, label: &str) {
    if let Err(e) = child.kill() {
        tracing::warn!(tool = label, error = %e, "Failed to kill clipboard tool");
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_detection() {
        assert_eq!(
            SessionKind::from_env(Some("wayland"), false, true),
            SessionKind::Wayland
        );
        assert_eq!(
            SessionKind::from_env(Some("X11"), true, false),
            SessionKind::X11
        );
        assert_eq!(
            SessionKind::from_env(Some("tty"), true, true),
            SessionKind::Wayland
        );
        assert_eq!(SessionKind::from_env(None, false, true), SessionKind::X11);
        assert_eq!(
            SessionKind::from_env(None, false, false),
            SessionKind::Unknown
        );
    }

    #[test]
    fn test_tool_preference() {
        assert_eq!(
            ClipboardTool::preference(SessionKind::Wayland)[0],
            ClipboardTool::WlPaste
        );
        assert_eq!(
            ClipboardTool::preference(SessionKind::X11)[..2],
            [ClipboardTool::Xclip, ClipboardTool::Xsel]
        );
    }

    #[test]
    fn test_tool_from_str() {
        assert_eq!("xclip".parse::<ClipboardTool>(), Ok(ClipboardTool::Xclip));
        assert_eq!(
            " WL-PASTE ".parse::<ClipboardTool>(),
            Ok(ClipboardTool::WlPaste)
        );
        assert!("pbpaste".parse::<ClipboardTool>().is_err());
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn sh() -> PathBuf {
            find_in_path("sh").unwrap_or_else(|| PathBuf::from("/bin/sh"))
        }

        #[test]
        fn test_run_tool_reads_stdout() {
            let text = run_tool(&sh(), &["-c", "printf 'hello world'"], "sh", READ_TIMEOUT)
                .unwrap();
            assert_eq!(text.as_deref(), Some("hello world"));
        }

        #[test]
        fn test_nonzero_exit_without_output_is_empty() {
            let text = run_tool(&sh(), &["-c", "echo nothing >&2; exit 1"], "sh", READ_TIMEOUT)
                .unwrap();
            assert_eq!(text, None);
        }

        #[test]
        fn test_nonzero_exit_with_output_is_failure() {
            let err = run_tool(&sh(), &["-c", "printf partial; exit 3"], "sh", READ_TIMEOUT)
                .unwrap_err();
            assert!(matches!(err, ClipboardError::Failed { .. }));
        }

        #[test]
        fn test_slow_tool_times_out() {
            let start = Instant::now();
            let err = run_tool(
                &sh(),
                &["-c", "sleep 5"],
                "sh",
                Duration::from_millis(200),
            )
            .unwrap_err();
            assert!(matches!(err, ClipboardError::Timeout { .. }));
            assert!(start.elapsed() < Duration::from_secs(4));
        }

        #[test]
        fn test_missing_program_is_spawn_error() {
            let err = run_tool(
                Path::new("/nonexistent/clipqa-no-such-tool"),
                &[],
                "missing",
                READ_TIMEOUT,
            )
            .unwrap_err();
            assert!(matches!(err, ClipboardError::Spawn { .. }));
        }
    }
}
