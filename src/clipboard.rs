//! Clipboard placement
//!
//! Image export relies on whatever the platform offers from the shell:
//! PowerShell on Windows, osascript on macOS, xclip or wl-copy on Linux.

use crate::render::OutputFormat;
use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

/// Clipboard failures
#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard is not supported on {0}")]
    Unsupported(&'static str),
    #[error("{program} failed: {message}")]
    CommandFailed { program: String, message: String },
    #[error("Clipboard I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Places an exported file's image on the clipboard
pub trait Clipboard {
    fn copy_image(&self, path: &Path, format: OutputFormat) -> Result<(), ClipboardError>;

    /// Whether the clipboard keeps a reference to the file rather than its bytes
    fn holds_file_reference(&self) -> bool {
        false
    }
}

/// Platform clipboard through OS shell commands
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy_image(&self, path: &Path, format: OutputFormat) -> Result<(), ClipboardError> {
        if cfg!(target_os = "windows") {
            copy_windows(path)
        } else if cfg!(target_os = "macos") {
            copy_macos(path)
        } else if cfg!(target_os = "linux") {
            copy_linux(path, format)
        } else {
            Err(ClipboardError::Unsupported(std::env::consts::OS))
        }
    }

    fn holds_file_reference(&self) -> bool {
        cfg!(target_os = "macos")
    }
}

fn copy_windows(path: &Path) -> Result<(), ClipboardError> {
    let script = format!(
        "Add-Type -AssemblyName System.Windows.Forms\n\
         Add-Type -AssemblyName System.Drawing\n\
         $img = [System.Drawing.Image]::FromFile('{}')\n\
         [System.Windows.Forms.Clipboard]::SetImage($img)\n\
         $img.Dispose()",
        path.display().to_string().replace('\'', "''")
    );
    run(Command::new("powershell").args(["-NoProfile", "-STA", "-Command", &script]))
}

fn copy_macos(path: &Path) -> Result<(), ClipboardError> {
    let script = format!(
        "set the clipboard to (POSIX file \"{}\")",
        path.display().to_string().replace('"', "\\\"")
    );
    run(Command::new("osascript").args(["-e", &script]))
}

fn copy_linux(path: &Path, format: OutputFormat) -> Result<(), ClipboardError> {
    let mime = mime_type(format);
    let xclip = run_status(Command::new("xclip")
        .args(["-selection", "clipboard", "-t", mime, "-i"])
        .arg(path));

    match xclip {
        Ok(()) => Ok(()),
        Err(x_err) => {
            log::debug!("xclip unavailable ({}), trying wl-copy", x_err);
            let input = File::open(path)?;
            run_status(Command::new("wl-copy").args(["--type", mime]).stdin(Stdio::from(input))).map_err(
                |wl_err| ClipboardError::CommandFailed {
                    program: "xclip/wl-copy".to_string(),
                    message: format!("{}; {}", x_err, wl_err),
                },
            )
        }
    }
}

fn mime_type(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Png => "image/png",
        OutputFormat::Svg => "image/svg+xml",
    }
}

fn run(command: &mut Command) -> Result<(), ClipboardError> {
    let program = command.get_program().to_string_lossy().to_string();
    let output = command
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| ClipboardError::CommandFailed {
            program: program.clone(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(ClipboardError::CommandFailed {
            program,
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Run a tool that forks a background owner for the selection.
///
/// The forked child inherits the output handles and keeps them open until
/// another program takes the clipboard, so only the exit status is read.
fn run_status(command: &mut Command) -> Result<(), ClipboardError> {
    let program = command.get_program().to_string_lossy().to_string();
    let status = command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| ClipboardError::CommandFailed {
            program: program.clone(),
            message: e.to_string(),
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(ClipboardError::CommandFailed {
            program,
            message: format!("exited with {}", status),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type(OutputFormat::Png), "image/png");
        assert_eq!(mime_type(OutputFormat::Svg), "image/svg+xml");
    }

    #[test]
    fn test_missing_program_is_command_failure() {
        let err = run(&mut Command::new("/nonexistent/automaton-studio/xclip")).unwrap_err();
        assert!(matches!(err, ClipboardError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_status_runner_does_not_wait_for_forked_children() {
        // The background sleep keeps inherited handles open well past exit.
        let started = std::time::Instant::now();
        run_status(Command::new("sh").args(["-c", "sleep 5 & exit 0"])).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_status_runner_reports_exit_status() {
        let err = run_status(&mut Command::new("false")).unwrap_err();
        match err {
            ClipboardError::CommandFailed { program, message } => {
                assert_eq!(program, "false");
                assert!(message.contains("exit"));
            }
            other => panic!("expected command failure, got {:?}", other),
        }
    }
}
