// Best-effort clipboard copy through the platform's command line tools.

use crate::path::is_wsl_environment;
use std::io::{self, Write};
use std::process::{Child, Command, ExitStatus, Stdio};

fn candidates() -> Vec<(&'static str, Vec<&'static str>)> {
    if cfg!(target_os = "macos") {
        vec![("pbcopy", vec![])]
    } else if cfg!(windows) || is_wsl_environment() {
        vec![("clip.exe", vec![])]
    } else {
        vec![
            ("wl-copy", vec![]),
            ("xclip", vec!["-selection", "clipboard"]),
            ("xsel", vec!["--clipboard", "--input"]),
        ]
    }
}

/// Write `text` to the child's stdin and reap it. The child is killed if the
/// write fails, so it never outlives the call.
fn feed(mut child: Child, text: &str) -> io::Result<ExitStatus> {
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };
    if let Err(e) = written {
        let _ = child.kill();
        let _ = child.wait();
        return Err(e);
    }
    child.wait()
}

/// Copy `text` using the first tool that runs successfully.
pub fn copy(text: &str) -> io::Result<()> {
    for (program, args) in candidates() {
        let child = match Command::new(program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(_) => continue,
        };
        match feed(child, text) {
            Ok(status) if status.success() => {
                tracing::debug!(program, "copied to clipboard");
                return Ok(());
            }
            Ok(status) => tracing::debug!(program, %status, "clipboard tool failed"),
            Err(e) => tracing::debug!(program, error = %e, "clipboard tool failed"),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "no clipboard tool available",
    ))
}
