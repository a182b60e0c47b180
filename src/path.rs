// Path normalization for user-supplied file paths.
//
// Terminals paste dragged files as quoted strings, and under WSL the path is
// frequently a Windows drive path (`C:\Users\me\pic.png`). This module turns
// such input into a path the local filesystem understands.

use crate::error::PathError;
use std::path::{Path, PathBuf};

const PROC_VERSION: &str = "/proc/version";
const WSL_ENV_VARS: [&str; 2] = ["WSL_DISTRO_NAME", "WSL_INTEROP"];

/// A path that passed cleaning and, when required, foreign-path conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub value: PathBuf,
    pub existed_on_disk: bool,
}

/// How the normalizer decides whether it runs inside WSL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HostEnv {
    /// Check the environment on every call.
    #[default]
    Detect,
    Wsl,
    Native,
}

impl HostEnv {
    pub fn is_wsl(self) -> bool {
        match self {
            HostEnv::Detect => is_wsl_environment(),
            HostEnv::Wsl => true,
            HostEnv::Native => false,
        }
    }
}

/// Returns true when running inside the Windows Subsystem for Linux.
///
/// Not cached: the kernel version file and the environment are read again
/// on each call.
pub fn is_wsl_environment() -> bool {
    if !cfg!(target_os = "linux") {
        return false;
    }
    let version = std::fs::read_to_string(PROC_VERSION).ok();
    detect_wsl(version.as_deref(), |name| std::env::var(name).ok())
}

/// Marker evaluation behind [`is_wsl_environment`]: kernel version string
/// first, then `WSL_DISTRO_NAME`, then `WSL_INTEROP`. Stops at the first hit.
pub fn detect_wsl<F>(proc_version: Option<&str>, env: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(version) = proc_version {
        let version = version.to_lowercase();
        if version.contains("microsoft") || version.contains("wsl") {
            return true;
        }
    }
    WSL_ENV_VARS
        .iter()
        .any(|name| env(name).is_some_and(|v| !v.is_empty()))
}

/// Trim whitespace and drop one pair of enclosing double quotes.
pub fn clean_input(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

/// `<letter>:<sep><rest>` with `sep` being `\` or `/` and a non-empty rest.
pub fn is_foreign_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    if bytes.len() < 4 {
        return false;
    }
    bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && (bytes[2] == b'\\' || bytes[2] == b'/')
}

/// Rewrite a drive path as its `/mnt/<letter>/...` mount. Input that is not
/// a drive path is returned as is, so already converted paths are stable.
pub fn to_wsl_path(path: &str) -> String {
    if !is_foreign_path(path) {
        return path.to_string();
    }
    let drive = path[..1].to_ascii_lowercase();
    let rest = path[3..].replace('\\', "/");
    format!("/mnt/{}/{}", drive, rest)
}

/// Turns raw user input into an existing local path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathNormalizer {
    host: HostEnv,
}

impl PathNormalizer {
    pub fn new(host: HostEnv) -> Self {
        Self { host }
    }

    /// Clean and convert without touching the filesystem beyond a stat.
    pub fn resolve(&self, raw: &str) -> Result<(NormalizedPath, bool), PathError> {
        let cleaned = clean_input(raw);
        if cleaned.is_empty() {
            return Err(PathError::Empty);
        }

        let converted = is_foreign_path(cleaned) && self.host.is_wsl();
        let value = if converted {
            let wsl = to_wsl_path(cleaned);
            tracing::debug!(from = cleaned, to = %wsl, "converted windows path");
            PathBuf::from(wsl)
        } else {
            PathBuf::from(cleaned)
        };

        let existed_on_disk = value.exists();
        Ok((
            NormalizedPath {
                value,
                existed_on_disk,
            },
            converted,
        ))
    }

    /// Clean, convert and require the result to exist.
    pub fn normalize(&self, raw: &str) -> Result<NormalizedPath, PathError> {
        let (path, converted) = self.resolve(raw)?;
        if path.existed_on_disk {
            return Ok(path);
        }
        if converted {
            Err(PathError::ConversionFailed {
                original: clean_input(raw).to_string(),
                converted: path.value,
            })
        } else {
            Err(PathError::NotFound(path.value))
        }
    }
}

/// Lower-cased extension including the leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}
