// Session configuration: a YAML file in the user's config directory with
// environment variable overrides for the storage credentials.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.yaml";
pub const CONFIG_DIR_ENV: &str = "QINIU_UPLOADER_CONFIG_DIR";
pub const DEFAULT_UP_HOST: &str = "https://upload.qiniup.com";
pub const DEFAULT_RSF_HOST: &str = "https://rsf.qbox.me";

const ENV_OVERRIDES: [&str; 4] = [
    "QINIU_ACCESS_KEY",
    "QINIU_SECRET_KEY",
    "QINIU_BUCKET",
    "QINIU_DOMAIN",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(rename = "qiniu_access_key", default)]
    pub access_key: String,
    #[serde(rename = "qiniu_secret_key", default)]
    pub secret_key: String,
    #[serde(rename = "qiniu_bucket", default)]
    pub bucket: String,
    #[serde(rename = "qiniu_domain", default)]
    pub domain: String,

    /// Key codes of the global hotkey, `85` is `U`.
    #[serde(default = "default_hotkey_keys")]
    pub hotkey_keys: Vec<u32>,
    #[serde(default = "default_true")]
    pub hotkey_ctrl: bool,
    #[serde(default = "default_true")]
    pub hotkey_shift: bool,
    #[serde(default)]
    pub hotkey_alt: bool,

    #[serde(default = "default_true")]
    pub auto_copy_url: bool,
    #[serde(default = "default_true")]
    pub show_progress: bool,

    #[serde(rename = "qiniu_up_host", default = "default_up_host")]
    pub up_host: String,
    #[serde(rename = "qiniu_rsf_host", default = "default_rsf_host")]
    pub rsf_host: String,
    /// Network timeout for storage calls. Absent means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_hotkey_keys() -> Vec<u32> {
    vec![85]
}

fn default_true() -> bool {
    true
}

fn default_up_host() -> String {
    DEFAULT_UP_HOST.into()
}

fn default_rsf_host() -> String {
    DEFAULT_RSF_HOST.into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            bucket: String::new(),
            domain: String::new(),
            hotkey_keys: default_hotkey_keys(),
            hotkey_ctrl: true,
            hotkey_shift: true,
            hotkey_alt: false,
            auto_copy_url: true,
            show_progress: true,
            up_host: default_up_host(),
            rsf_host: default_rsf_host(),
            request_timeout_secs: None,
        }
    }
}

impl SessionConfig {
    /// Credentials and bucket are all present.
    pub fn is_configured(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty() && !self.bucket.is_empty()
    }

    /// Apply `QINIU_*` overrides. Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for name in ENV_OVERRIDES {
            let Some(value) = lookup(name).filter(|v| !v.is_empty()) else {
                continue;
            };
            let slot = match name {
                "QINIU_ACCESS_KEY" => &mut self.access_key,
                "QINIU_SECRET_KEY" => &mut self.secret_key,
                "QINIU_BUCKET" => &mut self.bucket,
                _ => &mut self.domain,
            };
            *slot = value;
        }
    }

    /// Human readable hotkey, e.g. `Ctrl+Shift+U`. `None` when no modifier is set.
    pub fn hotkey_label(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        if self.hotkey_ctrl {
            parts.push("Ctrl".into());
        }
        if self.hotkey_shift {
            parts.push("Shift".into());
        }
        if self.hotkey_alt {
            parts.push("Alt".into());
        }
        if parts.is_empty() {
            return None;
        }
        for code in &self.hotkey_keys {
            match char::from_u32(*code).filter(|c| c.is_ascii_alphanumeric()) {
                Some(c) => parts.push(c.to_ascii_uppercase().to_string()),
                None => parts.push(format!("#{}", code)),
            }
        }
        Some(parts.join("+"))
    }
}

/// Mask a secret down to its first four characters.
pub fn redact(secret: &str) -> String {
    if secret.chars().count() <= 4 {
        return "***".into();
    }
    let head: String = secret.chars().take(4).collect();
    format!("{}***", head)
}

/// Location of the YAML config file and the load/save operations on it.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `QINIU_UPLOADER_CONFIG_DIR` if set, else `~/.config/qu`.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            if !dir.is_empty() {
                return Ok(Self::new(dir));
            }
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(Self::new(home.join(".config").join("qu")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Read the file (defaults when absent) without environment overrides.
    pub fn load_file(&self) -> Result<SessionConfig, ConfigError> {
        let path = self.file_path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(SessionConfig::default());
        }
        let content = std::fs::read_to_string(&path)?;
        if content.trim().is_empty() {
            return Ok(SessionConfig::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// File values, then `.env`, then process environment overrides.
    pub fn load(&self) -> Result<SessionConfig, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = self.load_file()?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn save(&self, config: &SessionConfig) -> Result<PathBuf, ConfigError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.file_path();
        std::fs::write(&path, serde_yaml::to_string(config)?)?;
        tracing::info!(path = %path.display(), "saved config");
        Ok(path)
    }
}
