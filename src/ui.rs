// UI layer: the interactive upload session and the terminal rendering of
// results. Everything writes to a caller supplied `Write` so the flows can
// run against a buffer as well as stdout.

use crate::clipboard;
use crate::config::{redact, ConfigStore, SessionConfig};
use crate::error::UploadError;
use crate::path::clean_input;
use crate::upload::{RemoteFile, UploadOutcome, UploadRequest, Uploader, KEY_PREFIX, MAX_FILE_SIZE};
use anyhow::Result;
use chrono::Local;
use crossterm::style::Stylize;
use dialoguer::{Input, Password};
use std::io::{BufRead, Write};
use std::path::Path;

/// Entries shown by the `list` command.
pub const LIST_LIMIT: usize = 20;

/// Reads lines from an interactive prompt.
pub struct InputReader<R> {
    input: R,
}

impl<R: BufRead> InputReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Next line with surrounding whitespace and one quote pair removed.
    /// `None` at end of input. A line that is not UTF-8 is consumed and
    /// reported as `InvalidInput`; the stream stays usable.
    pub fn read_line(&mut self) -> std::io::Result<Option<Result<String, UploadError>>> {
        let mut buf = Vec::new();
        if self.input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        Ok(Some(match String::from_utf8(buf) {
            Ok(line) => Ok(clean_input(&line).to_string()),
            Err(e) => Err(UploadError::InvalidInput(format!(
                "not valid UTF-8: {}",
                clean_input(&String::from_utf8_lossy(e.as_bytes()))
            ))),
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Prompting,
    Dispatching,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    List,
    ShowConfig,
    Upload(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.to_lowercase().as_str() {
            "" | "quit" | "exit" => Command::Exit,
            "list" => Command::List,
            "config" => Command::ShowConfig,
            _ => Command::Upload(input.to_string()),
        }
    }
}

/// Read-dispatch loop of `qu upload` without arguments.
pub struct Session<'a, R, W> {
    uploader: &'a Uploader,
    config: &'a SessionConfig,
    input: InputReader<R>,
    out: W,
    state: SessionState,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(uploader: &'a Uploader, config: &'a SessionConfig, input: R, out: W) -> Self {
        Self {
            uploader,
            config,
            input: InputReader::new(input),
            out,
            state: SessionState::Prompting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Prompt once, dispatch the command and return the resulting state.
    pub fn step(&mut self) -> Result<SessionState> {
        if self.state == SessionState::Closed {
            return Ok(self.state);
        }
        write!(self.out, "\n📁 File path or command: ")?;
        self.out.flush()?;

        let Some(line) = self.input.read_line()? else {
            writeln!(self.out)?;
            self.state = SessionState::Closed;
            return Ok(self.state);
        };

        self.state = SessionState::Dispatching;
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                render_error(&mut self.out, &e)?;
                self.state = SessionState::Prompting;
                return Ok(self.state);
            }
        };
        match Command::parse(&line) {
            Command::Exit => {
                writeln!(self.out, "👋 Bye!")?;
                self.state = SessionState::Closed;
                return Ok(self.state);
            }
            Command::List => render_listing(&mut self.out, self.uploader)?,
            Command::ShowConfig => render_config(&mut self.out, self.config)?,
            Command::Upload(path) => {
                writeln!(self.out, "\n📁 Uploading: {}", path)?;
                match self.uploader.upload(&UploadRequest::new(path)) {
                    Ok(outcome) => {
                        render_outcome(&mut self.out, &outcome)?;
                        if self.config.auto_copy_url {
                            copy_url(&mut self.out, &outcome.url)?;
                        }
                    }
                    Err(e) => render_error(&mut self.out, &e)?,
                }
            }
        }
        self.state = SessionState::Prompting;
        Ok(self.state)
    }

    pub fn run(&mut self) -> Result<()> {
        render_banner(&mut self.out)?;
        while self.step()? != SessionState::Closed {}
        Ok(())
    }
}

pub fn render_banner(out: &mut impl Write) -> Result<()> {
    let rule = "=".repeat(51);
    writeln!(out, "{}", "🚀 Qiniu uploader - interactive mode".bold())?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "Available actions:")?;
    writeln!(out, "  1. Enter a file path to upload it (drag a file into the terminal)")?;
    writeln!(out, "  2. 'list' shows uploaded files")?;
    writeln!(out, "  3. 'config' shows the current configuration")?;
    writeln!(out, "  4. 'quit', 'exit' or an empty line leaves")?;
    writeln!(out, "{}", rule)?;
    writeln!(out)?;
    writeln!(out, "💡 Drag and drop:")?;
    writeln!(out, "   1. Open your file manager and pick a file")?;
    writeln!(out, "   2. Drag it onto this terminal window, the path is filled in")?;
    writeln!(out, "   3. Press Enter to upload")?;
    writeln!(out, "   Windows paths are converted automatically under WSL.")?;
    writeln!(out, "   Supported: jpg, jpeg, png, gif, webp, bmp")?;
    writeln!(out, "   Size limit: {} MB", MAX_FILE_SIZE / 1024 / 1024)?;
    Ok(())
}

fn base_name(key: &str) -> &str {
    Path::new(key)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(key)
}

fn megabytes(bytes: i64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

pub fn render_outcome(out: &mut impl Write, outcome: &UploadOutcome) -> Result<()> {
    if !outcome.success {
        writeln!(out, "{} {}", "❌ Upload failed:".red(), outcome.message)?;
        return Ok(());
    }
    writeln!(out, "{}", "✅ Upload successful!".green())?;
    writeln!(out, "📁 File: {}", base_name(&outcome.remote_key))?;
    writeln!(out, "📊 Size: {:.2} MB", megabytes(outcome.size_bytes))?;
    writeln!(out, "🔗 URL: {}", outcome.url)?;
    writeln!(out, "🔑 Key: {}", outcome.remote_key)?;
    Ok(())
}

pub fn render_error(out: &mut impl Write, err: &dyn std::fmt::Display) -> Result<()> {
    writeln!(out, "{} {}", "❌ Error:".red(), err)?;
    Ok(())
}

pub fn copy_url(out: &mut impl Write, url: &str) -> Result<()> {
    match clipboard::copy(url) {
        Ok(()) => writeln!(out, "📋 URL copied to clipboard")?,
        Err(e) => {
            tracing::warn!(error = %e, "clipboard copy failed");
            writeln!(out, "⚠️  Could not copy URL to clipboard: {}", e)?;
        }
    }
    Ok(())
}

pub fn render_files(out: &mut impl Write, files: &[RemoteFile]) -> Result<()> {
    let rule = "-".repeat(81);
    writeln!(out, "\n📚 Uploaded files:")?;
    writeln!(out, "{}", rule)?;
    if files.is_empty() {
        writeln!(out, "  No uploaded files yet")?;
        return Ok(());
    }
    for (i, file) in files.iter().enumerate() {
        let uploaded = file
            .uploaded
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".into());
        writeln!(out, "{:2}. {}", i + 1, base_name(&file.key))?;
        writeln!(
            out,
            "    Size: {:.2} MB | Uploaded: {}",
            megabytes(file.size_bytes),
            uploaded
        )?;
        writeln!(out, "    URL: {}", file.url)?;
        if i + 1 < files.len() {
            writeln!(out)?;
        }
    }
    writeln!(out, "{}", rule)?;
    Ok(())
}

fn render_listing(out: &mut impl Write, uploader: &Uploader) -> Result<()> {
    match uploader.list(KEY_PREFIX, LIST_LIMIT) {
        Ok(files) => render_files(out, &files),
        Err(e) => render_error(out, &e),
    }
}

pub fn render_config(out: &mut impl Write, config: &SessionConfig) -> Result<()> {
    let rule = "=".repeat(51);
    writeln!(out, "\n🔧 Current configuration:")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "📋 Storage:")?;
    for (label, secret) in [("Access Key", &config.access_key), ("Secret Key", &config.secret_key)] {
        if secret.is_empty() {
            writeln!(out, "  {}: not set", label)?;
        } else {
            writeln!(out, "  {}: {} (set)", label, redact(secret))?;
        }
    }
    writeln!(out, "  Bucket: {}", config.bucket)?;
    writeln!(out, "  Domain: {}", config.domain)?;

    writeln!(out, "\n⌨️  Hotkey:")?;
    match config.hotkey_label() {
        Some(label) => writeln!(out, "  Shortcut: {}", label)?,
        None => writeln!(out, "  Shortcut: not set")?,
    }

    writeln!(out, "\n🎨 UI:")?;
    writeln!(out, "  Auto copy URL: {}", config.auto_copy_url)?;
    writeln!(out, "  Show progress: {}", config.show_progress)?;
    writeln!(out, "{}", rule)?;
    Ok(())
}

/// Prompt for credentials and save a fresh configuration.
pub fn init_config(store: &ConfigStore, current: &SessionConfig) -> Result<SessionConfig> {
    println!("{}", "🔧 Initialise uploader configuration".bold());
    println!("{}", "=".repeat(51));
    println!("\n📋 Storage settings:");

    let access_key: String = Input::new().with_prompt("Access Key").interact_text()?;
    // `Password` hides input in terminal.
    let secret_key: String = Password::new().with_prompt("Secret Key").interact()?;
    let bucket: String = Input::new().with_prompt("Bucket").interact_text()?;
    let domain: String = Input::new()
        .with_prompt("Domain (optional)")
        .allow_empty(true)
        .interact_text()?;

    let defaults = SessionConfig::default();
    let config = SessionConfig {
        access_key: access_key.trim().to_string(),
        secret_key: secret_key.trim().to_string(),
        bucket: bucket.trim().to_string(),
        domain: domain.trim().to_string(),
        hotkey_keys: defaults.hotkey_keys,
        hotkey_ctrl: defaults.hotkey_ctrl,
        hotkey_shift: defaults.hotkey_shift,
        hotkey_alt: defaults.hotkey_alt,
        auto_copy_url: defaults.auto_copy_url,
        show_progress: defaults.show_progress,
        ..current.clone()
    };

    let path = store.save(&config)?;
    println!("\n{}", "✅ Configuration saved!".green());
    println!("Config file: {}", path.display());
    Ok(config)
}
