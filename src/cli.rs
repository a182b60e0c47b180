// Command line surface and the dispatch of each subcommand.

use crate::config::{ConfigStore, SessionConfig};
use crate::path::PathNormalizer;
use crate::ui::{self, Session};
use crate::upload::{UploadRequest, Uploader};
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use crossterm::style::Stylize;
use std::io::{self, Write};

#[derive(Parser, Debug)]
#[command(
    name = "qu",
    version,
    about = "Upload images to Qiniu object storage",
    long_about = "Upload images to Qiniu object storage by path, drag and drop or interactively"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file, or start the interactive session when no path is given
    Upload {
        /// File to upload
        #[arg(short, long)]
        file: Option<String>,
        /// File to upload (positional form)
        path: Option<String>,
    },
    /// Start the background service
    Service,
    /// Manage the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
    /// Serve the HTTP upload API
    #[cfg(feature = "server")]
    Serve {
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Prompt for credentials and write the config file
    Init,
    /// Show the current configuration
    Show,
}

/// Loaded state shared by the subcommands.
pub struct App {
    store: ConfigStore,
    config: SessionConfig,
}

impl App {
    /// Load the configuration. A broken config file is reported and
    /// replaced by defaults so `config init` stays reachable.
    pub fn load() -> Result<Self> {
        let store = ConfigStore::from_env().context("Failed to locate config directory")?;
        let config = match store.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "config load failed");
                println!("⚠️  Failed to load config: {}", e);
                println!("Run 'qu config init' to create one");
                SessionConfig::default()
            }
        };
        Ok(Self { store, config })
    }

    fn uploader(&self) -> Result<Uploader> {
        Uploader::from_config(&self.config, PathNormalizer::default())
            .context("Failed to build storage client")
    }

    pub fn run(mut self, cli: Cli) -> Result<()> {
        let Some(command) = cli.command else {
            Cli::command().print_help()?;
            return Ok(());
        };

        match command {
            Commands::Upload { file, path } => match file.or(path) {
                Some(path) => self.upload_file(&path),
                None => self.interactive(),
            },
            Commands::Service => {
                println!("🔧 Background service mode is not available yet");
                println!("Use 'qu upload' for the interactive mode");
                Ok(())
            }
            Commands::Config { action } => match action {
                ConfigAction::Init => {
                    self.config = ui::init_config(&self.store, &self.config)?;
                    Ok(())
                }
                ConfigAction::Show => ui::render_config(&mut io::stdout(), &self.config),
            },
            Commands::Version => {
                println!("Qiniu uploader v{}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            #[cfg(feature = "server")]
            Commands::Serve { port } => {
                let uploader = std::sync::Arc::new(self.uploader()?);
                crate::server::serve_blocking(uploader, port)
            }
        }
    }

    fn upload_file(&self, path: &str) -> Result<()> {
        let uploader = self.uploader()?;
        let mut out = io::stdout();
        writeln!(out, "Uploading: {}", path)?;
        let outcome = uploader.upload(&UploadRequest::new(path))?;
        ui::render_outcome(&mut out, &outcome)?;
        if self.config.auto_copy_url {
            ui::copy_url(&mut out, &outcome.url)?;
        }
        Ok(())
    }

    fn interactive(&self) -> Result<()> {
        let uploader = self.uploader()?;
        if !uploader.is_configured() {
            println!("{}", "❌ Storage client is not configured".red());
            println!("Run 'qu config init' first");
            anyhow::bail!("storage client is not configured");
        }
        let stdin = io::stdin();
        let mut session = Session::new(&uploader, &self.config, stdin.lock(), io::stdout());
        session.run()
    }
}
