// Library root
// -----------
// This crate exposes the library surface behind the `qu` binary.
//
// Module responsibilities:
// - `path`: cleans pasted or dragged paths and maps Windows drive paths to
//   their WSL mounts.
// - `upload`: size/type policy and the upload orchestration.
// - `api` and `auth`: the storage provider client and its request signing.
// - `config`: YAML configuration with environment overrides.
// - `ui` and `cli`: the terminal flows and command line surface.
pub mod api;
pub mod auth;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod path;
#[cfg(feature = "server")]
pub mod server;
pub mod ui;
pub mod upload;
