//! Client for the Obsidian Local REST API plugin.
//!
//! The API is served over HTTPS on localhost with a self-signed certificate
//! and authenticated with a bearer api key. Each group of endpoints is
//! reachable through an accessor on [`ObsidianClient`]:
//!
//! ```no_run
//! # async fn demo() -> Result<(), bttk_mcp::obsidian::error::ObsidianError> {
//! use bttk_mcp::obsidian::{ObsidianClient, TlsMode};
//!
//! let client = ObsidianClient::new("https://127.0.0.1:27124", "api-key", TlsMode::Insecure)?;
//! let files = client.vault().list("").await?;
//! # Ok(())
//! # }
//! ```

pub mod active_file;
pub mod client;
pub mod commands;
pub mod error;
pub mod models;
pub mod open;
pub mod periodic;
pub mod search;
pub mod vault;

pub use client::{ObsidianClient, TlsMode};
