//! # bttk MCP servers
//!
//! Model Context Protocol servers exposing personal productivity apis as
//! tools: an Obsidian vault through the Local REST API plugin, Gmail
//! (read-only) and Google Calendar.
//!
//! ## Transport Features
//!
//! - `stdio` - Standard input/output (enabled by default)
//! - `http` - Streamable HTTP server support (enabled by default)

pub mod calendar;
pub mod cli;
pub mod config;
pub mod gmail;
pub mod google;
pub mod mcp;
pub mod obsidian;
