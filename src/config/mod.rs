//! JSON configuration shared by all servers.
//!
//! A single `config.json` carries the Obsidian REST settings, the Google
//! credential/token locations for Gmail and Calendar, and the MCP tool
//! allowlist. Relative file paths are resolved against the directory the
//! config file lives in.

pub mod error;

use crate::config::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Location searched inside each XDG config directory.
pub const CONFIG_FILE_NAME: &str = "bttk-mcp/config.json";

const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";
const DEFAULT_TOKEN_FILE: &str = "token.json";

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub obsidian: ObsidianConfig,
    pub gmail: GoogleServiceConfig,
    pub calendar: CalendarConfig,
    pub mcp: McpConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ObsidianConfig {
    pub url: String,
    pub cert: String,
    #[serde(rename = "apikey")]
    pub api_key: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct GoogleServiceConfig {
    pub enabled: Option<bool>,
    pub credentials_file: PathBuf,
    pub token_file: PathBuf,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    #[serde(flatten)]
    pub google: GoogleServiceConfig,
    /// Calendar ids the tools may touch. Empty allows every calendar.
    pub calendars: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub tools: HashMap<String, bool>,
}

impl McpConfig {
    /// Whether a tool should be registered.
    ///
    /// An empty `tools` map enables everything. Otherwise the tool must be
    /// switched on explicitly, either by its full name (`obsidian_get_file`)
    /// or by its name without the server prefix (`get_file`).
    pub fn tool_enabled(&self, name: &str, prefix: &str) -> bool {
        if self.tools.is_empty() {
            return true;
        }

        let short_name = name.strip_prefix(prefix).unwrap_or(name);

        self.tools.get(name).copied().unwrap_or(false)
            || self.tools.get(short_name).copied().unwrap_or(false)
    }
}

impl Config {
    /// Load the configuration from `path`, or search the XDG config
    /// directories for [`CONFIG_FILE_NAME`] when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => search_config_file(CONFIG_FILE_NAME)?,
        };

        let raw = std::fs::read_to_string(&path).map_err(|err| ConfigError::io(&path, err))?;
        let config: Config =
            serde_json::from_str(&raw).map_err(|err| ConfigError::parse(&path, err))?;

        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        tracing::debug!(?path, "loaded configuration");

        config.finalize(&config_dir)
    }

    /// Defaults only, with relative paths resolved against `dir`.
    pub fn default_relative_to(dir: &Path) -> Result<Self, ConfigError> {
        Config::default().finalize(dir)
    }

    fn finalize(mut self, config_dir: &Path) -> Result<Self, ConfigError> {
        if !self.obsidian.cert.is_empty() {
            let cert = resolve(config_dir, Path::new(&self.obsidian.cert))?;
            self.obsidian.cert = cert.to_string_lossy().into_owned();
        }

        self.gmail.apply_defaults(config_dir)?;
        self.calendar.google.apply_defaults(config_dir)?;

        Ok(self)
    }
}

impl GoogleServiceConfig {
    /// `enabled` only disables a service when it is explicitly `false`.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    fn apply_defaults(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        if self.credentials_file.as_os_str().is_empty() {
            self.credentials_file = PathBuf::from(DEFAULT_CREDENTIALS_FILE);
        }
        if self.token_file.as_os_str().is_empty() {
            self.token_file = PathBuf::from(DEFAULT_TOKEN_FILE);
        }

        self.credentials_file = resolve(config_dir, &self.credentials_file)?;
        self.token_file = resolve(config_dir, &self.token_file)?;

        Ok(())
    }
}

fn resolve(config_dir: &Path, path: &Path) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let joined = config_dir.join(path);
    std::path::absolute(&joined).map_err(|source| ConfigError::ResolvePath {
        path: joined,
        source,
    })
}

/// Candidate XDG config directories, most specific first.
fn xdg_config_dirs() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = dirs::config_dir().into_iter().collect();

    let system_dirs = env::var("XDG_CONFIG_DIRS")
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "/etc/xdg".to_string());

    dirs.extend(
        system_dirs
            .split(':')
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from),
    );

    dirs
}

fn search_config_file(name: &str) -> Result<PathBuf, ConfigError> {
    xdg_config_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::not_found(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.json");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn should_apply_defaults_relative_to_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"obsidian": {"url": "https://127.0.0.1:27124", "apikey": "secret"}}"#);

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!("https://127.0.0.1:27124", config.obsidian.url);
        assert_eq!("secret", config.obsidian.api_key);
        assert_eq!(dir.path().join("credentials.json"), config.gmail.credentials_file);
        assert_eq!(dir.path().join("token.json"), config.gmail.token_file);
        assert_eq!(dir.path().join("credentials.json"), config.calendar.google.credentials_file);
        assert_eq!(dir.path().join("token.json"), config.calendar.google.token_file);
        assert!(config.obsidian.cert.is_empty());
        assert!(config.calendar.calendars.is_empty());
    }

    #[test]
    fn should_resolve_relative_and_keep_absolute_paths() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            r#"{
                "obsidian": {"cert": "certs/obsidian.crt"},
                "gmail": {"enabled": true, "credentials_file": "/abs/creds.json", "token_file": "gmail-token.json"},
                "calendar": {"enabled": false, "token_file": "cal/token.json", "calendars": ["primary", "work@example.com"]},
                "mcp": {"tools": {"get_file": true}}
            }"#,
        );

        let config = Config::load(Some(&path)).unwrap();

        assert_eq!(
            dir.path().join("certs/obsidian.crt").to_string_lossy(),
            config.obsidian.cert
        );
        assert_eq!(PathBuf::from("/abs/creds.json"), config.gmail.credentials_file);
        assert_eq!(dir.path().join("gmail-token.json"), config.gmail.token_file);
        assert!(config.gmail.is_enabled());
        assert!(!config.calendar.google.is_enabled());
        assert_eq!(dir.path().join("cal/token.json"), config.calendar.google.token_file);
        assert_eq!(vec!["primary", "work@example.com"], config.calendar.calendars);
    }

    #[test]
    fn should_report_parse_and_io_errors() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "{ not json");
        assert!(matches!(Config::load(Some(&path)), Err(ConfigError::Parse { .. })));

        let missing = dir.path().join("missing.json");
        assert!(matches!(Config::load(Some(&missing)), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn should_enable_tools_by_full_or_short_name() {
        let mut mcp = McpConfig::default();
        assert!(mcp.tool_enabled("obsidian_get_file", "obsidian_"));

        mcp.tools.insert("get_active_file".to_string(), true);
        mcp.tools.insert("obsidian_list_files".to_string(), true);
        mcp.tools.insert("open_file".to_string(), false);

        assert!(mcp.tool_enabled("obsidian_get_active_file", "obsidian_"));
        assert!(mcp.tool_enabled("obsidian_list_files", "obsidian_"));
        assert!(!mcp.tool_enabled("obsidian_open_file", "obsidian_"));
        assert!(!mcp.tool_enabled("obsidian_get_file", "obsidian_"));
    }

    #[test]
    fn should_treat_missing_enabled_flag_as_enabled() {
        let service = GoogleServiceConfig::default();
        assert!(service.is_enabled());
    }
}
