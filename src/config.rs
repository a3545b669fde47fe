//! Client configuration.
//!
//! Settings are read from `<config_dir>/tui-deck/config.toml` and layered:
//! file → environment (`DECK_URL`, `DECK_USER`, `DECK_PASSWORD`) → CLI flags.
//!
//! # Configuration File Format
//!
//! ```toml
//! url = "https://cloud.example.com"
//! user = "alice"
//! password = "app-password"
//! color = true
//! default_board = 3
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ENV_URL: &str = "DECK_URL";
pub const ENV_USER: &str = "DECK_USER";
pub const ENV_PASSWORD: &str = "DECK_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Server root, e.g. `https://cloud.example.com`
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub user: String,
    /// Account or app password used for basic auth
    #[serde(default)]
    pub password: String,
    /// Colored label chips and status lines
    #[serde(default = "default_color")]
    pub color: bool,
    /// Board opened by `tui-deck open` when no id is given
    #[serde(default)]
    pub default_board: Option<i64>,
}

fn default_color() -> bool {
    true
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            password: String::new(),
            color: default_color(),
            default_board: None,
        }
    }
}

/// Flag values that win over file and environment.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub user: Option<String>,
}

impl DeckConfig {
    /// `<config_dir>/tui-deck/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tui-deck").join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config.toml")
    }

    /// Returns the default configuration if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Writes the file, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Fills fields from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(url) = non_empty(ENV_URL) {
            self.url = url;
        }
        if let Some(user) = non_empty(ENV_USER) {
            self.user = user;
        }
        if let Some(password) = non_empty(ENV_PASSWORD) {
            self.password = password;
        }
    }

    pub fn apply_cli(&mut self, overrides: &CliOverrides) {
        if let Some(url) = &overrides.url {
            self.url = url.clone();
        }
        if let Some(user) = &overrides.user {
            self.user = user.clone();
        }
    }

    /// Loads the file at `path` (or the default location) and applies the
    /// environment and CLI layers.
    pub fn resolve(path: Option<&Path>, overrides: &CliOverrides) -> Result<(Self, PathBuf)> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()
                .context("Could not determine the user config directory; pass --config")?,
        };
        let mut config = Self::load_or_default(&path)?;
        config.apply_env();
        config.apply_cli(overrides);
        Ok((config, path))
    }

    /// Server url without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }

    /// Copy that is safe to print.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.password.is_empty() {
            copy.password = "********".to_string();
        }
        copy
    }

    /// Human-readable problems; empty when the client can connect.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.url.trim().is_empty() {
            warnings.push(format!("url is not set (config file or {})", ENV_URL));
        } else if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            warnings.push(format!(
                "url '{}' should start with http:// or https://",
                self.url
            ));
        } else if self.url.starts_with("http://") {
            warnings.push("url uses plain http; credentials are sent unencrypted".to_string());
        }

        if self.user.trim().is_empty() {
            warnings.push(format!("user is not set (config file or {})", ENV_USER));
        }
        if self.password.is_empty() {
            warnings.push(format!(
                "password is not set (config file or {})",
                ENV_PASSWORD
            ));
        }
        if let Some(board) = self.default_board {
            if board <= 0 {
                warnings.push(format!("default_board must be positive, got {}", board));
            }
        }

        warnings
    }
}
