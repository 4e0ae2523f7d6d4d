//! # Ledger Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_BRANCH=3                                                     │
//! │     TALLY_DB_PATH=/var/lib/tally/ledger.db                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/ledger/ledger.toml (Linux)                               │
//! │     ~/Library/Application Support/com.tally.ledger/ledger.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     branch 1, register 1, 8 collision retries                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [terminal]
//! branch = 1
//! register = 2
//!
//! [database]
//! path = "/var/lib/tally/ledger.db"
//! max_connections = 5
//!
//! [sequence]
//! max_collision_retries = 8
//!
//! [reconciliation]
//! allow_late_movements = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tally_core::folio::MAX_STATION;
use tally_db::DbConfig;
use tracing::{debug, info, warn};

use crate::error::{LedgerError, LedgerResult};

/// File name of the config file inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "ledger.toml";

/// File name of the default database inside the platform data directory.
pub const DATABASE_FILE_NAME: &str = "ledger.db";

// =============================================================================
// Sections
// =============================================================================

/// Identity of this terminal. Printed into every folio it issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Branch number (00-99).
    #[serde(default = "default_station")]
    pub branch: u8,

    /// Register number within the branch (00-99).
    #[serde(default = "default_station")]
    pub register: u8,
}

fn default_station() -> u8 {
    1
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            branch: default_station(),
            register: default_station(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Database file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// Folio issuance settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    /// Regenerations allowed after a folio collision before giving up.
    #[serde(default = "default_max_collision_retries")]
    pub max_collision_retries: u32,
}

fn default_max_collision_retries() -> u32 {
    8
}

impl Default for SequenceSettings {
    fn default() -> Self {
        SequenceSettings {
            max_collision_retries: default_max_collision_retries(),
        }
    }
}

/// Shift reconciliation settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    /// Accept cash movements on closed shifts (late corrections).
    #[serde(default)]
    pub allow_late_movements: bool,
}

// =============================================================================
// Ledger Configuration
// =============================================================================

/// Complete ledger configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub sequence: SequenceSettings,

    #[serde(default)]
    pub reconciliation: ReconciliationSettings,
}

impl LedgerConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ledger.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> LedgerResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading ledger config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load ledger config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections take their defaults.
    pub fn from_toml(contents: &str) -> LedgerResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> LedgerResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| LedgerError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Ledger config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.terminal.branch > MAX_STATION {
            return Err(LedgerError::Config(format!(
                "terminal.branch must be between 0 and {}, got {}",
                MAX_STATION, self.terminal.branch
            )));
        }

        if self.terminal.register > MAX_STATION {
            return Err(LedgerError::Config(format!(
                "terminal.register must be between 0 and {}, got {}",
                MAX_STATION, self.terminal.register
            )));
        }

        if self.database.max_connections == 0 {
            return Err(LedgerError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.sequence.max_collision_retries > 1000 {
            return Err(LedgerError::Config(
                "sequence.max_collision_retries must be at most 1000".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TALLY_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(branch) = parse_var(&lookup, "TALLY_BRANCH") {
            debug!(branch, "Overriding branch from environment");
            self.terminal.branch = branch;
        }

        if let Some(register) = parse_var(&lookup, "TALLY_REGISTER") {
            debug!(register, "Overriding register from environment");
            self.terminal.register = register;
        }

        if let Some(path) = lookup("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(max) = parse_var(&lookup, "TALLY_DB_MAX_CONNECTIONS") {
            self.database.max_connections = max;
        }

        if let Some(retries) = parse_var(&lookup, "TALLY_MAX_COLLISION_RETRIES") {
            self.sequence.max_collision_retries = retries;
        }

        if let Some(allow) = lookup("TALLY_ALLOW_LATE_MOVEMENTS") {
            match allow.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.reconciliation.allow_late_movements = true,
                "0" | "false" | "no" => self.reconciliation.allow_late_movements = false,
                _ => warn!(value = %allow, "Unknown TALLY_ALLOW_LATE_MOVEMENTS value"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "ledger")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Database file: the configured path, else the platform data directory,
    /// else the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        directories::ProjectDirs::from("com", "tally", "ledger")
            .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(DATABASE_FILE_NAME))
    }

    /// Pool configuration for [`tally_db::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        let path = self.database_path();
        if path == std::path::Path::new(tally_db::pool::IN_MEMORY_PATH) {
            return DbConfig::in_memory();
        }
        DbConfig::new(path).max_connections(self.database.max_connections)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}
