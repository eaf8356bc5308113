//! CLI configuration

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::ValueEnum;
use semnet_core::limits::{validate_limits, MAX_RESULTS, MAX_ROUNDS, MAX_STEPS, MAX_UNKNOWNS};
use semnet_core::MatchLimits;
use serde::{Deserialize, Serialize};

/// Get default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".semnet")
}

/// Location of the config file
pub fn config_file_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

/// Knowledge store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process-local, discarded on exit
    Memory,
    /// On-disk ReDB database in the data directory
    #[default]
    Redb,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory => write!(f, "memory"),
            Self::Redb => write!(f, "redb"),
        }
    }
}

/// Configuration for the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub max_results: usize,
    pub max_steps: usize,
    pub max_unknowns: usize,
    pub max_rounds: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::default(),
            max_results: MAX_RESULTS,
            max_steps: MAX_STEPS,
            max_unknowns: MAX_UNKNOWNS,
            max_rounds: MAX_ROUNDS,
        }
    }
}

impl Config {
    /// Load the config file, or defaults when there is none
    pub fn load() -> anyhow::Result<Self> {
        let path = config_file_path();
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    pub fn keys() -> &'static [&'static str] {
        &[
            "data_dir",
            "backend",
            "max_results",
            "max_steps",
            "max_unknowns",
            "max_rounds",
        ]
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "data_dir" => Some(self.data_dir.display().to_string()),
            "backend" => Some(self.backend.to_string()),
            "max_results" => Some(self.max_results.to_string()),
            "max_steps" => Some(self.max_steps.to_string()),
            "max_unknowns" => Some(self.max_unknowns.to_string()),
            "max_rounds" => Some(self.max_rounds.to_string()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let parse_count = |value: &str| -> anyhow::Result<usize> {
            value
                .parse()
                .with_context(|| format!("{} expects a number, got '{}'", key, value))
        };

        match key {
            "data_dir" => self.data_dir = PathBuf::from(value),
            "backend" => {
                self.backend = Backend::from_str(value, true)
                    .map_err(|e| anyhow::anyhow!("Invalid backend '{}': {}", value, e))?
            }
            "max_results" => {
                let max_results = parse_count(value)?;
                validate_limits(&self.limits().with_max_results(max_results))?;
                self.max_results = max_results;
            }
            "max_steps" => self.max_steps = parse_count(value)?,
            "max_unknowns" => self.max_unknowns = parse_count(value)?,
            "max_rounds" => self.max_rounds = parse_count(value)?,
            _ => anyhow::bail!(
                "Unknown config key: {} (available: {})",
                key,
                Self::keys().join(", ")
            ),
        }
        Ok(())
    }

    /// Matcher limits configured here
    pub fn limits(&self) -> MatchLimits {
        MatchLimits::default()
            .with_max_results(self.max_results)
            .with_max_steps(self.max_steps)
            .with_max_unknowns(self.max_unknowns)
    }
}
