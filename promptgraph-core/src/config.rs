// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration for the versioning engine
//!
//! Read from an optional TOML file, then overridden by any of these
//! environment variables that are set:
//! - `PROMPTGRAPH_DEFAULT_AUTHOR`: author recorded when a caller supplies none (default: system)
//! - `PROMPTGRAPH_LIST_LIMIT`: default cap for version listings (default: 50)
//! - `PROMPTGRAPH_INITIAL_LABEL`: label of a prompt's root version (default: 1.0.0)
//! - `PROMPTGRAPH_LINE_DIFF`: attach line-level diffs to modified messages (default: false)
//! - `PROMPTGRAPH_MERGE_POLICY`: `source_wins` or `reject_conflicts` (default: source_wins)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How a two-way merge treats fields that both versions hold with different values
///
/// No common ancestor is tracked, so every differing field is a conflict in
/// the two-way sense.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The source version's value is taken for every differing field
    #[default]
    SourceWins,
    /// Refuse to merge and report the differing fields to the caller
    RejectConflicts,
}

impl FromStr for MergePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "source_wins" => Ok(MergePolicy::SourceWins),
            "reject_conflicts" => Ok(MergePolicy::RejectConflicts),
            other => Err(format!("unknown merge policy: {}", other)),
        }
    }
}

impl fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergePolicy::SourceWins => f.write_str("source_wins"),
            MergePolicy::RejectConflicts => f.write_str("reject_conflicts"),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub diff: DiffSettings,
    #[serde(default)]
    pub merge: MergeSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RepositoryConfig {
    /// Author recorded when a caller does not supply one
    #[serde(default = "default_author")]
    pub default_author: String,

    /// Cap applied to version listings when the caller passes no limit
    #[serde(default = "default_list_limit")]
    pub default_list_limit: usize,

    /// Label given to a prompt's root version
    #[serde(default = "default_initial_label")]
    pub initial_label: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            default_author: default_author(),
            default_list_limit: default_list_limit(),
            initial_label: default_initial_label(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DiffSettings {
    /// Attach a patience line diff to every modified message
    #[serde(default)]
    pub line_diff: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MergeSettings {
    #[serde(default)]
    pub policy: MergePolicy,
}

fn default_author() -> String {
    "system".to_string()
}

fn default_list_limit() -> usize {
    50
}

fn default_initial_label() -> String {
    "1.0.0".to_string()
}

const ENV_DEFAULT_AUTHOR: &str = "PROMPTGRAPH_DEFAULT_AUTHOR";
const ENV_LIST_LIMIT: &str = "PROMPTGRAPH_LIST_LIMIT";
const ENV_INITIAL_LABEL: &str = "PROMPTGRAPH_INITIAL_LABEL";
const ENV_LINE_DIFF: &str = "PROMPTGRAPH_LINE_DIFF";
const ENV_MERGE_POLICY: &str = "PROMPTGRAPH_MERGE_POLICY";

impl EngineConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables on top of defaults
    pub fn from_env() -> Self {
        Self::merge_with_env(Self::default())
    }

    /// Load configuration: defaults, then the file (if any), then env overrides
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let config = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        let config = Self::merge_with_env(config);
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (only variables that are set)
    fn merge_with_env(mut config: Self) -> Self {
        if let Ok(author) = std::env::var(ENV_DEFAULT_AUTHOR) {
            config.repository.default_author = author;
        }

        if let Ok(limit) = std::env::var(ENV_LIST_LIMIT) {
            match limit.parse() {
                Ok(val) => config.repository.default_list_limit = val,
                Err(_) => tracing::warn!("Ignoring invalid {}: {}", ENV_LIST_LIMIT, limit),
            }
        }

        if let Ok(label) = std::env::var(ENV_INITIAL_LABEL) {
            config.repository.initial_label = label;
        }

        if let Ok(line_diff) = std::env::var(ENV_LINE_DIFF) {
            config.diff.line_diff = line_diff.parse().unwrap_or(false);
        }

        if let Ok(policy) = std::env::var(ENV_MERGE_POLICY) {
            match policy.parse() {
                Ok(val) => config.merge.policy = val,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_MERGE_POLICY, e),
            }
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.repository.default_author.trim().is_empty() {
            anyhow::bail!("repository.default_author must not be empty");
        }

        if self.repository.default_list_limit == 0 {
            anyhow::bail!("repository.default_list_limit must be greater than zero");
        }

        let label = self.repository.initial_label.trim_start_matches('v');
        if semver::Version::parse(label).is_err() {
            anyhow::bail!(
                "repository.initial_label is not a semantic version: {}",
                self.repository.initial_label
            );
        }

        Ok(())
    }
}
