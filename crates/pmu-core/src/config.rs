use crate::error::{PmuError, Result};
use crate::gateway::RepoRef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".gh-pmu.yml";

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StatusConfig
// ---------------------------------------------------------------------------

/// Aliases mapping lifecycle roles to the project's Status option names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusValues {
    #[serde(default = "default_backlog")]
    pub backlog: String,
    #[serde(default = "default_in_progress")]
    pub in_progress: String,
    #[serde(default = "default_parking_lot")]
    pub parking_lot: String,
    #[serde(default = "default_done")]
    pub done: String,
}

fn default_backlog() -> String {
    "Backlog".to_string()
}

fn default_in_progress() -> String {
    "In progress".to_string()
}

fn default_parking_lot() -> String {
    "Parking Lot".to_string()
}

fn default_done() -> String {
    "Done".to_string()
}

impl Default for StatusValues {
    fn default() -> Self {
        Self {
            backlog: default_backlog(),
            in_progress: default_in_progress(),
            parking_lot: default_parking_lot(),
            done: default_done(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    #[serde(default = "default_status_field")]
    pub field: String,
    #[serde(default)]
    pub values: StatusValues,
}

fn default_status_field() -> String {
    "Status".to_string()
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            field: default_status_field(),
            values: StatusValues::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldsConfig {
    #[serde(default)]
    pub status: StatusConfig,
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub owner: String,
    pub number: u64,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub project: ProjectConfig,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub fields: FieldsConfig,
}

impl Config {
    pub fn new(owner: impl Into<String>, number: u64) -> Self {
        Self {
            project: ProjectConfig {
                owner: owner.into(),
                number,
            },
            repositories: Vec::new(),
            fields: FieldsConfig::default(),
        }
    }

    pub fn with_repository(mut self, repo: impl Into<String>) -> Self {
        self.repositories.push(repo.into());
        self
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = config_path(root);
        if !path.exists() {
            return Err(PmuError::NotInitialized(root.display().to_string()));
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn status(&self) -> &StatusConfig {
        &self.fields.status
    }

    /// The repository trackers live in: the first configured one.
    pub fn primary_repository(&self) -> Result<RepoRef> {
        let first = self.repositories.first().ok_or(PmuError::NoRepository)?;
        RepoRef::parse(first)
    }

    pub fn repository_refs(&self) -> Result<Vec<RepoRef>> {
        self.repositories.iter().map(|r| RepoRef::parse(r)).collect()
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.project.owner.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "project.owner is empty".to_string(),
            });
        }

        if self.project.number == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "project.number must be a positive project number".to_string(),
            });
        }

        if self.repositories.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "no repositories configured".to_string(),
            });
        }

        for repo in &self.repositories {
            if RepoRef::parse(repo).is_err() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("repository '{repo}' is not in owner/name form"),
                });
            }
        }

        let values = &self.fields.status.values;
        if values.parking_lot.eq_ignore_ascii_case(&values.backlog) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "status values 'parking_lot' and 'backlog' are both '{}'",
                    values.backlog
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
