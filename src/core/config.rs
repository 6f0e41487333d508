use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::classify::{default_rules, ClassifyRule, FileClassifier, FileKind};
use crate::error::{Error, Result};
use crate::rewrite::{RewriteOptions, WriteMode, CONFIG_TRAILER};
use regex::Regex;

/// Looked up in the tree root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "nsmigrate.json";

/// Root configuration structure for nsmigrate.json
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Symbol table source (URL or path). The CLI flag takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_table: Option<String>,

    /// Artifact table source (URL or path). The CLI flag takes precedence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_table: Option<String>,

    /// Regexes matched against directory paths; matching directories are skipped.
    #[serde(default)]
    pub excludes: Vec<String>,

    #[serde(default = "default_classify")]
    pub classify: Vec<ClassifyConfig>,

    /// Lines appended to every config file.
    #[serde(default = "default_config_trailer")]
    pub config_trailer: Vec<String>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            symbol_table: None,
            artifact_table: None,
            excludes: Vec::new(),
            classify: default_classify(),
            config_trailer: default_config_trailer(),
        }
    }
}

/// File name globs for one file kind (`source`, `build-file`, `config`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    pub kind: String,
    pub patterns: Vec<String>,
}

// =============================================================================
// Default value functions
// =============================================================================

fn default_classify() -> Vec<ClassifyConfig> {
    default_rules()
        .into_iter()
        .map(|rule| ClassifyConfig {
            kind: rule.kind.as_str().to_string(),
            patterns: rule.patterns,
        })
        .collect()
}

fn default_config_trailer() -> Vec<String> {
    CONFIG_TRAILER.iter().map(|line| line.to_string()).collect()
}

// =============================================================================
// Loading and conversion
// =============================================================================

impl MigrateConfig {
    /// Load an explicit config file, or `nsmigrate.json` from the tree root if
    /// present, or the built-in defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::config_invalid_value(
                        "config",
                        Some(path.display().to_string()),
                        format!("config file '{}' does not exist", path.display()),
                    ));
                }
                path.to_path_buf()
            }
            None => {
                let candidate = root.join(CONFIG_FILE_NAME);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read {}", path.display())))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))
    }

    /// Build the tree classifier. Unknown kinds and bad regexes are fatal.
    pub fn classifier(&self) -> Result<FileClassifier> {
        let rules = self
            .classify
            .iter()
            .map(|rule| {
                Ok(ClassifyRule {
                    kind: rule.kind.parse::<FileKind>()?,
                    patterns: rule.patterns.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let excludes = self
            .excludes
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    Error::config_invalid_value("excludes", Some(pattern.clone()), e.to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(FileClassifier::new(rules, excludes))
    }

    pub fn rewrite_options(&self, mode: WriteMode) -> RewriteOptions {
        RewriteOptions {
            mode,
            config_trailer: self.config_trailer.clone(),
        }
    }
}
