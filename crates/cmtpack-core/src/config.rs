//! Configuration parsing and validation
//!
//! This module handles loading and validating cmtpack project configuration.
//!
//! # Project layout
//!
//! - `cmtpack.yaml` - Project configuration
//! - `data_schema.xml` - CMT schema (name configurable)
//! - `tables/` - `.xlsx` workbooks (one table per named Excel table) and
//!   `.csv` / `.json` files (one table per file)
//! - `output/` - Generated document and package

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Configuration file name inside a project directory
pub const CONFIG_FILE: &str = "cmtpack.yaml";

/// Root project configuration from `cmtpack.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Schema file, relative to the project directory
    #[serde(default = "default_schema")]
    pub schema: String,

    /// Directory holding the table files
    #[serde(default = "default_tables_dir")]
    pub tables_dir: String,

    /// Directory receiving generated files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// File name of the generated document, also its archive entry name
    #[serde(default = "default_data_file")]
    pub data_file: String,

    /// File name of the generated package
    #[serde(default = "default_archive_file")]
    pub archive_file: String,

    /// Per-table column selection; see [`crate::filter`]
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub columns: HashMap<String, Vec<String>>,
}

fn default_schema() -> String {
    "data_schema.xml".to_string()
}

fn default_tables_dir() -> String {
    "tables".to_string()
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_data_file() -> String {
    "data.xml".to_string()
}

fn default_archive_file() -> String {
    "data.zip".to_string()
}

impl ProjectConfig {
    /// Configuration with default paths and no column selection
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: default_schema(),
            tables_dir: default_tables_dir(),
            output_dir: default_output_dir(),
            data_file: default_data_file(),
            archive_file: default_archive_file(),
            columns: HashMap::new(),
        }
    }

    /// Check values serde cannot: output names must be bare file names
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                message: "project name must not be empty".to_string(),
            });
        }
        for (key, value) in [
            ("data_file", &self.data_file),
            ("archive_file", &self.archive_file),
        ] {
            let path = Path::new(value);
            if value.is_empty() || path.file_name() != Some(path.as_os_str()) {
                return Err(Error::ConfigInvalid {
                    message: format!("{key} must be a plain file name, got '{value}'"),
                });
            }
        }
        Ok(())
    }
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a project directory or a `cmtpack.yaml` path
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-migration")?;
    /// println!("Project: {}", config.project.name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join(CONFIG_FILE), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        project.validate()?;

        tracing::debug!("Loaded configuration from {}", config_path.display());
        Ok(Self { project, base_path })
    }

    /// Schema file path
    pub fn schema_path(&self) -> PathBuf {
        self.base_path.join(&self.project.schema)
    }

    /// Table directory path
    pub fn tables_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.tables_dir)
    }

    /// Output directory path
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.output_dir)
    }

    /// Generated document path
    pub fn data_path(&self) -> PathBuf {
        self.output_dir().join(&self.project.data_file)
    }

    /// Generated package path
    pub fn archive_path(&self) -> PathBuf {
        self.output_dir().join(&self.project.archive_file)
    }
}
