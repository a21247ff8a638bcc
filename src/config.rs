//! Merge configuration.
//!
//! ```toml
//! output = "BIRTHS"
//! dialect = "sqlite"
//! mode = "create-as"
//!
//! [[tables]]
//! name = "REC21"
//! join_columns = ["CASEID", "BIDX"]
//! output_columns = ["B4", "B5"]
//!
//! # or in compact notation
//! [[tables]]
//! notation = "RECH0(HHID): HV001, HV002"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::dialect::{Dialect, UpdateStrategy};
use crate::error::{MergeError, MergeResult};
use crate::notation::parse_table;
use crate::plan::{MergeMode, MergePlan};
use crate::table::TableDescriptor;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "recode-merge.toml";

/// One input table, listed explicitly or in compact notation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TableConfig {
    Notation {
        notation: String,
    },
    Columns {
        name: String,
        #[serde(default)]
        join_columns: Vec<String>,
        #[serde(default)]
        output_columns: Vec<String>,
    },
}

impl TableConfig {
    pub fn descriptor(&self) -> MergeResult<TableDescriptor> {
        match self {
            TableConfig::Notation { notation } => parse_table(notation),
            TableConfig::Columns {
                name,
                join_columns,
                output_columns,
            } => Ok(TableDescriptor::new(
                name,
                join_columns.iter().cloned(),
                output_columns.iter().cloned(),
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergeConfig {
    /// Name of the merged output table.
    pub output: String,

    #[serde(default)]
    pub dialect: Dialect,

    #[serde(default)]
    pub mode: MergeMode,

    /// Overrides the dialect's preferred update strategy.
    #[serde(default)]
    pub strategy: Option<UpdateStrategy>,

    #[serde(default)]
    pub database_url: Option<String>,

    /// Input tables, master first.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl MergeConfig {
    pub fn from_toml_str(content: &str) -> MergeResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> MergeResult<Self> {
        let path = path.as_ref();
        debug!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| MergeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Candidate config files in lookup order: the working directory, then
    /// the user config directory.
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("recode-merge").join("config.toml"));
        }
        paths
    }

    /// Load `explicit` if given, otherwise the first existing default path.
    pub fn locate(explicit: Option<&Path>) -> MergeResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let paths = Self::default_paths();
        match paths.iter().find(|p| p.exists()) {
            Some(path) => Self::load(path),
            None => Err(MergeError::Config(format!(
                "no config file found (looked for {})",
                paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
        }
    }

    pub fn descriptors(&self) -> MergeResult<Vec<TableDescriptor>> {
        self.tables.iter().map(TableConfig::descriptor).collect()
    }

    pub fn plan(&self) -> MergeResult<MergePlan> {
        let mut plan = MergePlan::new(&self.output, self.descriptors()?)?
            .with_mode(self.mode)
            .with_dialect(self.dialect);
        if let Some(strategy) = self.strategy {
            plan = plan.with_strategy(strategy);
        }
        Ok(plan)
    }
}
