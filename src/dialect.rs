//! SQL dialects and update strategies.
//!
//! Identifiers are never quoted: callers supply safe table and column names.
//! The only dialect differences modeled here are the insert placeholder form
//! and which field-transfer UPDATE shape an engine accepts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    SQLite,
    MySQL,
    Postgres,
}

impl Dialect {
    pub fn generator(&self) -> Box<dyn SqlGenerator> {
        match self {
            Dialect::SQLite => Box::new(SqliteGenerator),
            Dialect::MySQL => Box::new(MysqlGenerator),
            Dialect::Postgres => Box::new(PostgresGenerator),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.generator().name())
    }
}

impl FromStr for Dialect {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Dialect::SQLite),
            "mysql" | "mariadb" => Ok(Dialect::MySQL),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            other => Err(MergeError::Config(format!(
                "unknown dialect '{other}', expected sqlite, mysql or postgres"
            ))),
        }
    }
}

/// How fields are copied from an input table into an existing output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStrategy {
    /// One correlated scalar subquery per field. Runs on any engine.
    Subquery,
    /// `UPDATE .. INNER JOIN .. SET`. MySQL-family engines only.
    InnerJoin,
    /// `REPLACE INTO .. SELECT`. Only safe once per output table.
    Replace,
}

impl fmt::Display for UpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UpdateStrategy::Subquery => "subquery",
            UpdateStrategy::InnerJoin => "inner-join",
            UpdateStrategy::Replace => "replace",
        };
        f.write_str(name)
    }
}

impl FromStr for UpdateStrategy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "subquery" => Ok(UpdateStrategy::Subquery),
            "inner-join" | "join" => Ok(UpdateStrategy::InnerJoin),
            "replace" => Ok(UpdateStrategy::Replace),
            other => Err(MergeError::Config(format!(
                "unknown update strategy '{other}', expected subquery, inner-join or replace"
            ))),
        }
    }
}

/// Dialect-specific pieces of SQL text.
pub trait SqlGenerator {
    /// Human readable dialect name.
    fn name(&self) -> &'static str;

    /// Positional placeholder for the zero-based parameter `index`.
    fn placeholder(&self, index: usize) -> String;

    /// The field-transfer shape to use when the caller does not pick one.
    fn preferred_update(&self) -> UpdateStrategy;
}

pub struct SqliteGenerator;

impl SqlGenerator for SqliteGenerator {
    fn name(&self) -> &'static str {
        "SQLite"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    // SQLite has no join syntax inside UPDATE.
    fn preferred_update(&self) -> UpdateStrategy {
        UpdateStrategy::Subquery
    }
}

pub struct MysqlGenerator;

impl SqlGenerator for MysqlGenerator {
    fn name(&self) -> &'static str {
        "MySQL"
    }

    fn placeholder(&self, _index: usize) -> String {
        "?".into()
    }

    fn preferred_update(&self) -> UpdateStrategy {
        UpdateStrategy::InnerJoin
    }
}

pub struct PostgresGenerator;

impl SqlGenerator for PostgresGenerator {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn preferred_update(&self) -> UpdateStrategy {
        UpdateStrategy::Subquery
    }
}
