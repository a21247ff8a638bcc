//! # recode-merge
//!
//! Builds the SQL that merges separately loaded survey recode tables into a
//! single denormalized output table.
//!
//! Nothing in the SQL-building modules touches a database: they turn table
//! descriptions into statement text. The [`engine`] module can run that text
//! through sqlx, or the caller can run it any other way.
//!
//! ## Quick Example
//!
//! ```
//! use recode_merge::prelude::*;
//!
//! let tables = vec![
//!     TableDescriptor::new("REC21", ["CASEID", "BIDX"], ["CASEID", "BIDX", "B4"]),
//!     TableDescriptor::new("RECH0", ["HHID"], ["HV001"]),
//! ];
//! let joiner = MultiJoiner::new("BIRTHS", &tables).unwrap();
//! assert_eq!(
//!     joiner.create_joined_table_sql(),
//!     "CREATE TABLE BIRTHS AS SELECT REC21.CASEID, REC21.BIDX, REC21.B4, RECH0.HV001 \
//!      FROM REC21 LEFT JOIN RECH0 ON \
//!      substr(REC21.CASEID, 1, length(REC21.CASEID)-3) = RECH0.HHID"
//! );
//! ```
//!
//! ## Building blocks
//!
//! | Type               | Produces                                          |
//! |--------------------|---------------------------------------------------|
//! | `TableDescriptor`  | CREATE TABLE, CREATE INDEX, INSERT template       |
//! | `JoinPredicate`    | positional key equality, with CASEID/HHID narrowing |
//! | `FieldTransfer`    | subquery UPDATE, join UPDATE, REPLACE INTO        |
//! | `SeedTransfer`     | INSERT .. SELECT of a whole table                 |
//! | `MultiJoiner`      | CREATE TABLE .. AS SELECT with LEFT JOINs         |
//! | `MergePlan`        | the ordered script for a whole merge              |

pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod join;
pub mod joiner;
pub mod notation;
pub mod plan;
pub mod table;
pub mod transfer;

pub use joiner::MultiJoiner;
pub use table::TableDescriptor;

pub mod prelude {
    pub use crate::config::{MergeConfig, TableConfig};
    pub use crate::dialect::{Dialect, SqlGenerator, UpdateStrategy};
    pub use crate::engine::MergeDB;
    pub use crate::error::*;
    pub use crate::join::{JoinPredicate, KeyNarrowing, KeyPair, KEY_NARROWING_RULES};
    pub use crate::joiner::MultiJoiner;
    pub use crate::notation::{parse_table, parse_tables};
    pub use crate::plan::{MergeMode, MergePlan, Statement, StatementKind};
    pub use crate::table::{ColumnList, TableDescriptor};
    pub use crate::transfer::{FieldTransfer, SeedTransfer};
}

/// Parse a table in compact notation, e.g. `REC21(CASEID, BIDX): B4, B5`.
///
/// # Example
///
/// ```
/// use recode_merge::parse;
///
/// let table = parse("RECH0(HHID): HV001").unwrap();
/// assert_eq!(table.all_columns(), ["HHID", "HV001"]);
/// ```
pub fn parse(input: &str) -> Result<TableDescriptor, error::MergeError> {
    notation::parse_table(input)
}
