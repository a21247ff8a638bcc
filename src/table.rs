//! Table descriptors.
//!
//! A [`TableDescriptor`] records a table's name, its join keys and its
//! output columns, and renders the DDL and insert template for the table.
//!
//! ```
//! use recode_merge::TableDescriptor;
//!
//! let t = TableDescriptor::new("REC21", ["CASEID", "BIDX"], ["COLX", "BIDX", "CASEID"]);
//! assert_eq!(t.output_columns(false).to_string(), "CASEID, BIDX, COLX");
//! assert_eq!(
//!     t.create_table_sql(),
//!     "CREATE TABLE REC21 (CASEID text, BIDX text, COLX text);"
//! );
//! ```

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::ops::Deref;

use serde::Serialize;

use crate::dialect::Dialect;

/// An ordered list of column references.
///
/// Derefs to a slice for iteration and displays as a comma separated list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnList(Vec<String>);

impl ColumnList {
    pub fn new(columns: Vec<String>) -> Self {
        Self(columns)
    }

    /// Prefix every column with `table.`.
    pub fn qualified(table: &str, columns: &[String]) -> Self {
        Self(columns.iter().map(|c| format!("{table}.{c}")).collect())
    }

    /// Copy `columns`, qualifying them only when `qualified` is set.
    pub fn from_columns(table: &str, columns: &[String], qualified: bool) -> Self {
        if qualified {
            Self::qualified(table, columns)
        } else {
            Self(columns.to_vec())
        }
    }

    /// Remove repeats, keeping the first occurrence of each entry.
    pub fn dedup(self) -> Self {
        Self(unique(self.0))
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl Deref for ColumnList {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ColumnList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl FromIterator<String> for ColumnList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<String> for ColumnList {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl IntoIterator for ColumnList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// First-seen-order deduplication.
pub(crate) fn unique<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Name and column layout of one database table.
///
/// Immutable once built. Join columns keep the order they were given in:
/// position `i` of one table's join keys pairs with position `i` of another's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    name: String,
    join_columns: Vec<String>,
    output_columns: Vec<String>,
    all_columns: Vec<String>,
}

impl TableDescriptor {
    /// Build a descriptor.
    ///
    /// - join columns are deduplicated but never reordered
    /// - output columns are deduplicated; any that are also join columns come
    ///   first in join order, the rest follow alphabetically
    /// - all columns are every join column followed by the non-join output
    ///   columns in alphabetical order
    pub fn new<J, O, S, T>(name: impl Into<String>, join_columns: J, output_columns: O) -> Self
    where
        J: IntoIterator<Item = S>,
        S: Into<String>,
        O: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let join_columns = unique(join_columns.into_iter().map(Into::into));
        let sorted_output: BTreeSet<String> =
            output_columns.into_iter().map(Into::into).collect();

        let keyed_output = join_columns
            .iter()
            .filter(|c| sorted_output.contains(*c))
            .cloned();
        let plain_output: Vec<String> = sorted_output
            .iter()
            .filter(|c| !join_columns.contains(c))
            .cloned()
            .collect();

        let output_columns = keyed_output.chain(plain_output.iter().cloned()).collect();
        let all_columns = join_columns.iter().cloned().chain(plain_output).collect();

        Self {
            name: name.into(),
            join_columns,
            output_columns,
            all_columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join_columns(&self) -> &[String] {
        &self.join_columns
    }

    /// The columns this table contributes to a merged output. Join columns
    /// are only present here when they were also listed as output columns.
    pub fn output_columns(&self, qualified: bool) -> ColumnList {
        ColumnList::from_columns(&self.name, &self.output_columns, qualified)
    }

    /// Join columns in given order, then the remaining output columns sorted.
    pub fn all_columns(&self) -> &[String] {
        &self.all_columns
    }

    /// `CREATE TABLE` with every column typed as unconstrained `text`.
    pub fn create_table_sql(&self) -> String {
        let defs = self
            .all_columns
            .iter()
            .map(|c| format!("{c} text"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE {} ({});", self.name, defs)
    }

    /// Parameterized insert with `?` placeholders.
    pub fn insert_template_sql(&self) -> String {
        self.insert_template_sql_for(Dialect::SQLite)
    }

    /// Parameterized insert, one placeholder per column in [`all_columns`] order.
    ///
    /// [`all_columns`]: TableDescriptor::all_columns
    pub fn insert_template_sql_for(&self, dialect: Dialect) -> String {
        let generator = dialect.generator();
        let placeholders = (0..self.all_columns.len())
            .map(|i| generator.placeholder(i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.all_columns.join(", "),
            placeholders
        )
    }

    /// One index per join column plus a composite `ALLIDX_<name>` index.
    /// Empty when the table has no join columns.
    pub fn create_index_statements(&self) -> Vec<String> {
        if self.join_columns.is_empty() {
            return Vec::new();
        }
        let mut stmts: Vec<String> = self
            .join_columns
            .iter()
            .map(|c| format!("CREATE INDEX {c}_{0} ON {0}({c});", self.name))
            .collect();
        stmts.push(format!(
            "CREATE INDEX ALLIDX_{0} ON {0}({1});",
            self.name,
            self.join_columns.join(",")
        ));
        stmts
    }

    pub fn create_index_sql(&self) -> String {
        self.create_index_statements().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rec21() -> TableDescriptor {
        TableDescriptor::new("REC21", ["CASEID", "BIDX"], ["CASEID", "BIDX", "COLX"])
    }

    #[test]
    fn test_join_columns_keep_order() {
        let t = TableDescriptor::new("T", ["Z", "A", "Z", "M"], ["Q"]);
        assert_eq!(t.join_columns(), ["Z", "A", "M"]);
    }

    #[test]
    fn test_output_columns_sorted_after_keys() {
        let t = TableDescriptor::new("T", ["K2", "K1"], ["b", "K1", "a", "b", "K2"]);
        assert_eq!(t.output_columns(false).into_vec(), ["K2", "K1", "a", "b"]);
    }

    #[test]
    fn test_output_columns_may_omit_keys() {
        let t = TableDescriptor::new("T", ["K"], ["y", "x"]);
        assert_eq!(t.output_columns(false).into_vec(), ["x", "y"]);
        assert_eq!(t.all_columns(), ["K", "x", "y"]);
    }

    #[test]
    fn test_qualified_output_columns() {
        assert_eq!(
            rec21().output_columns(true).to_string(),
            "REC21.CASEID, REC21.BIDX, REC21.COLX"
        );
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            rec21().create_table_sql(),
            "CREATE TABLE REC21 (CASEID text, BIDX text, COLX text);"
        );
    }

    #[test]
    fn test_insert_template() {
        assert_eq!(
            rec21().insert_template_sql(),
            "INSERT INTO REC21 (CASEID, BIDX, COLX) VALUES (?, ?, ?)"
        );
        assert_eq!(
            rec21().insert_template_sql_for(Dialect::Postgres),
            "INSERT INTO REC21 (CASEID, BIDX, COLX) VALUES ($1, $2, $3)"
        );
    }

    #[test]
    fn test_create_index() {
        assert_eq!(
            rec21().create_index_sql(),
            "CREATE INDEX CASEID_REC21 ON REC21(CASEID);\n\
             CREATE INDEX BIDX_REC21 ON REC21(BIDX);\n\
             CREATE INDEX ALLIDX_REC21 ON REC21(CASEID,BIDX);"
        );
    }

    #[test]
    fn test_create_index_without_keys() {
        let t = TableDescriptor::new("LOOSE", Vec::<String>::new(), ["A"]);
        assert!(t.create_index_statements().is_empty());
        assert_eq!(t.create_index_sql(), "");
    }

    #[test]
    fn test_column_list_dedup() {
        let list: ColumnList = ["a", "b", "a", "c", "b"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(list.dedup().to_string(), "a, b, c");
    }
}
