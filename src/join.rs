//! Join predicates between two tables.
//!
//! Join keys are matched by position, not by name: the output table's first
//! key pairs with the input table's first key, and so on. When one table
//! declares more keys than the other only the common prefix is used, so a
//! child-level table keyed `[CASEID, BIDX]` can still join a parent keyed
//! `[CASEID]`.
//!
//! Some identifiers embed a coarser identifier. A [`KeyNarrowing`] rule trims
//! the wide side of such a pair so it compares equal to the narrow side.

use std::fmt;

use tracing::debug;

use crate::table::TableDescriptor;

/// One positional pairing of an output join key with an input join key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPair<'a> {
    pub output: &'a str,
    pub input: &'a str,
}

/// Pair two join key lists by index, dropping the tail of the longer list.
pub fn pair_join_keys<'a>(output: &'a [String], input: &'a [String]) -> Vec<KeyPair<'a>> {
    output
        .iter()
        .zip(input)
        .map(|(o, i)| KeyPair {
            output: o,
            input: i,
        })
        .collect()
}

/// A wide identifier that equals a narrow identifier once its last `strip`
/// characters are removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyNarrowing {
    pub wide: &'static str,
    pub narrow: &'static str,
    pub strip: usize,
}

/// A case id is the household id followed by a 3 character line number.
pub const KEY_NARROWING_RULES: &[KeyNarrowing] = &[KeyNarrowing {
    wide: "CASEID",
    narrow: "HHID",
    strip: 3,
}];

impl KeyNarrowing {
    fn applies(&self, column: &str, other: &str) -> bool {
        column == self.wide && other == self.narrow
    }

    fn wrap(&self, table: &str, column: &str) -> String {
        format!(
            "substr({table}.{column}, 1, length({table}.{column})-{})",
            self.strip
        )
    }
}

/// Reference to `table.column`, narrowed if a rule matches against `other`.
fn column_ref(table: &str, column: &str, other: &str, rules: &[KeyNarrowing]) -> String {
    match rules.iter().find(|rule| rule.applies(column, other)) {
        Some(rule) => rule.wrap(table, column),
        None => format!("{table}.{column}"),
    }
}

/// The `ON` condition joining an output table to an input table.
///
/// Displays as the equality clauses joined by `AND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPredicate {
    clauses: Vec<String>,
}

impl JoinPredicate {
    /// Build the predicate using the built-in [`KEY_NARROWING_RULES`].
    pub fn between(output: &TableDescriptor, input: &TableDescriptor) -> Self {
        Self::with_rules(output, input, KEY_NARROWING_RULES)
    }

    pub fn with_rules(
        output: &TableDescriptor,
        input: &TableDescriptor,
        rules: &[KeyNarrowing],
    ) -> Self {
        let pairs = pair_join_keys(output.join_columns(), input.join_columns());
        if pairs.len() < output.join_columns().len().max(input.join_columns().len()) {
            debug!(
                "Joining {} onto {} on the first {} key(s) only",
                input.name(),
                output.name(),
                pairs.len()
            );
        }

        let clauses = pairs
            .iter()
            .map(|pair| {
                let left = column_ref(output.name(), pair.output, pair.input, rules);
                let right = column_ref(input.name(), pair.input, pair.output, rules);
                format!("{left} = {right}")
            })
            .collect();

        Self { clauses }
    }

    /// The individual equality clauses, in key order.
    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

impl fmt::Display for JoinPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.clauses.join(" AND "))
    }
}
