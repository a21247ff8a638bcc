//! Multi-table join into a single output table.
//!
//! The first table is the master: every one of its rows appears in the
//! output, and every other table is `LEFT JOIN`ed onto it. Peers must join
//! the master 1:1 or M:1; a peer with several rows per master row duplicates
//! master rows in the output. That is not checked.

use tracing::debug;

use crate::error::{MergeError, MergeResult};
use crate::table::{ColumnList, TableDescriptor};
use crate::transfer::FieldTransfer;

#[derive(Debug, Clone)]
pub struct MultiJoiner<'a> {
    output_name: String,
    master: &'a TableDescriptor,
    transfers: Vec<FieldTransfer<'a>>,
}

impl<'a> MultiJoiner<'a> {
    /// `tables[0]` is the master. Each remaining table transfers its own
    /// output columns.
    pub fn new(output_name: impl Into<String>, tables: &'a [TableDescriptor]) -> MergeResult<Self> {
        let (master, peers) = tables.split_first().ok_or(MergeError::NoTables)?;
        let transfers = peers
            .iter()
            .map(|peer| FieldTransfer::new(master, peer, peer.output_columns(false)))
            .collect::<MergeResult<Vec<_>>>()?;

        Ok(Self {
            output_name: output_name.into(),
            master,
            transfers,
        })
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn master(&self) -> &'a TableDescriptor {
        self.master
    }

    pub fn transfers(&self) -> &[FieldTransfer<'a>] {
        &self.transfers
    }

    /// `LEFT JOIN peer ON ..`, one per peer in input order.
    pub fn join_clauses(&self) -> Vec<String> {
        self.transfers
            .iter()
            .map(|t| format!("LEFT JOIN {} ON {}", t.input().name(), t.join_predicate()))
            .collect()
    }

    /// The master's qualified output columns, then each peer's qualified
    /// transfer fields, with exact repeats removed.
    pub fn select_columns(&self) -> ColumnList {
        let mut columns = self.master.output_columns(true);
        for transfer in &self.transfers {
            columns.extend(transfer.transfer_fields(true));
        }
        let total = columns.len();
        let columns = columns.dedup();
        debug!(
            "Selecting {} of {} column references into {}",
            columns.len(),
            total,
            self.output_name
        );
        columns
    }

    pub fn select_sql(&self) -> String {
        let mut sql = format!(
            "SELECT {} FROM {}",
            self.select_columns(),
            self.master.name()
        );
        let joins = self.join_clauses();
        if !joins.is_empty() {
            sql.push(' ');
            sql.push_str(&joins.join(" "));
        }
        sql
    }

    /// `CREATE TABLE out AS SELECT .. FROM master LEFT JOIN ..`
    pub fn create_joined_table_sql(&self) -> String {
        format!("CREATE TABLE {} AS {}", self.output_name, self.select_sql())
    }
}
