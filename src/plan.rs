//! Ordered statement scripts for a complete merge.
//!
//! A plan has two parts. The schema part creates and indexes every input
//! table, so the caller can load them. The merge part builds the output table
//! from the loaded inputs, in one of two ways:
//!
//! - [`MergeMode::CreateAs`]: a single `CREATE TABLE .. AS SELECT` over a
//!   left join of every peer onto the master.
//! - [`MergeMode::SeedAndUpdate`]: create the output table, seed it with the
//!   master's rows, then copy each peer's fields in with an UPDATE.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dialect::{Dialect, UpdateStrategy};
use crate::error::{MergeError, MergeResult};
use crate::joiner::MultiJoiner;
use crate::table::TableDescriptor;
use crate::transfer::{FieldTransfer, SeedTransfer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeMode {
    #[default]
    CreateAs,
    SeedAndUpdate,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeMode::CreateAs => "create-as",
            MergeMode::SeedAndUpdate => "seed-and-update",
        };
        f.write_str(name)
    }
}

impl FromStr for MergeMode {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create-as" => Ok(MergeMode::CreateAs),
            "seed-and-update" | "seed" => Ok(MergeMode::SeedAndUpdate),
            other => Err(MergeError::Config(format!(
                "unknown merge mode '{other}', expected create-as or seed-and-update"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatementKind {
    CreateTable,
    CreateIndex,
    Seed,
    Update,
    CreateJoined,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatementKind::CreateTable => "create table",
            StatementKind::CreateIndex => "create index",
            StatementKind::Seed => "seed",
            StatementKind::Update => "update",
            StatementKind::CreateJoined => "create joined",
        };
        f.write_str(label)
    }
}

/// One SQL statement and the table it writes to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub table: String,
    pub sql: String,
}

impl Statement {
    fn new(kind: StatementKind, table: &str, sql: String) -> Self {
        Self {
            kind,
            table: table.to_string(),
            sql,
        }
    }

    /// The SQL text terminated by exactly one `;`.
    pub fn terminated(&self) -> String {
        format!("{};", self.sql.trim_end().trim_end_matches(';'))
    }
}

#[derive(Debug, Clone)]
pub struct MergePlan {
    output_name: String,
    tables: Vec<TableDescriptor>,
    mode: MergeMode,
    dialect: Dialect,
    strategy: Option<UpdateStrategy>,
}

impl MergePlan {
    /// `tables[0]` is the master table.
    pub fn new(output_name: impl Into<String>, tables: Vec<TableDescriptor>) -> MergeResult<Self> {
        if tables.is_empty() {
            return Err(MergeError::NoTables);
        }
        Ok(Self {
            output_name: output_name.into(),
            tables,
            mode: MergeMode::default(),
            dialect: Dialect::default(),
            strategy: None,
        })
    }

    pub fn with_mode(mut self, mode: MergeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Override the dialect's preferred update strategy.
    pub fn with_strategy(mut self, strategy: UpdateStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn output_name(&self) -> &str {
        &self.output_name
    }

    pub fn tables(&self) -> &[TableDescriptor] {
        &self.tables
    }

    pub fn master(&self) -> &TableDescriptor {
        &self.tables[0]
    }

    pub fn peers(&self) -> &[TableDescriptor] {
        &self.tables[1..]
    }

    pub fn mode(&self) -> MergeMode {
        self.mode
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn update_strategy(&self) -> UpdateStrategy {
        self.strategy
            .unwrap_or_else(|| self.dialect.generator().preferred_update())
    }

    /// Layout of the output table built by [`MergeMode::SeedAndUpdate`]:
    /// keyed like the master, holding the master's columns and every peer's
    /// output columns.
    pub fn output_table(&self) -> TableDescriptor {
        let master = self.master();
        let mut columns = master.all_columns().to_vec();
        for peer in self.peers() {
            columns.extend(peer.output_columns(false));
        }
        TableDescriptor::new(&self.output_name, master.join_columns().to_vec(), columns)
    }

    /// CREATE TABLE and CREATE INDEX for every input table.
    pub fn schema_statements(&self) -> Vec<Statement> {
        self.tables.iter().flat_map(create_statements).collect()
    }

    /// Statements that build the output table from loaded inputs.
    pub fn merge_statements(&self) -> MergeResult<Vec<Statement>> {
        let statements = match self.mode {
            MergeMode::CreateAs => {
                let joiner = MultiJoiner::new(&self.output_name, &self.tables)?;
                vec![Statement::new(
                    StatementKind::CreateJoined,
                    &self.output_name,
                    joiner.create_joined_table_sql(),
                )]
            }
            MergeMode::SeedAndUpdate => self.seed_and_update_statements()?,
        };
        for stmt in &statements {
            debug!("[{}] {}", stmt.kind, stmt.sql);
        }
        Ok(statements)
    }

    fn seed_and_update_statements(&self) -> MergeResult<Vec<Statement>> {
        let output = self.output_table();
        let strategy = self.update_strategy();
        if strategy == UpdateStrategy::Replace && self.peers().len() > 1 {
            warn!(
                "REPLACE INTO run for {} peer tables against {} will duplicate rows",
                self.peers().len(),
                self.output_name
            );
        }

        let mut statements = create_statements(&output);
        statements.push(Statement::new(
            StatementKind::Seed,
            &self.output_name,
            SeedTransfer::new(&output, self.master()).insert_select_sql(),
        ));

        // Columns already filled by the seed or an earlier peer are never overwritten.
        let mut filled = self.master().all_columns().to_vec();
        for peer in self.peers() {
            let (skipped, requested): (Vec<String>, Vec<String>) = peer
                .output_columns(false)
                .into_iter()
                .partition(|c| filled.contains(c));
            let skipped: Vec<String> = skipped
                .into_iter()
                .filter(|c| !output.join_columns().contains(c))
                .collect();
            if !skipped.is_empty() {
                warn!(
                    "Skipping {} from {}: already filled in {}",
                    skipped.join(", "),
                    peer.name(),
                    self.output_name
                );
            }
            let transfer = FieldTransfer::new(&output, peer, requested)?;
            filled.extend(transfer.transfer_fields(false));
            if transfer.transfer_fields(false).is_empty() {
                debug!("Nothing to transfer from {}", peer.name());
                continue;
            }
            statements.push(Statement::new(
                StatementKind::Update,
                &self.output_name,
                transfer.update_sql(strategy),
            ));
        }
        Ok(statements)
    }

    /// Schema statements followed by merge statements.
    pub fn statements(&self) -> MergeResult<Vec<Statement>> {
        let mut statements = self.schema_statements();
        statements.extend(self.merge_statements()?);
        Ok(statements)
    }

    /// The full plan as a script, one terminated statement per line.
    pub fn to_script(&self) -> MergeResult<String> {
        Ok(render_script(&self.statements()?))
    }
}

fn create_statements(table: &TableDescriptor) -> Vec<Statement> {
    let mut statements = vec![Statement::new(
        StatementKind::CreateTable,
        table.name(),
        table.create_table_sql(),
    )];
    statements.extend(
        table
            .create_index_statements()
            .into_iter()
            .map(|sql| Statement::new(StatementKind::CreateIndex, table.name(), sql)),
    );
    statements
}

pub fn render_script(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(Statement::terminated)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tables() -> Vec<TableDescriptor> {
        vec![
            TableDescriptor::new("REC01", ["CASEID"], ["CASEID", "V001"]),
            TableDescriptor::new("RECH0", ["HHID"], ["HV001", "HV002"]),
        ]
    }

    fn kinds(statements: &[Statement]) -> Vec<StatementKind> {
        statements.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_empty_plan_rejected() {
        assert!(matches!(
            MergePlan::new("OUT", Vec::new()),
            Err(MergeError::NoTables)
        ));
    }

    #[test]
    fn test_schema_statements() {
        let plan = MergePlan::new("WOMEN", tables()).unwrap();
        let stmts = plan.schema_statements();
        assert_eq!(
            kinds(&stmts),
            vec![
                StatementKind::CreateTable,
                StatementKind::CreateIndex,
                StatementKind::CreateIndex,
                StatementKind::CreateTable,
                StatementKind::CreateIndex,
                StatementKind::CreateIndex,
            ]
        );
        assert_eq!(stmts[3].table, "RECH0");
    }

    #[test]
    fn test_create_as_script() {
        let plan = MergePlan::new("WOMEN", tables()).unwrap();
        let merge = plan.merge_statements().unwrap();
        assert_eq!(merge.len(), 1);
        assert_eq!(
            merge[0].sql,
            "CREATE TABLE WOMEN AS SELECT REC01.CASEID, REC01.V001, RECH0.HV001, RECH0.HV002 \
             FROM REC01 LEFT JOIN RECH0 ON \
             substr(REC01.CASEID, 1, length(REC01.CASEID)-3) = RECH0.HHID"
        );
        let script = plan.to_script().unwrap();
        assert!(script.starts_with("CREATE TABLE REC01 (CASEID text, V001 text);\n"));
        assert!(script.ends_with("= RECH0.HHID;"));
        assert_eq!(script.lines().count(), 7);
    }

    #[test]
    fn test_seed_and_update_script() {
        let plan = MergePlan::new("WOMEN", tables())
            .unwrap()
            .with_mode(MergeMode::SeedAndUpdate);
        let merge = plan.merge_statements().unwrap();
        assert_eq!(
            kinds(&merge),
            vec![
                StatementKind::CreateTable,
                StatementKind::CreateIndex,
                StatementKind::CreateIndex,
                StatementKind::Seed,
                StatementKind::Update,
            ]
        );
        assert_eq!(
            merge[0].sql,
            "CREATE TABLE WOMEN (CASEID text, HV001 text, HV002 text, V001 text);"
        );
        assert_eq!(
            merge[3].sql,
            "INSERT INTO WOMEN(CASEID, V001) SELECT CASEID, V001 FROM REC01"
        );
        assert_eq!(
            merge[4].sql,
            "UPDATE WOMEN SET \
             HV001 = (SELECT HV001 FROM RECH0 WHERE substr(WOMEN.CASEID, 1, length(WOMEN.CASEID)-3) = RECH0.HHID), \
             HV002 = (SELECT HV002 FROM RECH0 WHERE substr(WOMEN.CASEID, 1, length(WOMEN.CASEID)-3) = RECH0.HHID)"
        );
    }

    #[test]
    fn test_strategy_follows_dialect() {
        let plan = MergePlan::new("WOMEN", tables())
            .unwrap()
            .with_mode(MergeMode::SeedAndUpdate)
            .with_dialect(Dialect::MySQL);
        assert_eq!(plan.update_strategy(), UpdateStrategy::InnerJoin);
        let merge = plan.merge_statements().unwrap();
        assert!(merge[4].sql.starts_with("UPDATE WOMEN INNER JOIN RECH0 ON"));

        let plan = plan.with_strategy(UpdateStrategy::Replace);
        let merge = plan.merge_statements().unwrap();
        assert!(merge[4].sql.starts_with("REPLACE INTO WOMEN(HV001, HV002)"));
    }

    #[test]
    fn test_peer_with_only_keys_gets_no_update() {
        let tables = vec![
            TableDescriptor::new("REC01", ["CASEID"], ["CASEID", "V001"]),
            TableDescriptor::new("REC01B", ["CASEID"], ["CASEID"]),
        ];
        let plan = MergePlan::new("WOMEN", tables)
            .unwrap()
            .with_mode(MergeMode::SeedAndUpdate);
        let merge = plan.merge_statements().unwrap();
        assert!(merge.iter().all(|s| s.kind != StatementKind::Update));
    }

    #[test]
    fn test_update_never_overwrites_filled_columns() {
        let tables = vec![
            TableDescriptor::new("REC21", ["CASEID"], ["COLX"]),
            TableDescriptor::new("REC43", ["CASEID"], ["COLX", "COLY"]),
            TableDescriptor::new("REC44", ["CASEID"], ["COLY", "COLZ"]),
        ];
        let plan = MergePlan::new("OUT", tables)
            .unwrap()
            .with_mode(MergeMode::SeedAndUpdate);
        let merge = plan.merge_statements().unwrap();
        assert_eq!(
            merge[0].sql,
            "CREATE TABLE OUT (CASEID text, COLX text, COLY text, COLZ text);"
        );
        let updates: Vec<&str> = merge
            .iter()
            .filter(|s| s.kind == StatementKind::Update)
            .map(|s| s.sql.as_str())
            .collect();
        assert_eq!(
            updates,
            vec![
                "UPDATE OUT SET COLY = (SELECT COLY FROM REC43 WHERE OUT.CASEID = REC43.CASEID)",
                "UPDATE OUT SET COLZ = (SELECT COLZ FROM REC44 WHERE OUT.CASEID = REC44.CASEID)",
            ]
        );
    }

    #[test]
    fn test_peer_fully_shadowed_gets_no_update() {
        let tables = vec![
            TableDescriptor::new("REC21", ["CASEID"], ["COLX"]),
            TableDescriptor::new("REC43", ["CASEID"], ["COLX"]),
        ];
        let plan = MergePlan::new("OUT", tables)
            .unwrap()
            .with_mode(MergeMode::SeedAndUpdate);
        let merge = plan.merge_statements().unwrap();
        assert!(merge.iter().all(|s| s.kind != StatementKind::Update));
    }

    #[test]
    fn test_terminated() {
        let stmt = Statement::new(
            StatementKind::CreateTable,
            "T",
            "CREATE TABLE T (A text);".into(),
        );
        assert_eq!(stmt.terminated(), "CREATE TABLE T (A text);");
        let stmt = Statement::new(
            StatementKind::Seed,
            "T",
            "INSERT INTO T(A) SELECT A FROM S".into(),
        );
        assert_eq!(stmt.terminated(), "INSERT INTO T(A) SELECT A FROM S;");
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("seed".parse::<MergeMode>().unwrap(), MergeMode::SeedAndUpdate);
        assert_eq!("create-as".parse::<MergeMode>().unwrap(), MergeMode::CreateAs);
        assert!("merge".parse::<MergeMode>().is_err());
    }
}
