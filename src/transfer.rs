//! SQL for copying data between two existing tables.
//!
//! [`FieldTransfer`] copies selected fields into rows of an output table that
//! already exist, matching rows on the two tables' join keys.
//! [`SeedTransfer`] fills an empty output table with every row and column of
//! a single input table, before any field transfers run against it.

use tracing::debug;

use crate::dialect::UpdateStrategy;
use crate::error::{MergeError, MergeResult};
use crate::join::JoinPredicate;
use crate::table::{ColumnList, TableDescriptor};

/// Copies a set of fields from `input` into matching rows of `output`.
///
/// Requested fields that `input` does not have are dropped.
#[derive(Debug, Clone)]
pub struct FieldTransfer<'a> {
    output: &'a TableDescriptor,
    input: &'a TableDescriptor,
    fields: Vec<String>,
}

impl<'a> FieldTransfer<'a> {
    /// Fails with [`MergeError::NoJoinKeys`] when either table has no join
    /// columns, since the join would otherwise be a cross join.
    pub fn new<I, S>(
        output: &'a TableDescriptor,
        input: &'a TableDescriptor,
        requested: I,
    ) -> MergeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if output.join_columns().is_empty() || input.join_columns().is_empty() {
            return Err(MergeError::no_join_keys(output.name(), input.name()));
        }

        let (fields, dropped): (Vec<String>, Vec<String>) = requested
            .into_iter()
            .map(Into::into)
            .partition(|f| input.all_columns().contains(f));
        if !dropped.is_empty() {
            debug!(
                "{} has no column(s) {}; not transferring them",
                input.name(),
                dropped.join(", ")
            );
        }

        Ok(Self {
            output,
            input,
            fields,
        })
    }

    pub fn output(&self) -> &'a TableDescriptor {
        self.output
    }

    pub fn input(&self) -> &'a TableDescriptor {
        self.input
    }

    /// Fields copied from the input table, optionally qualified with its name.
    pub fn transfer_fields(&self, qualified: bool) -> ColumnList {
        ColumnList::from_columns(self.input.name(), &self.fields, qualified)
    }

    pub fn join_predicate(&self) -> JoinPredicate {
        JoinPredicate::between(self.output, self.input)
    }

    /// `UPDATE out SET f = (SELECT f FROM in WHERE ..), ..`
    ///
    /// Runs on engines without join syntax in UPDATE. Evaluates one subquery
    /// per row and field, so the join columns should be indexed.
    pub fn subquery_update_sql(&self) -> String {
        let predicate = self.join_predicate();
        let sets = self
            .fields
            .iter()
            .map(|f| format!("{f} = (SELECT {f} FROM {} WHERE {predicate})", self.input.name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("UPDATE {} SET {}", self.output.name(), sets)
    }

    /// `UPDATE out INNER JOIN in ON .. SET out.f = in.f, ..`
    ///
    /// Single pass, but SQLite and PostgreSQL reject this form.
    pub fn join_update_sql(&self) -> String {
        let out = self.output.name();
        let inp = self.input.name();
        let sets = self
            .fields
            .iter()
            .map(|f| format!("{out}.{f} = {inp}.{f}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {out} INNER JOIN {inp} ON {} SET {sets}",
            self.join_predicate()
        )
    }

    /// `REPLACE INTO out(f, ..) SELECT in.f, .. FROM out INNER JOIN in ON ..`
    ///
    /// Only correct for the first transfer into an output table. Running a
    /// second one against the same table duplicates rows.
    pub fn replace_into_sql(&self) -> String {
        format!(
            "REPLACE INTO {out}({}) SELECT {} FROM {out} INNER JOIN {} ON {}",
            self.transfer_fields(false),
            self.transfer_fields(true),
            self.input.name(),
            self.join_predicate(),
            out = self.output.name(),
        )
    }

    pub fn update_sql(&self, strategy: UpdateStrategy) -> String {
        match strategy {
            UpdateStrategy::Subquery => self.subquery_update_sql(),
            UpdateStrategy::InnerJoin => self.join_update_sql(),
            UpdateStrategy::Replace => self.replace_into_sql(),
        }
    }
}

/// Copies every row and column of `input` into an empty `output` table.
#[derive(Debug, Clone)]
pub struct SeedTransfer<'a> {
    output: &'a TableDescriptor,
    input: &'a TableDescriptor,
}

impl<'a> SeedTransfer<'a> {
    pub fn new(output: &'a TableDescriptor, input: &'a TableDescriptor) -> Self {
        Self { output, input }
    }

    pub fn output(&self) -> &'a TableDescriptor {
        self.output
    }

    pub fn input(&self) -> &'a TableDescriptor {
        self.input
    }

    /// All of the input table's columns.
    pub fn transfer_fields(&self, qualified: bool) -> ColumnList {
        ColumnList::from_columns(self.input.name(), self.input.all_columns(), qualified)
    }

    /// `INSERT INTO out(cols) SELECT cols FROM in`
    pub fn insert_select_sql(&self) -> String {
        let fields = self.transfer_fields(false);
        format!(
            "INSERT INTO {}({fields}) SELECT {fields} FROM {}",
            self.output.name(),
            self.input.name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn output() -> TableDescriptor {
        TableDescriptor::new("OUTPUT", ["CASEID"], ["CASEID", "H0", "H1", "V001"])
    }

    fn rec43() -> TableDescriptor {
        TableDescriptor::new("REC43", ["CASEID", "HIDX"], ["H1", "H0", "H9"])
    }

    #[test]
    fn test_transfer_fields_filtered_in_request_order() {
        let (out, inp) = (output(), rec43());
        let t = FieldTransfer::new(&out, &inp, ["H1", "MISSING", "H0"]).unwrap();
        assert_eq!(t.transfer_fields(false).into_vec(), ["H1", "H0"]);
        assert_eq!(t.transfer_fields(true).to_string(), "REC43.H1, REC43.H0");
    }

    #[test]
    fn test_transfer_fields_may_include_join_columns() {
        let (out, inp) = (output(), rec43());
        let t = FieldTransfer::new(&out, &inp, ["HIDX", "H0"]).unwrap();
        assert_eq!(t.transfer_fields(false).into_vec(), ["HIDX", "H0"]);
    }

    #[test]
    fn test_subquery_update() {
        let (out, inp) = (output(), rec43());
        let t = FieldTransfer::new(&out, &inp, ["H0", "H1"]).unwrap();
        assert_eq!(
            t.subquery_update_sql(),
            "UPDATE OUTPUT SET \
             H0 = (SELECT H0 FROM REC43 WHERE OUTPUT.CASEID = REC43.CASEID), \
             H1 = (SELECT H1 FROM REC43 WHERE OUTPUT.CASEID = REC43.CASEID)"
        );
    }

    #[test]
    fn test_join_update() {
        let (out, inp) = (output(), rec43());
        let t = FieldTransfer::new(&out, &inp, ["H0", "H1"]).unwrap();
        assert_eq!(
            t.join_update_sql(),
            "UPDATE OUTPUT INNER JOIN REC43 ON OUTPUT.CASEID = REC43.CASEID \
             SET OUTPUT.H0 = REC43.H0, OUTPUT.H1 = REC43.H1"
        );
    }

    #[test]
    fn test_replace_into() {
        let (out, inp) = (output(), rec43());
        let t = FieldTransfer::new(&out, &inp, ["H0", "H1"]).unwrap();
        assert_eq!(
            t.replace_into_sql(),
            "REPLACE INTO OUTPUT(H0, H1) SELECT REC43.H0, REC43.H1 \
             FROM OUTPUT INNER JOIN REC43 ON OUTPUT.CASEID = REC43.CASEID"
        );
    }

    #[test]
    fn test_update_sql_dispatch() {
        let (out, inp) = (output(), rec43());
        let t = FieldTransfer::new(&out, &inp, ["H0"]).unwrap();
        assert_eq!(t.update_sql(UpdateStrategy::Subquery), t.subquery_update_sql());
        assert_eq!(t.update_sql(UpdateStrategy::InnerJoin), t.join_update_sql());
        assert_eq!(t.update_sql(UpdateStrategy::Replace), t.replace_into_sql());
    }

    #[test]
    fn test_household_narrowing_in_subquery() {
        let out = output();
        let household = TableDescriptor::new("RECH0", ["HHID"], ["HV001"]);
        let t = FieldTransfer::new(&out, &household, ["HV001"]).unwrap();
        assert_eq!(
            t.subquery_update_sql(),
            "UPDATE OUTPUT SET HV001 = (SELECT HV001 FROM RECH0 WHERE \
             substr(OUTPUT.CASEID, 1, length(OUTPUT.CASEID)-3) = RECH0.HHID)"
        );
    }

    #[test]
    fn test_no_join_keys_is_an_error() {
        let out = output();
        let loose = TableDescriptor::new("LOOSE", Vec::<String>::new(), ["A"]);
        let err = FieldTransfer::new(&out, &loose, ["A"]).unwrap_err();
        assert!(matches!(err, MergeError::NoJoinKeys { .. }));
        assert!(FieldTransfer::new(&loose, &out, ["H0"]).is_err());
    }

    #[test]
    fn test_seed_copies_all_columns() {
        let out = output();
        let master = TableDescriptor::new("REC01", ["CASEID"], ["V001", "CASEID", "V000"]);
        let seed = SeedTransfer::new(&out, &master);
        assert_eq!(seed.transfer_fields(false).into_vec(), master.all_columns());
        assert_eq!(
            seed.insert_select_sql(),
            "INSERT INTO OUTPUT(CASEID, V000, V001) SELECT CASEID, V000, V001 FROM REC01"
        );
    }

    #[test]
    fn test_seed_without_join_keys() {
        let out = TableDescriptor::new("COPY", Vec::<String>::new(), ["A"]);
        let src = TableDescriptor::new("SRC", Vec::<String>::new(), ["A"]);
        assert_eq!(
            SeedTransfer::new(&out, &src).insert_select_sql(),
            "INSERT INTO COPY(A) SELECT A FROM SRC"
        );
    }
}
