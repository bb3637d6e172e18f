//! Per-table column selection
//!
//! Projects choose which tables and columns reach the document through the
//! `columns` map of `cmtpack.yaml`:
//!
//! ```yaml
//! columns:
//!   contact: []                     # every column
//!   account: [name, accountid]      # only these, in this order
//!   appointment: ["-description"]   # everything except these
//! ```
//!
//! An empty map keeps every table. The primary-key column always survives
//! when the table has one. Kept values are replaced by their canonical text.

use std::collections::HashMap;

use crate::diagnostics::{Diagnostics, Warning};
use crate::schema::SchemaIndex;
use crate::table::{Row, Table, TableSet};
use crate::value::RawValue;

const EXCLUDE_PREFIX: char = '-';

/// Parsed column selection for one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRule {
    /// Keep every column
    All,
    /// Keep only these columns, in this order
    Include(Vec<String>),
    /// Keep every column except these
    Exclude(Vec<String>),
}

impl ColumnRule {
    /// Interpret a configured column list.
    ///
    /// Exclusion only applies when every entry is `-`-prefixed; in a mixed
    /// list the `-` entries are dropped and the rest are included.
    pub fn parse(selection: &[String]) -> Self {
        if selection.is_empty() {
            return Self::All;
        }
        if selection.iter().all(|c| c.starts_with(EXCLUDE_PREFIX)) {
            return Self::Exclude(
                selection
                    .iter()
                    .map(|c| c[EXCLUDE_PREFIX.len_utf8()..].to_string())
                    .collect(),
            );
        }
        Self::Include(
            selection
                .iter()
                .filter(|c| !c.starts_with(EXCLUDE_PREFIX))
                .cloned()
                .collect(),
        )
    }

    /// Columns of `table` selected by this rule, in output order
    pub fn select(&self, table: &Table) -> Vec<String> {
        match self {
            Self::All => table.columns.clone(),
            Self::Exclude(excluded) => table
                .columns
                .iter()
                .filter(|c| !excluded.contains(c))
                .cloned()
                .collect(),
            Self::Include(included) => included
                .iter()
                .filter(|c| table.has_column(c))
                .cloned()
                .collect(),
        }
    }
}

/// Primary-key column of a table: the schema's for known entities,
/// `<table>id` otherwise
pub fn primary_key_column(schema: &SchemaIndex, table: &str) -> String {
    schema
        .entity(table)
        .map(|e| e.primary_key.clone())
        .unwrap_or_else(|| format!("{table}id"))
}

/// Apply the configured column selection to every table.
///
/// Returned tables keep load order and carry text values only.
pub fn filter_tables(
    tables: &TableSet,
    columns: &HashMap<String, Vec<String>>,
    schema: &SchemaIndex,
    diagnostics: &mut Diagnostics,
) -> TableSet {
    let include_all = columns.is_empty();
    let mut filtered = TableSet::new();

    for table in tables {
        let selection: &[String] = match columns.get(&table.name) {
            Some(selection) => selection.as_slice(),
            None if include_all => &[],
            None => {
                tracing::debug!("Skipping table '{}': not listed in columns", table.name);
                continue;
            }
        };

        let mut selected = ColumnRule::parse(selection).select(table);
        let primary_key = primary_key_column(schema, &table.name);
        if table.has_column(&primary_key) && !selected.contains(&primary_key) {
            selected.push(primary_key);
        }

        if selected.is_empty() {
            diagnostics.warn(Warning::NoColumnsSelected {
                table: table.name.clone(),
            });
            continue;
        }

        tracing::debug!(
            "Table '{}': {} columns, {} rows",
            table.name,
            selected.len(),
            table.len()
        );
        filtered.insert(project(table, selected));
    }

    filtered
}

fn project(table: &Table, columns: Vec<String>) -> Table {
    let rows = table
        .rows
        .iter()
        .map(|source| {
            columns
                .iter()
                .map(|c| {
                    let text = source.get(c).map(RawValue::to_canonical).unwrap_or_default();
                    (c.clone(), RawValue::Text(text))
                })
                .collect::<Row>()
        })
        .collect();

    Table {
        name: table.name.clone(),
        columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row;
    use rstest::rstest;

    fn contacts() -> Table {
        Table::from_rows(
            "contact",
            vec![
                row([
                    ("firstname", RawValue::from("Ada")),
                    ("lastname", RawValue::from("Lovelace")),
                    ("age", RawValue::Float(36.0)),
                    ("contactid", RawValue::from("C1")),
                ]),
                row([
                    ("firstname", RawValue::Null),
                    ("lastname", RawValue::from("Hopper")),
                    ("age", RawValue::Int(85)),
                    ("contactid", RawValue::from("C2")),
                ]),
            ],
        )
    }

    fn selection(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case(&[], &["firstname", "lastname", "age", "contactid"])]
    #[case(&["-age", "-firstname"], &["lastname", "contactid"])]
    #[case(&["lastname", "firstname"], &["lastname", "firstname", "contactid"])]
    #[case(&["lastname", "-age", "missing"], &["lastname", "contactid"])]
    #[case(&["contactid", "age"], &["contactid", "age"])]
    fn test_column_selection(#[case] rule: &[&str], #[case] expected: &[&str]) {
        let tables: TableSet = [contacts()].into_iter().collect();
        let columns = HashMap::from([("contact".to_string(), selection(rule))]);
        let mut diagnostics = Diagnostics::new();

        let filtered = filter_tables(&tables, &columns, &SchemaIndex::new(), &mut diagnostics);

        let table = filtered.get("contact").unwrap();
        assert_eq!(table.columns, selection(expected));
        let first_row_columns: Vec<_> = table.rows[0].keys().cloned().collect();
        assert_eq!(first_row_columns, selection(expected));
    }

    #[test]
    fn test_values_become_canonical_text() {
        let tables: TableSet = [contacts()].into_iter().collect();
        let mut diagnostics = Diagnostics::new();

        let filtered =
            filter_tables(&tables, &HashMap::new(), &SchemaIndex::new(), &mut diagnostics);

        let rows = &filtered.get("contact").unwrap().rows;
        assert_eq!(rows[0]["age"], RawValue::from("36"));
        assert_eq!(rows[1]["age"], RawValue::from("85"));
        assert_eq!(rows[1]["firstname"], RawValue::from(""));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_unlisted_tables_skipped() {
        let accounts = Table::from_rows("account", vec![row([("accountid", "A1")])]);
        let tables: TableSet = [contacts(), accounts].into_iter().collect();
        let columns = HashMap::from([("account".to_string(), Vec::new())]);
        let mut diagnostics = Diagnostics::new();

        let filtered = filter_tables(&tables, &columns, &SchemaIndex::new(), &mut diagnostics);
        assert!(!filtered.contains("contact"));
        assert!(filtered.contains("account"));
    }

    #[test]
    fn test_schema_primary_key_kept() {
        let mut schema = SchemaIndex::new();
        schema.add_entity("contact", "Contact", "lastname");
        let tables: TableSet = [contacts()].into_iter().collect();
        let columns = HashMap::from([("contact".to_string(), selection(&["firstname"]))]);
        let mut diagnostics = Diagnostics::new();

        let filtered = filter_tables(&tables, &columns, &schema, &mut diagnostics);
        assert_eq!(
            filtered.get("contact").unwrap().columns,
            selection(&["firstname", "lastname"])
        );
    }

    #[test]
    fn test_empty_selection_drops_table() {
        let notes = Table::from_rows("note", vec![row([("text", "hello")])]);
        let tables: TableSet = [notes].into_iter().collect();
        let columns = HashMap::from([("note".to_string(), selection(&["subject"]))]);
        let mut diagnostics = Diagnostics::new();

        let filtered = filter_tables(&tables, &columns, &SchemaIndex::new(), &mut diagnostics);
        assert!(filtered.is_empty());
        assert_eq!(
            diagnostics.warnings(),
            &[Warning::NoColumnsSelected {
                table: "note".to_string()
            }]
        );
    }

    #[rstest]
    #[case(&[], ColumnRule::All)]
    #[case(&["-a"], ColumnRule::Exclude(vec!["a".to_string()]))]
    #[case(&["a", "-b"], ColumnRule::Include(vec!["a".to_string()]))]
    fn test_rule_parse(#[case] items: &[&str], #[case] expected: ColumnRule) {
        assert_eq!(ColumnRule::parse(&selection(items)), expected);
    }
}
