//! Tabular input data
//!
//! A [`TableSet`] maps table names to [`Table`]s. Rows keep their column
//! order, which drives field order in the generated XML.
//!
//! Tables are loaded from a directory:
//!
//! - `*.xlsx` - every named Excel table of every worksheet; the first row of
//!   the table range is the header and cells keep their types
//! - `<name>.csv` - header row plus data rows; empty cells are null, all
//!   other cells are text
//! - `<name>.json` - an array of flat objects; JSON scalars keep their type

use calamine::{Data, Range, Xlsx, open_workbook};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::value::RawValue;

/// File extensions picked up by [`TableSet::load_dir`]
const TABLE_EXTENSIONS: [&str; 3] = ["xlsx", "csv", "json"];

/// One table row: column name -> raw value, in column order
pub type Row = IndexMap<String, RawValue>;

/// Build a [`Row`] from `(column, value)` pairs
pub fn row<K, V>(cells: impl IntoIterator<Item = (K, V)>) -> Row
where
    K: Into<String>,
    V: Into<RawValue>,
{
    cells
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// A named table with ordered rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// Table name
    pub name: String,

    /// Column names in table order
    pub columns: Vec<String>,

    /// Data rows
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table from rows, deriving columns in order of first appearance
    pub fn from_rows(name: impl Into<String>, rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for r in &rows {
            for key in r.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    /// Whether the table declares a column
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Tables keyed by name, in load order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: IndexMap<String, Table>,
}

impl TableSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any table with the same name
    pub fn insert(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(table.name.clone(), table)
    }

    /// Look up a table by name
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Whether a table with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterate tables in load order
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Table names in load order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Load every table found in `dir`.
    ///
    /// Workbooks contribute their named tables; `*.csv` and `*.json` files are
    /// one table each, named after the file stem. Excel lock files (`~$...`)
    /// are skipped. A table name seen twice is an error.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::ConfigInvalid {
                message: format!("tables directory not found: {}", dir.display()),
            });
        }

        let mut entries: Vec<_> = walkdir::WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| !e.file_name().to_string_lossy().starts_with("~$"))
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| TABLE_EXTENSIONS.contains(&ext))
            })
            .collect();
        entries.sort_by(|a, b| a.path().cmp(b.path()));

        let mut set = Self::new();
        for entry in entries {
            let path = entry.path();
            let tables = if path.extension().is_some_and(|ext| ext == "xlsx") {
                load_workbook_tables(path)?
            } else {
                let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                    tracing::debug!("Skipping file with non UTF-8 name: {}", path.display());
                    continue;
                };
                let contents = std::fs::read_to_string(path)?;
                if path.extension().is_some_and(|ext| ext == "csv") {
                    vec![parse_csv_table(name, &contents)?]
                } else {
                    vec![parse_json_table(name, &contents)?]
                }
            };

            for table in tables {
                if set.contains(&table.name) {
                    return Err(Error::TableLoad {
                        message: format!("duplicate table in {}", path.display()),
                        table: table.name,
                    });
                }
                tracing::debug!(
                    "Loaded table '{}' ({} columns, {} rows)",
                    table.name,
                    table.columns.len(),
                    table.len()
                );
                set.insert(table);
            }
        }
        Ok(set)
    }
}

impl FromIterator<Table> for TableSet {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut set = Self::new();
        for table in iter {
            set.insert(table);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TableSet {
    type Item = &'a Table;
    type IntoIter = indexmap::map::Values<'a, String, Table>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.values()
    }
}

/// Load every named table of an `.xlsx` workbook, in workbook order
pub fn load_workbook_tables(path: impl AsRef<Path>) -> Result<Vec<Table>> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    workbook.load_tables()?;

    let names: Vec<String> = workbook.table_names().into_iter().cloned().collect();
    tracing::debug!("Workbook {} has {} tables", path.display(), names.len());

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let excel_table = workbook.table_by_name(&name)?;
        tables.push(workbook_table(
            &name,
            excel_table.columns(),
            excel_table.data(),
        ));
    }
    Ok(tables)
}

fn workbook_table(name: &str, columns: &[String], data: &Range<Data>) -> Table {
    let mut table = Table::new(name, columns.to_vec());
    for cells in data.rows() {
        let r = table
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let value = cells.get(i).map(workbook_cell).unwrap_or_default();
                (column.clone(), value)
            })
            .collect();
        table.rows.push(r);
    }
    table
}

fn workbook_cell(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Null,
        Data::Bool(b) => RawValue::Bool(*b),
        Data::Int(i) => RawValue::Int(*i),
        Data::Float(f) => RawValue::Float(*f),
        Data::String(s) => RawValue::Text(s.clone()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(RawValue::DateTime)
            .unwrap_or_else(|| RawValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) => {
            if let Ok(dt) = s.parse::<NaiveDateTime>() {
                RawValue::DateTime(dt)
            } else if let Ok(d) = s.parse::<NaiveDate>() {
                RawValue::Date(d)
            } else {
                RawValue::Text(s.clone())
            }
        }
        Data::DurationIso(s) => RawValue::Text(s.clone()),
        // Cached error values as shown in the sheet (`#N/A`, `#REF!`)
        Data::Error(e) => RawValue::Text(e.to_string()),
    }
}

/// Parse CSV text into a table; the first record is the header row
pub fn parse_csv_table(name: &str, contents: &str) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(contents.as_bytes());
    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut table = Table::new(name, columns);
    for record in reader.records() {
        let record = record?;
        let mut r = Row::with_capacity(table.columns.len());
        for (i, column) in table.columns.iter().enumerate() {
            let value = match record.get(i) {
                Some("") | None => RawValue::Null,
                Some(cell) => RawValue::Text(cell.to_string()),
            };
            r.insert(column.clone(), value);
        }
        table.rows.push(r);
    }
    Ok(table)
}

/// Parse a JSON array of flat objects into a table
pub fn parse_json_table(name: &str, contents: &str) -> Result<Table> {
    let doc: serde_json::Value = serde_json::from_str(contents)?;
    let items = doc.as_array().ok_or_else(|| Error::TableLoad {
        table: name.to_string(),
        message: "expected a JSON array of objects".to_string(),
    })?;

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| Error::TableLoad {
            table: name.to_string(),
            message: format!("row {index} is not a JSON object"),
        })?;
        let mut r = Row::with_capacity(obj.len());
        for (column, value) in obj {
            r.insert(column.clone(), json_cell(name, column, value)?);
        }
        rows.push(r);
    }
    Ok(Table::from_rows(name, rows))
}

fn json_cell(table: &str, column: &str, value: &serde_json::Value) -> Result<RawValue> {
    use serde_json::Value;

    Ok(match value {
        Value::Null => RawValue::Null,
        Value::Bool(b) => RawValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => RawValue::Int(i),
            None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => RawValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            return Err(Error::TableLoad {
                table: table.to_string(),
                message: format!("column '{column}' holds a nested value"),
            });
        }
    })
}
