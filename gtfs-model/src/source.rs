//! Provenance of the records: which table, which line, what was written there
use crate::reader::DataRow;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::OnceCell;
use std::fmt;
use std::sync::Arc;

/// A line of a table of the feed
///
/// Lines are 1-based and count the header: the first data row is line 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceRef {
    /// File name of the table, e.g. `stop_times.txt`
    pub table: &'static str,
    /// Line number in that file
    pub line: u64,
}

impl SourceRef {
    /// Creates a new reference
    pub fn new(table: &'static str, line: u64) -> Self {
        Self { table, line }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.line)
    }
}

/// Column names of a table, shared by all its rows
#[derive(Debug, Default)]
pub struct TableHeaders {
    names: Vec<String>,
    index: FxHashMap<String, usize>,
}

impl TableHeaders {
    /// Indexes the header line of a table
    pub fn new(names: Vec<String>) -> Self {
        let mut index = FxHashMap::default();
        for (i, name) in names.iter().enumerate() {
            // On duplicated columns the first one wins, the loader reports the duplicate
            index.entry(name.clone()).or_insert(i);
        }
        Self { names, index }
    }

    /// The column names, in file order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a column
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// True if the table has this column
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }
}

/// Raw strings of a row, kept for diagnostics only
#[derive(Debug, Clone, Default)]
pub struct SourceInfo {
    /// Header of the table the row comes from
    pub headers: Arc<TableHeaders>,
    /// Values of the row, in column order
    pub fields: Vec<String>,
}

impl SourceInfo {
    /// Raw value of a column, `None` if the column or the value is absent
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .position(column)
            .and_then(|i| self.fields.get(i))
            .map(String::as_str)
    }

    /// `column=value` pairs, used when printing an issue
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.headers
            .names()
            .iter()
            .zip(&self.fields)
            .map(|(h, v)| (h.clone(), v.clone()))
            .collect()
    }
}

/// What travels with a record from the row provider to the DAO and the validators
///
/// The raw values are only copied into a [SourceInfo] when an issue needs them.
#[derive(Debug, Clone)]
pub struct SourceContext<'a> {
    /// Where the row is
    pub source_ref: SourceRef,
    row: Option<&'a DataRow>,
    info: OnceCell<Arc<SourceInfo>>,
}

impl<'a> SourceContext<'a> {
    /// A context without raw values
    pub fn new(source_ref: SourceRef) -> Self {
        Self {
            source_ref,
            row: None,
            info: OnceCell::new(),
        }
    }

    /// The context of a row, reusing `info` if the raw values were already copied
    pub fn of_row(row: &'a DataRow, info: Option<Arc<SourceInfo>>) -> Self {
        let cell = OnceCell::new();
        if let Some(info) = info {
            let _ = cell.set(info);
        }
        Self {
            source_ref: row.source_ref,
            row: Some(row),
            info: cell,
        }
    }

    /// Table the row belongs to
    pub fn table(&self) -> &'static str {
        self.source_ref.table
    }

    /// Line of the row
    pub fn line(&self) -> u64 {
        self.source_ref.line
    }

    /// Raw value of a column, read without copying the row
    pub fn get(&self, column: &str) -> Option<&str> {
        match self.row {
            Some(row) => row.get(column),
            None => self.info.get().and_then(|info| info.get(column)),
        }
    }

    /// What the row contained, copied on the first call
    pub fn source_info(&self) -> Arc<SourceInfo> {
        Arc::clone(self.info.get_or_init(|| {
            Arc::new(self.row.map(DataRow::source_info).unwrap_or_default())
        }))
    }
}
