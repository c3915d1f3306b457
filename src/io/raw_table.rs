//! Column-named tables handed over by the cleaning layer
//!
//! A `RawTable` is a list of JSON records with a known column set. It is the
//! only shape the engine accepts from outside: typed events and lookup tables
//! are built from it by `io::ingest` after the required columns are checked.

use crate::error::{FunnelError, FunnelResult};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl RawTable {
    /// Empty table with a fixed column set
    pub fn new(columns: &[&str]) -> Self {
        Self { columns: columns.iter().map(|c| c.to_string()).collect(), rows: Vec::new() }
    }

    /// Append a row; values are matched to columns by position
    pub fn push_row(&mut self, values: Vec<Value>) {
        let row = self.columns.iter().cloned().zip(values).collect();
        self.rows.push(row);
    }

    /// Parse a JSON array of objects
    pub fn from_json_records(json_str: &str) -> FunnelResult<Self> {
        let value: Value = serde_json::from_str(json_str).map_err(|e| FunnelError::Parse {
            context: "json records".to_string(),
            message: e.to_string(),
        })?;

        let Value::Array(items) = value else {
            return Err(FunnelError::Parse {
                context: "json records".to_string(),
                message: "expected a top-level array".to_string(),
            });
        };

        let mut table = Self::default();
        for (i, item) in items.into_iter().enumerate() {
            table.push_record(item, i)?;
        }
        Ok(table)
    }

    /// Parse JSON Lines (one object per line, blank lines skipped)
    pub fn from_json_lines(text: &str) -> FunnelResult<Self> {
        let mut table = Self::default();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let item: Value = serde_json::from_str(line).map_err(|e| FunnelError::Parse {
                context: format!("json line {}", i + 1),
                message: e.to_string(),
            })?;
            table.push_record(item, i)?;
        }
        Ok(table)
    }

    fn push_record(&mut self, item: Value, index: usize) -> FunnelResult<()> {
        let Value::Object(record) = item else {
            return Err(FunnelError::Parse {
                context: format!("record {}", index + 1),
                message: "expected a JSON object".to_string(),
            });
        };
        for key in record.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(record);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fail on the first required column that is absent
    pub fn require_columns(&self, table: &str, required: &[&str]) -> FunnelResult<()> {
        match required.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(FunnelError::schema(table, missing)),
            None => Ok(()),
        }
    }
}

/// Cell as a trimmed, non-empty string; numbers are rendered as text
pub fn cell_str(row: &Map<String, Value>, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Cell as a finite number; numeric strings are accepted
pub fn cell_f64(row: &Map<String, Value>, column: &str) -> Option<f64> {
    let value = match row.get(column)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// True when the cell is absent, null or a blank string
pub fn cell_is_blank(row: &Map<String, Value>, column: &str) -> bool {
    match row.get(column) {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}
