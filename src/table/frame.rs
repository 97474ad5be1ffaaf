//! Column-oriented in-memory table with a named row index.

use crate::table::Value;
use crate::{Error, Result};

use indexmap::IndexMap;

/// One loaded record: column name to cell, in file order.
pub type Record = IndexMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    index_name: Option<String>,
    index: Vec<Value>,
    columns: IndexMap<String, Vec<Value>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from named columns of equal length. The index is the row position.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<Value>)>,
        S: Into<String>,
    {
        let mut out: IndexMap<String, Vec<Value>> = IndexMap::new();
        let mut n_rows: Option<usize> = None;
        for (name, values) in columns {
            let name = name.into();
            match n_rows {
                Some(n) if n != values.len() => {
                    return Err(Error::ShapeMismatch(format!(
                        "column '{}' has {} rows, expected {}",
                        name,
                        values.len(),
                        n
                    )));
                }
                _ => n_rows = Some(values.len()),
            }
            out.insert(name, values);
        }

        let n = n_rows.unwrap_or(0);
        Ok(Self {
            index_name: None,
            index: (0..n as i64).map(Value::Int).collect(),
            columns: out,
        })
    }

    /// Build a table from loaded records.
    ///
    /// Columns appear in first-seen order; a record missing a column gets a
    /// null cell. When `index_column` is given it is moved out of the columns
    /// and becomes the named row index.
    pub fn from_records(records: Vec<Record>, index_column: Option<&str>) -> Result<Self> {
        let n = records.len();
        let mut columns: IndexMap<String, Vec<Value>> = IndexMap::new();
        for (row, record) in records.into_iter().enumerate() {
            for (name, value) in record {
                let cells = columns
                    .entry(name)
                    .or_insert_with(|| vec![Value::Null; n]);
                cells[row] = value;
            }
        }

        let mut table = Self {
            index_name: None,
            index: (0..n as i64).map(Value::Int).collect(),
            columns,
        };

        if let Some(name) = index_column {
            let index = table
                .columns
                .shift_remove(name)
                .ok_or_else(|| Error::ColumnNotFound(name.to_string()))?;
            table.index = index;
            table.index_name = Some(name.to_string());
        }

        Ok(table)
    }

    pub fn with_index(mut self, name: impl Into<String>, index: Vec<Value>) -> Result<Self> {
        if index.len() != self.n_rows() {
            return Err(Error::ShapeMismatch(format!(
                "index has {} entries, table has {} rows",
                index.len(),
                self.n_rows()
            )));
        }
        self.index = index;
        self.index_name = Some(name.into());
        Ok(self)
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn index(&self) -> &[Value] {
        &self.index
    }

    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    pub fn set_index_name(&mut self, name: Option<String>) {
        self.index_name = name;
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    pub fn require_column(&self, name: &str) -> Result<&[Value]> {
        self.column(name)
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Insert a column at `position` (clamped to the column count).
    pub fn insert_column(
        &mut self,
        position: usize,
        name: impl Into<String>,
        values: Vec<Value>,
    ) -> Result<()> {
        let name = name.into();
        if values.len() != self.n_rows() {
            return Err(Error::ShapeMismatch(format!(
                "column '{}' has {} rows, table has {}",
                name,
                values.len(),
                self.n_rows()
            )));
        }
        if self.columns.contains_key(&name) {
            return Err(Error::ShapeMismatch(format!("column '{}' already exists", name)));
        }
        let position = position.min(self.columns.len());
        self.columns.shift_insert(position, name, values);
        Ok(())
    }

    /// Insert a column holding `value` in every row.
    pub fn insert_constant(
        &mut self,
        position: usize,
        name: impl Into<String>,
        value: Value,
    ) -> Result<()> {
        let values = vec![value; self.n_rows()];
        self.insert_column(position, name, values)
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Value>> {
        self.columns.shift_remove(name)
    }

    /// Keep the rows whose mask entry is true.
    pub fn select(&self, mask: &[bool]) -> Table {
        let keep = |cells: &[Value]| -> Vec<Value> {
            cells
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(v, _)| v.clone())
                .collect()
        };

        Table {
            index_name: self.index_name.clone(),
            index: keep(&self.index),
            columns: self
                .columns
                .iter()
                .map(|(name, cells)| (name.clone(), keep(cells)))
                .collect(),
        }
    }

    /// Row-wise concatenation.
    ///
    /// Columns are the union of all inputs in first-seen order; cells a table
    /// does not provide are null. The index name survives only when every
    /// input agrees on it.
    pub fn concat(tables: Vec<Table>) -> Table {
        let mut names: Vec<String> = Vec::new();
        for table in &tables {
            for name in table.columns.keys() {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }

        let index_name = match tables.first() {
            Some(first) if tables.iter().all(|t| t.index_name == first.index_name) => {
                first.index_name.clone()
            }
            _ => None,
        };

        let mut index = Vec::new();
        let mut columns: IndexMap<String, Vec<Value>> =
            names.into_iter().map(|n| (n, Vec::new())).collect();

        for table in tables {
            let n = table.n_rows();
            index.extend(table.index);
            let mut own = table.columns;
            for (name, cells) in columns.iter_mut() {
                match own.shift_remove(name) {
                    Some(values) => cells.extend(values),
                    None => cells.extend(std::iter::repeat_n(Value::Null, n)),
                }
            }
        }

        Table {
            index_name,
            index,
            columns,
        }
    }

    /// Row `i` as a record; a named index is emitted as the first field.
    pub fn row(&self, i: usize) -> Option<Record> {
        if i >= self.n_rows() {
            return None;
        }
        let mut record = Record::new();
        if let Some(name) = &self.index_name {
            record.insert(name.clone(), self.index[i].clone());
        }
        for (name, cells) in &self.columns {
            record.insert(name.clone(), cells[i].clone());
        }
        Some(record)
    }

    pub fn to_records(&self) -> Vec<Record> {
        (0..self.n_rows()).filter_map(|i| self.row(i)).collect()
    }
}
