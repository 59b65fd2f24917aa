use serde_json::{Map, Value};

/// Text stored in a cell when the database returned SQL NULL.
pub const NULL_SENTINEL: &str = "NULL";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    #[must_use]
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        column_index(&self.columns, name)
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|values| values.get(column))
            .map(String::as_str)
    }

    /// First cell of the first row, used by scalar queries such as `COUNT(*)`.
    #[must_use]
    pub fn scalar(&self) -> Option<&str> {
        self.cell(0, 0)
    }

    /// First column of every row, for catalog queries that return a name list.
    #[must_use]
    pub fn first_column(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.first().cloned())
            .collect()
    }

    /// Pretty-printed JSON object for one row, keyed by column name. NULL
    /// cells become JSON `null`.
    #[must_use]
    pub fn row_as_json(&self, index: usize) -> Option<String> {
        let row = self.rows.get(index)?;
        let mut object = Map::new();
        for (column, value) in self.columns.iter().zip(row) {
            let value = if is_null(value) {
                Value::Null
            } else {
                Value::String(value.clone())
            };
            object.insert(column.clone(), value);
        }
        serde_json::to_string_pretty(&Value::Object(object)).ok()
    }
}

#[must_use]
pub fn is_null(value: &str) -> bool {
    value == NULL_SENTINEL
}

/// Case-insensitive, matching how the catalogs report column names in a
/// different case than the query text sometimes does.
#[must_use]
pub fn column_index(columns: &[String], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|column| column == name)
        .or_else(|| {
            columns
                .iter()
                .position(|column| column.eq_ignore_ascii_case(name))
        })
}
