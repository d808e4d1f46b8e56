//! The relational connection seam.
//!
//! The engine issues one statement at a time against a single connection and
//! blocks until it completes. Credentials and connection setup are the
//! caller's responsibility; any backend that can execute MySQL-flavored SQL
//! and list a table's columns can implement [`Connection`].

use crate::error::Error;

/// A loosely typed SQL scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A signed integer.
    Int(i64),
    /// A string value (timestamps arrive here in their rendered form).
    Text(String),
    /// SQL NULL.
    Null,
}

impl Value {
    /// Interpret the value as an integer, parsing text if needed.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(s) => s.parse().ok(),
            Value::Null => None,
        }
    }

    /// Borrow the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// One result row: an ordered sequence of values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    /// Create a row from its values.
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// The first value, if any.
    pub fn first(&self) -> Option<&Value> {
        self.0.first()
    }

    /// The value at `idx`, if present.
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.0.get(idx)
    }

    /// All values in order.
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

/// Execute/query primitives plus schema introspection.
///
/// Implementations report the affected row count from `execute`; the bulk
/// copy loop uses it to detect source exhaustion.
pub trait Connection {
    /// Execute a mutating statement; returns the affected row count.
    fn execute(&mut self, sql: &str) -> Result<u64, Error>;

    /// Run a read-only query.
    fn query(&mut self, sql: &str) -> Result<Vec<Row>, Error>;

    /// List the column names of a table, in schema order.
    fn columns(&mut self, table: &str) -> Result<Vec<String>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_as_i64() {
        assert_eq!(Value::Int(42).as_i64(), Some(42));
        assert_eq!(Value::Text("42".to_string()).as_i64(), Some(42));
        assert_eq!(Value::Text("nope".to_string()).as_i64(), None);
        assert_eq!(Value::Null.as_i64(), None);
    }

    #[test]
    fn test_value_as_text() {
        assert_eq!(Value::Text("a".to_string()).as_text(), Some("a"));
        assert_eq!(Value::Int(1).as_text(), None);
        assert_eq!(Value::Null.as_text(), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(7).to_string(), "7");
        assert_eq!(
            Value::Text("2026-01-01 00:00:00".to_string()).to_string(),
            "2026-01-01 00:00:00"
        );
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_row_access() {
        let row = Row::new(vec![Value::Int(1), Value::Null]);
        assert_eq!(row.first(), Some(&Value::Int(1)));
        assert!(row.get(1).map(Value::is_null).unwrap_or(false));
        assert_eq!(row.get(2), None);
    }
}
