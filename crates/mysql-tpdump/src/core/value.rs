//! Scalar values and their SQL literal encoding.
//!
//! Row cells are represented as a closed tagged variant rather than a
//! runtime-inspected dynamic type: new scalar kinds coming out of the
//! driver must be handled exhaustively at compile time, and anything
//! the encoder cannot render carries its driver type name so the
//! resulting error can point at the offending column.

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::error::{DumpError, Result};

/// A single typed cell read from a row.
///
/// `Unsupported` is a deliberate fallthrough: the source decodes what
/// it can and defers the failure to encode time, where the whole run
/// aborts (a partially malformed script is unacceptable).
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    DateTime(NaiveDateTime),
    /// A value of a type the encoder cannot render; carries the driver
    /// type name for diagnostics.
    Unsupported(String),
}

// Value tuples live in HashSets (the per-table value index), so the
// type must be Eq + Hash. Floats are compared and hashed by bit
// pattern; NaN keys never occur in practice since foreign keys are
// integral or textual.
impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ScalarValue::Null => {}
            ScalarValue::Int(v) => v.hash(state),
            ScalarValue::UInt(v) => v.hash(state),
            ScalarValue::Float(v) => v.to_bits().hash(state),
            ScalarValue::Decimal(v) => v.hash(state),
            ScalarValue::Text(v) => v.hash(state),
            ScalarValue::DateTime(v) => v.hash(state),
            ScalarValue::Unsupported(v) => v.hash(state),
        }
    }
}

impl ScalarValue {
    /// Render this value as a MySQL literal.
    ///
    /// - numerics: decimal text, unquoted
    /// - text: single-quoted with reserved characters escaped
    /// - null: the literal `NULL`
    /// - datetime: `'YYYY-MM-DD HH:MM:SS'`
    ///
    /// `Unsupported` values fail with [`DumpError::UnsupportedValue`].
    pub fn to_sql_literal(&self) -> Result<String> {
        match self {
            ScalarValue::Null => Ok("NULL".to_string()),
            ScalarValue::Int(v) => Ok(v.to_string()),
            ScalarValue::UInt(v) => Ok(v.to_string()),
            ScalarValue::Float(v) => Ok(v.to_string()),
            ScalarValue::Decimal(v) => Ok(v.to_string()),
            ScalarValue::Text(v) => Ok(format!("'{}'", escape_string(v))),
            ScalarValue::DateTime(v) => Ok(v.format("'%Y-%m-%d %H:%M:%S'").to_string()),
            ScalarValue::Unsupported(type_name) => Err(DumpError::UnsupportedValue {
                value: self.to_string(),
                type_name: type_name.clone(),
            }),
        }
    }

    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Int(v) => write!(f, "{}", v),
            ScalarValue::UInt(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => write!(f, "{}", v),
            ScalarValue::Decimal(v) => write!(f, "{}", v),
            ScalarValue::Text(v) => write!(f, "{}", v),
            ScalarValue::DateTime(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            ScalarValue::Unsupported(t) => write!(f, "<{}>", t),
        }
    }
}

/// Escape a string for inclusion in a single-quoted MySQL literal.
///
/// Covers the characters `mysql_real_escape_string` handles: NUL,
/// newline, carriage return, backslash, both quote kinds, and ctrl-Z.
fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\u{1a}' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out
}

// Convenience conversions for fixtures and tests
impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Int(v as i64)
    }
}

impl From<u64> for ScalarValue {
    fn from(v: u64) -> Self {
        ScalarValue::UInt(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Text(v)
    }
}

impl From<NaiveDateTime> for ScalarValue {
    fn from(v: NaiveDateTime) -> Self {
        ScalarValue::DateTime(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    #[test]
    fn test_numeric_literals_unquoted() {
        assert_eq!(ScalarValue::Int(-7).to_sql_literal().unwrap(), "-7");
        assert_eq!(ScalarValue::UInt(42).to_sql_literal().unwrap(), "42");
        assert_eq!(ScalarValue::Float(1.5).to_sql_literal().unwrap(), "1.5");
        assert_eq!(
            ScalarValue::Decimal(Decimal::new(1999, 2))
                .to_sql_literal()
                .unwrap(),
            "19.99"
        );
    }

    #[test]
    fn test_null_literal() {
        assert_eq!(ScalarValue::Null.to_sql_literal().unwrap(), "NULL");
        assert!(ScalarValue::Null.is_null());
    }

    #[test]
    fn test_text_escaping() {
        let v = ScalarValue::Text("O'Brien \\ \"x\"\n".to_string());
        assert_eq!(
            v.to_sql_literal().unwrap(),
            "'O\\'Brien \\\\ \\\"x\\\"\\n'"
        );
    }

    #[test]
    fn test_datetime_fixed_format() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 6)
            .unwrap();
        assert_eq!(
            ScalarValue::DateTime(dt).to_sql_literal().unwrap(),
            "'2024-03-09 14:05:06'"
        );
    }

    #[test]
    fn test_unsupported_is_fatal_and_names_the_type() {
        let err = ScalarValue::Unsupported("BLOB".to_string())
            .to_sql_literal()
            .unwrap_err();
        match err {
            DumpError::UnsupportedValue { type_name, .. } => assert_eq!(type_name, "BLOB"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_tuples_hash_into_sets() {
        let mut set: HashSet<Vec<ScalarValue>> = HashSet::new();
        set.insert(vec![ScalarValue::Int(1), ScalarValue::Text("a".into())]);
        set.insert(vec![ScalarValue::Int(1), ScalarValue::Text("a".into())]);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&vec![ScalarValue::Int(1), ScalarValue::Text("a".into())]));
    }

    #[test]
    fn test_float_hash_by_bits() {
        let mut set: HashSet<Vec<ScalarValue>> = HashSet::new();
        set.insert(vec![ScalarValue::Float(0.5)]);
        assert!(set.contains(&vec![ScalarValue::Float(0.5)]));
        assert!(!set.contains(&vec![ScalarValue::Float(0.25)]));
    }
}
