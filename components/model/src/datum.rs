use std::fmt::{self, Display, Formatter};

/// Identifier of a row within a table. Handles stay unique across all partitions of a
/// partitioned table since partitions share the parent's allocator.
pub type Handle = i64;

/// A row is an ordered sequence of values matching the column schema of its table.
pub type Row = Vec<Datum>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Datum {
    Null,
    Int(i64),
    Str(String),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Datum::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Int(value)
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Str(value.to_owned())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Str(value)
    }
}

impl<T> From<Option<T>> for Datum
where
    T: Into<Datum>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Datum::Null,
        }
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Int(v) => write!(f, "{}", v),
            Datum::Str(s) => write!(f, "'{}'", s),
        }
    }
}

/// Render a row for diagnostics, e.g. `(1, 'abc', NULL)`.
pub fn display_row(row: &[Datum]) -> String {
    let items: Vec<String> = row.iter().map(|d| d.to_string()).collect();
    format!("({})", items.join(", "))
}
