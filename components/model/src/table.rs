use std::fmt::{self, Display, Formatter};

use strum_macros::{Display as StrumDisplay, EnumString};

/// Literal marking a partition without an upper bound.
pub const MAX_VALUE: &str = "MAXVALUE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, StrumDisplay)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColumnType {
    Int,
    Varchar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,

    /// Position of the column within a row.
    pub offset: usize,

    pub ty: ColumnType,
}

impl ColumnInfo {
    pub fn new(name: &str, offset: usize, ty: ColumnType) -> Self {
        Self {
            name: name.to_owned(),
            offset,
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    pub id: i64,
    pub name: String,

    /// Offsets of the indexed columns, in index key order.
    pub columns: Vec<usize>,

    pub unique: bool,
}

/// Upper bound of a range partition, as declared by `VALUES LESS THAN (...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Boundary {
    LessThan(String),
    MaxValue,
}

impl Boundary {
    /// Parse the declared boundary text. `MAXVALUE` is matched case-insensitively.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case(MAX_VALUE) {
            Boundary::MaxValue
        } else {
            Boundary::LessThan(text.to_owned())
        }
    }

    pub fn is_max_value(&self) -> bool {
        matches!(self, Boundary::MaxValue)
    }
}

impl Display for Boundary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::LessThan(text) => write!(f, "{}", text),
            Boundary::MaxValue => write!(f, "{}", MAX_VALUE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionDefinition {
    /// Unique within the table. Doubles as the key prefix of the partition's storage region.
    pub id: i64,

    pub name: String,

    pub less_than: Boundary,
}

impl PartitionDefinition {
    pub fn new(id: i64, name: &str, less_than: Boundary) -> Self {
        Self {
            id,
            name: name.to_owned(),
            less_than,
        }
    }
}

/// Range partitioning clause of a table, e.g.
///
/// ```text
/// PARTITION BY RANGE (amount) (
///     PARTITION p0 VALUES LESS THAN (100),
///     PARTITION p1 VALUES LESS THAN (200),
///     PARTITION p2 VALUES LESS THAN MAXVALUE)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    /// Partition key expression.
    pub expr: String,

    /// Partition definitions in declaration order.
    pub definitions: Vec<PartitionDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub id: i64,
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub indices: Vec<IndexInfo>,

    /// Offset of the integer primary key column that is used as row handle, if any.
    pub pk_is_handle: Option<usize>,

    pub partition: Option<PartitionInfo>,
}

impl TableInfo {
    pub fn new(id: i64, name: &str, columns: Vec<ColumnInfo>) -> Self {
        Self {
            id,
            name: name.to_owned(),
            columns,
            indices: vec![],
            pk_is_handle: None,
            partition: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<IndexInfo>) -> Self {
        self.indices = indices;
        self
    }

    pub fn with_pk_is_handle(mut self, offset: usize) -> Self {
        self.pk_is_handle = Some(offset);
        self
    }

    pub fn with_partition(mut self, partition: PartitionInfo) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn partition_info(&self) -> Option<&PartitionInfo> {
        self.partition.as_ref()
    }

    /// Find a column by name, case-insensitively.
    pub fn find_column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns
            .iter()
            .find(|column| column.name.eq_ignore_ascii_case(name))
    }
}
