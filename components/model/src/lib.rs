pub mod codec;
pub mod datum;
pub mod error;
pub mod table;

pub use crate::datum::{Datum, Handle, Row};
pub use crate::table::{
    Boundary, ColumnInfo, ColumnType, IndexInfo, PartitionDefinition, PartitionInfo, TableInfo,
};
