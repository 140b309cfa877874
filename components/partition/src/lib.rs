//! Range partitioning of tables.
//!
//! A table declared with `PARTITION BY RANGE` is composed of one physical table per
//! partition. [`PartitionedTable`] hides them behind the generic [`table::Table`] capability:
//!
//! - [`generate_partition_expr`] compiles the partition clause into two parallel lists of
//!   predicates, `upper_bounds` for locating rows and `ranges` for pruning;
//! - [`PartitionExpr::search`] binary searches `upper_bounds` for the partition owning a row;
//! - [`PartitionRegistry`] maps partition ids to physical tables;
//! - [`PartitionedTable`] routes add, remove and update to the right partitions, moving a row
//!   across partitions when an update changes its partition key.

pub mod expr;
pub mod observer;
pub mod partitioned;
pub mod registry;

mod locate;
#[cfg(test)]
mod test_util;

pub use crate::expr::{generate_partition_expr, PartitionExpr};
pub use crate::observer::{LogObserver, Observer};
pub use crate::partitioned::PartitionedTable;
pub use crate::registry::{MemTableBuilder, PartitionBuilder, PartitionRegistry};

#[cfg(any(test, feature = "mock"))]
pub use crate::observer::MockObserver;
