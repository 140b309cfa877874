//! Reporting of failures that must not go unnoticed.
//!
//! A broken partition expression can stall schema changes without any other visible
//! symptom, and a half-done cross-partition move leaves a record in two partitions until the
//! enclosing transaction rolls back. Both are reported through an [`Observer`] that is
//! injected into the partitioned table.

use log::error;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use model::{
    error::{PartitionError, TableError},
    Handle,
};

#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait Observer: Send + Sync {
    /// A partitioned table named `table` failed to load.
    fn on_load_error(&self, table: &str, error: &PartitionError);

    /// Record `handle` was added to partition `to` but could not be removed from `from`.
    fn on_migration_error(&self, handle: Handle, from: i64, to: i64, error: &TableError);
}

/// Default observer, writing to the `log` facade at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn on_load_error(&self, table: &str, error: &PartitionError) {
        match error {
            PartitionError::Compile { expr, source } => {
                error!(
                    "Wrong table partition expression of table `{}`: {}, expression: {}",
                    table, source, expr
                );
            }
            _ => {
                error!("Failed to load partitioned table `{}`: {}", table, error);
            }
        }
    }

    fn on_migration_error(&self, handle: Handle, from: i64, to: i64, error: &TableError) {
        error!(
            "Partition update record error, it may write dirty data to txn. handle={}, from-partition={}, to-partition={}: {}",
            handle, from, to, error
        );
    }
}
