//! Generic table capability shared by ordinary tables, partitions and partitioned tables.

pub mod allocator;
pub mod context;
pub mod mem;
pub mod option;

pub use crate::allocator::HandleAllocator;
pub use crate::context::SessionContext;
pub use crate::mem::MemTable;
pub use crate::option::AddRecordOptions;

#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use model::{error::TableError, Datum, Handle};

/// Row-level mutations of a table.
///
/// Implementations use interior mutability so that a table can be shared by concurrent
/// sessions, each supplying its own [`SessionContext`].
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait Table: Send + Sync {
    /// Insert `row` and return the handle assigned to it.
    fn add_record(
        &self,
        ctx: &mut SessionContext,
        row: &[Datum],
        options: AddRecordOptions,
    ) -> Result<Handle, TableError>;

    /// Remove the record identified by `handle`, whose current content is `row`.
    fn remove_record(
        &self,
        ctx: &mut SessionContext,
        handle: Handle,
        row: &[Datum],
    ) -> Result<(), TableError>;

    /// Replace `old_row` of record `handle` with `new_row`.
    ///
    /// `touched` flags which columns are really modified and is used to maintain
    /// secondary indices. Its length equals the number of columns.
    fn update_record(
        &self,
        ctx: &mut SessionContext,
        handle: Handle,
        old_row: &[Datum],
        new_row: &[Datum],
        touched: &[bool],
    ) -> Result<(), TableError>;

    /// Identifier of the physical storage region holding the rows, which is also the
    /// prefix of their record keys.
    fn id(&self) -> i64;
}
