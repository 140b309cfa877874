use std::sync::Arc;

use log::{debug, info};
use model::{
    error::{PartitionError, TableError},
    Datum, Handle, TableInfo,
};
use table::{AddRecordOptions, HandleAllocator, SessionContext, Table};

use crate::{
    expr::{generate_partition_expr, PartitionExpr},
    locate::locate_partition,
    observer::Observer,
    registry::{PartitionBuilder, PartitionRegistry},
};

/// A table partitioned by range, composed of one physical table per partition.
///
/// It implements [`Table`] by routing every row to the partition owning it, so callers need
/// no partition awareness. Rows are never stored at the level of the partitioned table
/// itself, which is why [`Table::id`] must not be called on it.
pub struct PartitionedTable<T> {
    meta: Arc<TableInfo>,

    allocator: Arc<HandleAllocator>,

    partition_expr: Arc<PartitionExpr>,

    partitions: PartitionRegistry<T>,

    observer: Arc<dyn Observer>,
}

impl<T> PartitionedTable<T>
where
    T: Table,
{
    /// Load a range partitioned table: compile its partition expressions and build its
    /// partitions with `builder`.
    ///
    /// Any failure is reported to `observer` before being returned.
    pub fn new<B>(
        meta: Arc<TableInfo>,
        allocator: Arc<HandleAllocator>,
        builder: &B,
        observer: Arc<dyn Observer>,
    ) -> Result<Self, PartitionError>
    where
        B: PartitionBuilder<Table = T>,
    {
        let loaded = generate_partition_expr(&meta).and_then(|partition_expr| {
            let partitions = PartitionRegistry::build(&meta, &allocator, builder)?;
            Ok((partition_expr, partitions))
        });
        let (partition_expr, partitions) = loaded.map_err(|e| {
            observer.on_load_error(&meta.name, &e);
            e
        })?;

        info!(
            "Loaded partitioned table `{}`[id={}] with {} partitions",
            meta.name,
            meta.id,
            partitions.len()
        );
        Ok(Self {
            meta,
            allocator,
            partition_expr: Arc::new(partition_expr),
            partitions,
            observer,
        })
    }

    pub fn meta(&self) -> &TableInfo {
        &self.meta
    }

    pub fn allocator(&self) -> &Arc<HandleAllocator> {
        &self.allocator
    }

    /// Compiled partition expressions. Pruning uses [`PartitionExpr::ranges`].
    pub fn partition_expr(&self) -> &Arc<PartitionExpr> {
        &self.partition_expr
    }

    /// Physical table of partition `id`.
    ///
    /// # Panics
    /// If `id` is not a partition of this table.
    pub fn get_partition(&self, id: i64) -> &T {
        self.partitions.get(id)
    }

    /// Partitions in definition order.
    pub fn partitions(&self) -> impl Iterator<Item = (i64, &T)> + '_ {
        self.partitions.iter()
    }

    /// Id of the partition owning `row`.
    pub fn locate_partition(
        &self,
        ctx: &mut SessionContext,
        row: &[Datum],
    ) -> Result<i64, TableError> {
        let definitions = self
            .meta
            .partition_info()
            .map(|pi| pi.definitions.as_slice())
            .unwrap_or_default();
        locate_partition(&self.partition_expr, definitions, ctx.eval_ctx_mut(), row)
    }
}

impl<T> Table for PartitionedTable<T>
where
    T: Table,
{
    fn add_record(
        &self,
        ctx: &mut SessionContext,
        row: &[Datum],
        options: AddRecordOptions,
    ) -> Result<Handle, TableError> {
        let pid = self.locate_partition(ctx, row)?;
        self.get_partition(pid).add_record(ctx, row, options)
    }

    fn remove_record(
        &self,
        ctx: &mut SessionContext,
        handle: Handle,
        row: &[Datum],
    ) -> Result<(), TableError> {
        let pid = self.locate_partition(ctx, row)?;
        self.get_partition(pid).remove_record(ctx, handle, row)
    }

    /// Update record `handle`, moving it to another partition if `new_row` locates elsewhere.
    ///
    /// A moved record gets the handle assigned by the destination partition. Unless the table
    /// uses its primary key as handle, that handle is freshly allocated and `handle` no longer
    /// refers to any record, so callers must locate the moved record by its new content.
    fn update_record(
        &self,
        ctx: &mut SessionContext,
        handle: Handle,
        old_row: &[Datum],
        new_row: &[Datum],
        touched: &[bool],
    ) -> Result<(), TableError> {
        let from = self.locate_partition(ctx, old_row)?;
        let to = self.locate_partition(ctx, new_row)?;

        if from == to {
            return self
                .get_partition(to)
                .update_record(ctx, handle, old_row, new_row, touched);
        }

        // The old and new data locate in different partitions: add the record to the new
        // partition, then remove it from the old one. Errors such as duplicate keys generally
        // happen while adding, so adding first leaves both partitions untouched in that case.
        debug!(
            "Move record {} of table `{}` from partition {} to {}",
            handle, self.meta.name, from, to
        );
        self.get_partition(to)
            .add_record(ctx, new_row, AddRecordOptions::default())?;

        // Past this point the record exists in both partitions until the removal succeeds or
        // the enclosing transaction rolls back.
        if let Err(e) = self.get_partition(from).remove_record(ctx, handle, old_row) {
            self.observer.on_migration_error(handle, from, to, &e);
            return Err(TableError::CrossPartitionMigration {
                handle,
                from,
                to,
                source: Box::new(e),
            });
        }
        Ok(())
    }

    fn id(&self) -> i64 {
        panic!(
            "id() should never be called on partitioned table `{}`",
            self.meta.name
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{observer::MockObserver, test_util::table};
    use mockall::{predicate::*, Sequence};
    use model::PartitionDefinition;
    use rustc_hash::FxHashMap;
    use std::{cell::RefCell, error::Error};
    use table::MockTable;

    /// Hands out pre-configured partitions.
    struct MockBuilder {
        partitions: RefCell<FxHashMap<i64, MockTable>>,
    }

    impl MockBuilder {
        fn new(partitions: Vec<MockTable>) -> Self {
            Self {
                partitions: RefCell::new(partitions.into_iter().map(|p| (p.id(), p)).collect()),
            }
        }
    }

    impl PartitionBuilder for MockBuilder {
        type Table = MockTable;

        fn build(
            &self,
            _meta: &Arc<TableInfo>,
            definition: &PartitionDefinition,
            _allocator: &Arc<HandleAllocator>,
        ) -> Result<MockTable, TableError> {
            self.partitions
                .borrow_mut()
                .remove(&definition.id)
                .ok_or_else(|| TableError::Internal(format!("no partition {}", definition.id)))
        }
    }

    fn partition(id: i64) -> MockTable {
        let mut partition = MockTable::new();
        partition.expect_id().return_const(id);
        partition
    }

    fn row(key: i64) -> Vec<Datum> {
        vec![Datum::Int(key), Datum::from("x")]
    }

    /// Table partitioned by `[100, 200, MAXVALUE]` into partitions 100, 101 and 102.
    fn load(
        p0: MockTable,
        p1: MockTable,
        p2: MockTable,
        observer: MockObserver,
    ) -> Result<PartitionedTable<MockTable>, PartitionError> {
        PartitionedTable::new(
            Arc::new(table(&["100", "200", "MAXVALUE"])),
            Arc::new(HandleAllocator::default()),
            &MockBuilder::new(vec![p0, p1, p2]),
            Arc::new(observer),
        )
    }

    #[test]
    fn test_load() -> Result<(), Box<dyn Error>> {
        ulog::try_init_log();
        let table = load(
            partition(100),
            partition(101),
            partition(102),
            MockObserver::new(),
        )?;
        assert_eq!("t", table.meta().name);
        assert_eq!(3, table.partition_expr().len());
        assert_eq!(
            vec![100, 101, 102],
            table.partitions().map(|(id, _)| id).collect::<Vec<_>>()
        );
        assert_eq!(101, table.get_partition(101).id());

        let mut ctx = SessionContext::default();
        assert_eq!(100, table.locate_partition(&mut ctx, &row(99))?);
        assert_eq!(101, table.locate_partition(&mut ctx, &row(100))?);
        assert_eq!(102, table.locate_partition(&mut ctx, &row(i64::MAX))?);
        Ok(())
    }

    #[test]
    fn test_load_error_is_reported() {
        ulog::try_init_log();
        let mut observer = MockObserver::new();
        observer
            .expect_on_load_error()
            .withf(|table, error| {
                table == "t"
                    && matches!(
                        error,
                        PartitionError::NonMonotonicBoundary { partition } if partition == "p1"
                    )
            })
            .times(1)
            .return_const(());
        let result = PartitionedTable::new(
            Arc::new(table(&["200", "100", "MAXVALUE"])),
            Arc::new(HandleAllocator::default()),
            &MockBuilder::new(vec![]),
            Arc::new(observer),
        );
        assert!(result.is_err());

        // Missing physical partitions are reported as well.
        let mut observer = MockObserver::new();
        observer
            .expect_on_load_error()
            .withf(|_, error| matches!(error, PartitionError::Registry(TableError::Internal(_))))
            .times(1)
            .return_const(());
        let result = PartitionedTable::new(
            Arc::new(table(&["100", "MAXVALUE"])),
            Arc::new(HandleAllocator::default()),
            &MockBuilder::new(vec![partition(100)]),
            Arc::new(observer),
        );
        assert!(matches!(result, Err(PartitionError::Registry(_))));
    }

    #[test]
    fn test_add_and_remove_route() -> Result<(), Box<dyn Error>> {
        let mut p1 = partition(101);
        p1.expect_add_record()
            .withf(|_, row, options| row[0] == Datum::Int(150) && !options.skip_handle_check)
            .times(1)
            .returning(|_, _, _| Ok(42));
        let mut p2 = partition(102);
        p2.expect_remove_record()
            .withf(|_, handle, row| *handle == 42 && row[0] == Datum::Int(200))
            .times(1)
            .returning(|_, _, _| Ok(()));
        let table = load(partition(100), p1, p2, MockObserver::new())?;

        let mut ctx = SessionContext::default();
        assert_eq!(
            42,
            table.add_record(&mut ctx, &row(150), AddRecordOptions::default())?
        );
        table.remove_record(&mut ctx, 42, &row(200))?;
        Ok(())
    }

    #[test]
    fn test_update_in_same_partition() -> Result<(), Box<dyn Error>> {
        let mut p0 = partition(100);
        p0.expect_update_record()
            .withf(|_, handle, old_row, new_row, touched| {
                *handle == 7
                    && old_row[0] == Datum::Int(10)
                    && new_row[0] == Datum::Int(20)
                    && touched == [true, false]
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(()));
        let table = load(p0, partition(101), partition(102), MockObserver::new())?;

        let mut ctx = SessionContext::default();
        table.update_record(&mut ctx, 7, &row(10), &row(20), &[true, false])?;
        Ok(())
    }

    #[test]
    fn test_update_across_partitions() -> Result<(), Box<dyn Error>> {
        let mut seq = Sequence::new();
        let mut p0 = partition(100);
        let mut p2 = partition(102);
        p2.expect_add_record()
            .withf(|_, row, options| {
                row[0] == Datum::Int(250) && *options == AddRecordOptions::default()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(7));
        p0.expect_remove_record()
            .withf(|_, handle, row| *handle == 7 && row[0] == Datum::Int(90))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        let table = load(p0, partition(101), p2, MockObserver::new())?;

        let mut ctx = SessionContext::default();
        table.update_record(&mut ctx, 7, &row(90), &row(250), &[true, false])?;
        Ok(())
    }

    #[test]
    fn test_update_fails_to_add() -> Result<(), Box<dyn Error>> {
        let mut p2 = partition(102);
        p2.expect_add_record()
            .times(1)
            .returning(|_, _, _| {
                Err(TableError::DuplicateKey {
                    key: "PRIMARY".to_owned(),
                    entry: "250".to_owned(),
                })
            });
        // The source partition has no expectation: removing from it would panic.
        let table = load(partition(100), partition(101), p2, MockObserver::new())?;

        let mut ctx = SessionContext::default();
        let result = table.update_record(&mut ctx, 7, &row(90), &row(250), &[true, false]);
        assert!(matches!(result, Err(TableError::DuplicateKey { .. })));
        Ok(())
    }

    #[test]
    fn test_update_fails_to_remove() -> Result<(), Box<dyn Error>> {
        let mut seq = Sequence::new();
        let mut p0 = partition(100);
        let mut p2 = partition(102);
        p2.expect_add_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(7));
        p0.expect_remove_record()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, handle, _| Err(TableError::RecordNotFound(handle)));
        let mut observer = MockObserver::new();
        observer
            .expect_on_migration_error()
            .with(eq(7), eq(100), eq(102), always())
            .times(1)
            .return_const(());
        let table = load(p0, partition(101), p2, observer)?;

        let mut ctx = SessionContext::default();
        match table.update_record(&mut ctx, 7, &row(90), &row(250), &[true, false]) {
            Err(TableError::CrossPartitionMigration {
                handle,
                from,
                to,
                source,
            }) => {
                assert_eq!((7, 100, 102), (handle, from, to));
                assert!(matches!(*source, TableError::RecordNotFound(7)));
            }
            other => panic!("Expected migration error, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_evaluation_error_touches_nothing() -> Result<(), Box<dyn Error>> {
        let table = load(
            partition(100),
            partition(101),
            partition(102),
            MockObserver::new(),
        )?;
        let mut ctx = SessionContext::default();
        let bad = vec![Datum::from("abc"), Datum::Null];
        assert!(matches!(
            table.add_record(&mut ctx, &bad, AddRecordOptions::default()),
            Err(TableError::Evaluation(_))
        ));
        assert!(matches!(
            table.update_record(&mut ctx, 7, &row(90), &bad, &[true, false]),
            Err(TableError::Evaluation(_))
        ));
        Ok(())
    }

    #[test]
    fn test_moved_record_gets_new_handle() -> Result<(), Box<dyn Error>> {
        let table = PartitionedTable::new(
            Arc::new(table(&["100", "MAXVALUE"])),
            Arc::new(HandleAllocator::default()),
            &crate::registry::MemTableBuilder,
            Arc::new(MockObserver::new()),
        )?;
        let mut ctx = SessionContext::default();
        let handle = table.add_record(&mut ctx, &row(90), AddRecordOptions::default())?;
        table.update_record(&mut ctx, handle, &row(90), &row(250), &[true, false])?;

        assert!(table.get_partition(100).is_empty());
        let moved = table.get_partition(101).handles();
        assert_eq!(1, moved.len());
        assert_ne!(handle, moved[0]);
        assert_eq!(None, table.get_partition(101).get(handle));
        assert_eq!(Some(row(250)), table.get_partition(101).get(moved[0]));
        Ok(())
    }

    #[test]
    #[should_panic(expected = "should never be called on partitioned table")]
    fn test_id_panics() {
        let table = load(
            partition(100),
            partition(101),
            partition(102),
            MockObserver::new(),
        )
        .expect("load");
        table.id();
    }
}
