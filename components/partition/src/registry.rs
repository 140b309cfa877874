use std::sync::Arc;

use log::{error, info};
use model::{error::TableError, PartitionDefinition, TableInfo};
use rustc_hash::FxHashMap;
use table::{HandleAllocator, MemTable, Table};

/// Creates the physical table backing one partition.
pub trait PartitionBuilder {
    type Table: Table;

    /// Build the partition described by `definition`. The partition shares the columns and
    /// indices of `meta` and allocates handles from `allocator`.
    fn build(
        &self,
        meta: &Arc<TableInfo>,
        definition: &PartitionDefinition,
        allocator: &Arc<HandleAllocator>,
    ) -> Result<Self::Table, TableError>;
}

/// Builds in-memory partitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemTableBuilder;

impl PartitionBuilder for MemTableBuilder {
    type Table = MemTable;

    fn build(
        &self,
        meta: &Arc<TableInfo>,
        definition: &PartitionDefinition,
        allocator: &Arc<HandleAllocator>,
    ) -> Result<MemTable, TableError> {
        MemTable::new(Arc::clone(meta), definition.id, Arc::clone(allocator))
    }
}

/// Immutable mapping from partition id to the physical table of the partition.
pub struct PartitionRegistry<T> {
    partitions: FxHashMap<i64, T>,

    /// Partition ids in definition order.
    order: Vec<i64>,
}

impl<T> PartitionRegistry<T>
where
    T: Table,
{
    /// Build one physical table per partition definition of `meta`.
    ///
    /// Either every partition is built or an error is returned and nothing is kept.
    pub fn build<B>(
        meta: &Arc<TableInfo>,
        allocator: &Arc<HandleAllocator>,
        builder: &B,
    ) -> Result<Self, TableError>
    where
        B: PartitionBuilder<Table = T>,
    {
        let definitions = meta
            .partition_info()
            .map(|pi| pi.definitions.as_slice())
            .unwrap_or_default();

        let mut partitions = FxHashMap::default();
        let mut order = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let partition = builder
                .build(meta, definition, allocator)
                .map_err(|e| {
                    error!(
                        "Failed to build partition {}[id={}] of table `{}`: {}",
                        definition.name, definition.id, meta.name, e
                    );
                    e
                })?;
            if partition.id() != definition.id {
                return Err(TableError::Internal(format!(
                    "partition {} is built with physical id {}, {} expected",
                    definition.name,
                    partition.id(),
                    definition.id
                )));
            }
            if partitions.insert(definition.id, partition).is_some() {
                return Err(TableError::Internal(format!(
                    "duplicated partition id {} in table `{}`",
                    definition.id, meta.name
                )));
            }
            order.push(definition.id);
        }

        info!(
            "Built {} partitions for table `{}`: {:?}",
            order.len(),
            meta.name,
            order
        );
        Ok(Self { partitions, order })
    }

    /// Physical table of partition `id`.
    ///
    /// # Panics
    /// If `id` is not a partition of this table. Partition ids come from the same
    /// definitions the registry is built from, so a foreign id is a programming error.
    pub fn get(&self, id: i64) -> &T {
        match self.partitions.get(&id) {
            Some(partition) => partition,
            None => panic!("Partition {} is not registered", id),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.partitions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate partitions in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &T)> + '_ {
        self.order.iter().map(move |id| (*id, self.get(*id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::table;
    use model::IndexInfo;
    use std::{cell::Cell, error::Error};

    #[test]
    fn test_build() -> Result<(), Box<dyn Error>> {
        ulog::try_init_log();
        let meta = Arc::new(table(&["100", "200", "MAXVALUE"]));
        let allocator = Arc::new(HandleAllocator::default());
        let registry = PartitionRegistry::build(&meta, &allocator, &MemTableBuilder)?;
        assert_eq!(3, registry.len());
        assert_eq!(
            vec![100, 101, 102],
            registry.iter().map(|(id, _)| id).collect::<Vec<_>>()
        );
        assert_eq!(101, registry.get(101).id());
        assert!(registry.contains(102));
        assert!(!registry.contains(1));
        Ok(())
    }

    #[test]
    #[should_panic(expected = "Partition 1 is not registered")]
    fn test_get_foreign_partition() {
        let meta = Arc::new(table(&["MAXVALUE"]));
        let allocator = Arc::new(HandleAllocator::default());
        let registry =
            PartitionRegistry::build(&meta, &allocator, &MemTableBuilder).expect("registry");
        registry.get(1);
    }

    #[test]
    fn test_build_is_all_or_nothing() {
        let mut meta = table(&["100", "MAXVALUE"]);
        meta.indices.push(IndexInfo {
            id: 1,
            name: "idx_missing".to_owned(),
            columns: vec![9],
            unique: false,
        });
        let meta = Arc::new(meta);
        let allocator = Arc::new(HandleAllocator::default());
        assert!(matches!(
            PartitionRegistry::build(&meta, &allocator, &MemTableBuilder),
            Err(TableError::IndexInit(name)) if name == "idx_missing"
        ));

        // The second partition fails, the first one is dropped with the error.
        struct FailSecond {
            built: Cell<usize>,
        }
        impl PartitionBuilder for FailSecond {
            type Table = MemTable;
            fn build(
                &self,
                meta: &Arc<TableInfo>,
                definition: &PartitionDefinition,
                allocator: &Arc<HandleAllocator>,
            ) -> Result<MemTable, TableError> {
                self.built.set(self.built.get() + 1);
                if self.built.get() == 2 {
                    return Err(TableError::IndexInit("idx".to_owned()));
                }
                MemTable::new(Arc::clone(meta), definition.id, Arc::clone(allocator))
            }
        }
        let meta = Arc::new(table(&["100", "200", "MAXVALUE"]));
        let builder = FailSecond {
            built: Cell::new(0),
        };
        assert!(PartitionRegistry::build(&meta, &allocator, &builder).is_err());
        assert_eq!(2, builder.built.get());
    }

    #[test]
    fn test_physical_id_mismatch() {
        struct WrongId;
        impl PartitionBuilder for WrongId {
            type Table = MemTable;
            fn build(
                &self,
                meta: &Arc<TableInfo>,
                _definition: &PartitionDefinition,
                allocator: &Arc<HandleAllocator>,
            ) -> Result<MemTable, TableError> {
                MemTable::new(Arc::clone(meta), meta.id, Arc::clone(allocator))
            }
        }
        let meta = Arc::new(table(&["MAXVALUE"]));
        let allocator = Arc::new(HandleAllocator::default());
        assert!(matches!(
            PartitionRegistry::build(&meta, &allocator, &WrongId),
            Err(TableError::Internal(_))
        ));
    }
}
