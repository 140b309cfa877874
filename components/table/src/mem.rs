use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use bytes::Bytes;
use itertools::Itertools;
use log::{debug, trace};
use model::{
    codec,
    datum::display_row,
    error::TableError,
    ColumnType, Datum, Handle, IndexInfo, Row, TableInfo,
};
use parking_lot::RwLock;

use crate::{AddRecordOptions, HandleAllocator, SessionContext, Table};

/// In-memory physical table.
///
/// Rows are kept under their encoded record keys, so a `MemTable` created for a partition
/// stores everything below the partition's own key prefix. Indices are maintained on every
/// mutation and unique indices are enforced.
pub struct MemTable {
    /// Physical id: the table id for an ordinary table, the partition id for a partition.
    id: i64,

    meta: Arc<TableInfo>,

    allocator: Arc<HandleAllocator>,

    inner: RwLock<Inner>,
}

struct Inner {
    rows: BTreeMap<Bytes, Row>,
    indices: Vec<IndexEntries>,
}

struct IndexEntries {
    info: IndexInfo,
    entries: BTreeSet<(Vec<Datum>, Handle)>,
}

impl IndexEntries {
    fn key(&self, row: &[Datum]) -> Vec<Datum> {
        self.info
            .columns
            .iter()
            .map(|offset| row[*offset].clone())
            .collect()
    }

    /// Find a record other than `handle` that already holds `key` in a unique index.
    /// NULL never conflicts.
    fn conflict(&self, key: &[Datum], handle: Handle) -> Option<Handle> {
        if !self.info.unique || key.iter().any(Datum::is_null) {
            return None;
        }
        let lower = (key.to_vec(), Handle::MIN);
        let upper = (key.to_vec(), Handle::MAX);
        self.entries
            .range(lower..=upper)
            .map(|(_, h)| *h)
            .find(|h| *h != handle)
    }

    fn is_touched(&self, touched: &[bool]) -> bool {
        self.info
            .columns
            .iter()
            .any(|offset| touched.get(*offset).copied().unwrap_or(false))
    }

    fn duplicate(&self, key: &[Datum]) -> TableError {
        TableError::DuplicateKey {
            key: self.info.name.clone(),
            entry: key.iter().join("-"),
        }
    }
}

impl MemTable {
    /// Create an empty table storing rows under the key prefix of `id`.
    ///
    /// Fails if an index of `meta` refers to a column that does not exist, or if the handle
    /// column is missing or not an integer.
    pub fn new(
        meta: Arc<TableInfo>,
        id: i64,
        allocator: Arc<HandleAllocator>,
    ) -> Result<Self, TableError> {
        if let Some(offset) = meta.pk_is_handle {
            match meta.columns.get(offset) {
                Some(column) if column.ty == ColumnType::Int => {}
                _ => return Err(TableError::IndexInit("PRIMARY".to_owned())),
            }
        }

        let mut indices = Vec::with_capacity(meta.indices.len());
        for index in &meta.indices {
            if index.columns.is_empty()
                || index
                    .columns
                    .iter()
                    .any(|offset| *offset >= meta.columns.len())
            {
                return Err(TableError::IndexInit(index.name.clone()));
            }
            indices.push(IndexEntries {
                info: index.clone(),
                entries: BTreeSet::new(),
            });
        }

        debug!(
            "Created table `{}` with physical id {} and {} indices",
            meta.name,
            id,
            indices.len()
        );

        Ok(Self {
            id,
            meta,
            allocator,
            inner: RwLock::new(Inner {
                rows: BTreeMap::new(),
                indices,
            }),
        })
    }

    pub fn meta(&self) -> &TableInfo {
        &self.meta
    }

    pub fn get(&self, handle: Handle) -> Option<Row> {
        let key = codec::record_key(self.id, handle);
        self.inner.read().rows.get(&key).cloned()
    }

    /// Handles of all records, in key order.
    pub fn handles(&self) -> Vec<Handle> {
        self.inner
            .read()
            .rows
            .keys()
            .filter_map(|key| codec::decode_record_key(key).map(|(_, handle)| handle))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().rows.is_empty()
    }

    fn check_width(&self, width: usize) -> Result<(), TableError> {
        let expected = self.meta.columns.len();
        if width != expected {
            return Err(TableError::ColumnCountMismatch {
                expected,
                actual: width,
            });
        }
        Ok(())
    }

    fn handle_column(&self, row: &[Datum], offset: usize) -> Result<Handle, TableError> {
        match &row[offset] {
            Datum::Int(handle) => Ok(*handle),
            other => Err(TableError::Internal(format!(
                "handle column of table `{}` must be an integer, found {}",
                self.meta.name, other
            ))),
        }
    }
}

impl Table for MemTable {
    fn add_record(
        &self,
        _ctx: &mut SessionContext,
        row: &[Datum],
        options: AddRecordOptions,
    ) -> Result<Handle, TableError> {
        self.check_width(row.len())?;
        let handle = match self.meta.pk_is_handle {
            Some(offset) => {
                let handle = self.handle_column(row, offset)?;
                self.allocator.rebase(handle);
                handle
            }
            None => self.allocator.alloc(),
        };
        let key = codec::record_key(self.id, handle);

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let displaced = match inner.rows.get(&key) {
            Some(_) if !options.skip_handle_check => {
                return Err(TableError::DuplicateKey {
                    key: "PRIMARY".to_owned(),
                    entry: handle.to_string(),
                });
            }
            // Unchecked handles overwrite the stored record.
            stored => stored.cloned(),
        };
        for index in &inner.indices {
            let index_key = index.key(row);
            if index.conflict(&index_key, handle).is_some() {
                return Err(index.duplicate(&index_key));
            }
        }

        for index in inner.indices.iter_mut() {
            if let Some(displaced) = &displaced {
                let old_index_key = index.key(displaced);
                index.entries.remove(&(old_index_key, handle));
            }
            let index_key = index.key(row);
            index.entries.insert((index_key, handle));
        }
        inner.rows.insert(key, row.to_vec());
        trace!(
            "Added record {} into table {}: {}",
            handle,
            self.id,
            display_row(row)
        );
        Ok(handle)
    }

    fn remove_record(
        &self,
        _ctx: &mut SessionContext,
        handle: Handle,
        row: &[Datum],
    ) -> Result<(), TableError> {
        self.check_width(row.len())?;
        let key = codec::record_key(self.id, handle);

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let stored = inner
            .rows
            .remove(&key)
            .ok_or(TableError::RecordNotFound(handle))?;
        for index in inner.indices.iter_mut() {
            let index_key = index.key(&stored);
            index.entries.remove(&(index_key, handle));
        }
        trace!("Removed record {} from table {}", handle, self.id);
        Ok(())
    }

    fn update_record(
        &self,
        _ctx: &mut SessionContext,
        handle: Handle,
        old_row: &[Datum],
        new_row: &[Datum],
        touched: &[bool],
    ) -> Result<(), TableError> {
        self.check_width(old_row.len())?;
        self.check_width(new_row.len())?;
        self.check_width(touched.len())?;

        let new_handle = match self.meta.pk_is_handle {
            Some(offset) if touched[offset] => self.handle_column(new_row, offset)?,
            _ => handle,
        };
        let handle_changed = new_handle != handle;
        let old_key = codec::record_key(self.id, handle);
        let new_key = codec::record_key(self.id, new_handle);

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let stored = inner
            .rows
            .get(&old_key)
            .cloned()
            .ok_or(TableError::RecordNotFound(handle))?;
        if handle_changed && inner.rows.contains_key(&new_key) {
            return Err(TableError::DuplicateKey {
                key: "PRIMARY".to_owned(),
                entry: new_handle.to_string(),
            });
        }

        // Check every constraint before mutating anything.
        for index in &inner.indices {
            if !handle_changed && !index.is_touched(touched) {
                continue;
            }
            let index_key = index.key(new_row);
            if index.conflict(&index_key, handle).is_some() {
                return Err(index.duplicate(&index_key));
            }
        }

        for index in inner.indices.iter_mut() {
            if !handle_changed && !index.is_touched(touched) {
                continue;
            }
            let old_index_key = index.key(&stored);
            index.entries.remove(&(old_index_key, handle));
            let new_index_key = index.key(new_row);
            index.entries.insert((new_index_key, new_handle));
        }
        inner.rows.remove(&old_key);
        inner.rows.insert(new_key, new_row.to_vec());
        if handle_changed {
            self.allocator.rebase(new_handle);
        }
        trace!(
            "Updated record {} of table {}: {} -> {}",
            handle,
            self.id,
            display_row(old_row),
            display_row(new_row)
        );
        Ok(())
    }

    fn id(&self) -> i64 {
        self.id
    }
}
