use std::{collections::HashSet, fs::File, io::Read, str::FromStr};

use error::ConfigurationError;
use log::{debug, info};
use model::{
    Boundary, ColumnInfo, ColumnType, IndexInfo, PartitionDefinition, PartitionInfo, TableInfo,
};
use serde::{Deserialize, Serialize};
pub mod error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    /// One of `int` or `varchar`, case-insensitive.
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Index {
    pub id: i64,
    pub name: String,

    /// Names of the indexed columns, in index key order.
    pub columns: Vec<String>,

    #[serde(default)]
    pub unique: bool,
}

/// Boundary of a range partition. YAML integers and strings are both accepted, so that
/// `less-than: 100` and `less-than: MAXVALUE` read naturally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LessThan {
    Int(i64),
    Text(String),
}

impl LessThan {
    pub fn to_boundary(&self) -> Boundary {
        match self {
            LessThan::Int(value) => Boundary::LessThan(value.to_string()),
            LessThan::Text(text) => Boundary::parse(text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub id: i64,

    /// Defaults to `p{ordinal}` if absent.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "less-than")]
    pub less_than: LessThan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partition {
    /// Partition key expression, e.g. `amount` or `amount div 10`.
    pub expr: String,

    pub definitions: Vec<Definition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub id: i64,
    pub name: String,

    /// Name of the integer primary key column whose value is used as row handle.
    #[serde(rename = "pk-is-handle", default)]
    pub pk_is_handle: Option<String>,

    pub columns: Vec<Column>,

    #[serde(default)]
    pub indices: Vec<Index>,

    #[serde(default)]
    pub partition: Option<Partition>,
}

impl Table {
    fn column_offset(&self, name: &str) -> Result<usize, ConfigurationError> {
        self.columns
            .iter()
            .position(|column| column.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigurationError::UnknownColumn {
                table: self.name.clone(),
                column: name.to_owned(),
            })
    }

    fn check(&self) -> Result<(), ConfigurationError> {
        let mut names = HashSet::new();
        for column in &self.columns {
            if !names.insert(column.name.to_lowercase()) {
                return Err(ConfigurationError::DuplicatedColumn {
                    table: self.name.clone(),
                    column: column.name.clone(),
                });
            }
            column_type(&self.name, column)?;
        }

        if let Some(pk) = &self.pk_is_handle {
            let offset = self.column_offset(pk)?;
            if column_type(&self.name, &self.columns[offset])? != ColumnType::Int {
                return Err(ConfigurationError::InvalidHandleColumn {
                    table: self.name.clone(),
                    column: pk.clone(),
                });
            }
        }

        for index in &self.indices {
            for column in &index.columns {
                self.column_offset(column)?;
            }
        }

        if let Some(partition) = &self.partition {
            if partition.expr.trim().is_empty() {
                return Err(ConfigurationError::EmptyPartitionExpr(self.name.clone()));
            }
            if partition.definitions.is_empty() {
                return Err(ConfigurationError::EmptyPartition(self.name.clone()));
            }
            // Partition ids double as storage prefixes, so they must not collide with the
            // table id either.
            let mut ids = HashSet::from([self.id]);
            for definition in &partition.definitions {
                if !ids.insert(definition.id) {
                    return Err(ConfigurationError::DuplicatedPartition {
                        table: self.name.clone(),
                        id: definition.id,
                    });
                }
            }
            self.check_partition_keys(partition)?;
        }
        Ok(())
    }

    /// Rows with equal keys must land in the same partition, otherwise each partition would
    /// accept its own copy. The handle column and every unique index must therefore include
    /// all columns of the partition expression.
    fn check_partition_keys(&self, partition: &Partition) -> Result<(), ConfigurationError> {
        let info = self.to_table_info()?;
        let predicate = expression::compile(&partition.expr, &info).map_err(|source| {
            ConfigurationError::PartitionExpr {
                table: self.name.clone(),
                expr: partition.expr.clone(),
                source,
            }
        })?;
        let columns = predicate.expr().columns();

        let not_covered = |key: &str| ConfigurationError::PartitionKeyNotCovered {
            table: self.name.clone(),
            key: key.to_owned(),
        };
        if let Some(pk) = info.pk_is_handle {
            if columns.iter().any(|offset| *offset != pk) {
                return Err(not_covered("PRIMARY"));
            }
        }
        for index in info.indices.iter().filter(|index| index.unique) {
            if !columns.iter().all(|offset| index.columns.contains(offset)) {
                return Err(not_covered(&index.name));
            }
        }
        Ok(())
    }

    fn apply(&mut self) {
        if let Some(partition) = self.partition.as_mut() {
            for (i, definition) in partition.definitions.iter_mut().enumerate() {
                if definition.name.is_none() {
                    definition.name = Some(format!("p{}", i));
                }
            }
        }
    }

    /// Convert into table metadata. The table is expected to be checked.
    pub fn to_table_info(&self) -> Result<TableInfo, ConfigurationError> {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(offset, column)| {
                column_type(&self.name, column).map(|ty| ColumnInfo::new(&column.name, offset, ty))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let indices = self
            .indices
            .iter()
            .map(|index| {
                let columns = index
                    .columns
                    .iter()
                    .map(|column| self.column_offset(column))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(IndexInfo {
                    id: index.id,
                    name: index.name.clone(),
                    columns,
                    unique: index.unique,
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        let mut info = TableInfo::new(self.id, &self.name, columns).with_indices(indices);
        if let Some(pk) = &self.pk_is_handle {
            info = info.with_pk_is_handle(self.column_offset(pk)?);
        }
        if let Some(partition) = &self.partition {
            let definitions = partition
                .definitions
                .iter()
                .enumerate()
                .map(|(i, definition)| {
                    let name = definition
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("p{}", i));
                    PartitionDefinition::new(definition.id, &name, definition.less_than.to_boundary())
                })
                .collect();
            info = info.with_partition(PartitionInfo {
                expr: partition.expr.clone(),
                definitions,
            });
        }
        Ok(info)
    }
}

fn column_type(table: &str, column: &Column) -> Result<ColumnType, ConfigurationError> {
    ColumnType::from_str(&column.ty).map_err(|_| ConfigurationError::UnknownColumnType {
        table: table.to_owned(),
        column: column.name.clone(),
        ty: column.ty.clone(),
    })
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub tables: Vec<Table>,
}

impl Configuration {
    /// Read configuration from a YAML file. The result is not checked yet.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigurationError> {
        let mut file = File::open(path)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        debug!("Read {} bytes of configuration from {:?}", content.len(), path);
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Check and apply the configuration.
    ///
    /// Table ids must be unique. Within a table, column names must be unique, every column
    /// referenced by the primary key or an index must exist, and partition ids must be
    /// unique and distinct from the table id. Missing partition names are filled in.
    pub fn check_and_apply(&mut self) -> Result<(), ConfigurationError> {
        let mut ids = HashSet::new();
        for table in &self.tables {
            if !ids.insert(table.id) {
                return Err(ConfigurationError::DuplicatedTable(table.id));
            }
            table.check()?;
        }
        self.tables.iter_mut().for_each(Table::apply);
        info!("Configuration of {} tables is checked", self.tables.len());
        Ok(())
    }

    pub fn table_infos(&self) -> Result<Vec<TableInfo>, ConfigurationError> {
        self.tables.iter().map(Table::to_table_info).collect()
    }
}
