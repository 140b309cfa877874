use model::error::CompileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("An IO error raised")]
    Io(#[from] std::io::Error),

    #[error("Malformed YAML configuration")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Table id `{0}` is used more than once")]
    DuplicatedTable(i64),

    #[error("Column `{column}` of table `{table}` is declared more than once")]
    DuplicatedColumn { table: String, column: String },

    #[error("Column `{column}` referenced by table `{table}` does not exist")]
    UnknownColumn { table: String, column: String },

    #[error("Column `{column}` of table `{table}` has unknown type `{ty}`")]
    UnknownColumnType {
        table: String,
        column: String,
        ty: String,
    },

    #[error("Partition id `{id}` of table `{table}` is used more than once")]
    DuplicatedPartition { table: String, id: i64 },

    #[error("Partitioned table `{0}` has no partition definition")]
    EmptyPartition(String),

    #[error("Partitioned table `{0}` has an empty partition expression")]
    EmptyPartitionExpr(String),

    #[error("Handle column `{column}` of table `{table}` must be an integer")]
    InvalidHandleColumn { table: String, column: String },

    #[error("Partition expression `{expr}` of table `{table}` is invalid")]
    PartitionExpr {
        table: String,
        expr: String,
        #[source]
        source: CompileError,
    },

    #[error("Key `{key}` of table `{table}` must include all columns of the partition expression")]
    PartitionKeyNotCovered { table: String, key: String },
}
