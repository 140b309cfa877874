use model::{Boundary, ColumnInfo, ColumnType, PartitionDefinition, PartitionInfo, TableInfo};

/// Table `t (id INT, name VARCHAR)` partitioned by range of `id`; partition `i` is named
/// `p{i}` and has id `100 + i`.
pub(crate) fn table(bounds: &[&str]) -> TableInfo {
    let definitions = bounds
        .iter()
        .enumerate()
        .map(|(i, bound)| {
            PartitionDefinition::new(100 + i as i64, &format!("p{}", i), Boundary::parse(bound))
        })
        .collect();
    TableInfo::new(
        1,
        "t",
        vec![
            ColumnInfo::new("id", 0, ColumnType::Int),
            ColumnInfo::new("name", 1, ColumnType::Varchar),
        ],
    )
    .with_partition(PartitionInfo {
        expr: "id".to_owned(),
        definitions,
    })
}
