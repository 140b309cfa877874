use expression::EvalContext;
use log::trace;
use model::{
    datum::display_row,
    error::{EvalError, TableError},
    Datum, PartitionDefinition,
};

use crate::expr::PartitionExpr;

impl PartitionExpr {
    /// Binary search for the first partition whose upper bound holds for `row`.
    ///
    /// Returns `self.len()` if no upper bound holds. The first evaluation error aborts the
    /// search. If the upper bounds are not monotonic, the result is deterministic but
    /// meaningless.
    pub fn search(&self, ctx: &mut EvalContext, row: &[Datum]) -> Result<usize, EvalError> {
        let upper_bounds = self.upper_bounds();
        let (mut low, mut high) = (0, upper_bounds.len());
        while low < high {
            let mid = low + (high - low) / 2;
            let signal = upper_bounds[mid].eval_int(row, ctx)?.unwrap_or(0);
            if signal > 0 {
                high = mid;
            } else {
                low = mid + 1;
            }
        }
        Ok(low)
    }
}

/// Partition id of the partition owning `row`.
pub(crate) fn locate_partition(
    expr: &PartitionExpr,
    definitions: &[PartitionDefinition],
    ctx: &mut EvalContext,
    row: &[Datum],
) -> Result<i64, TableError> {
    let idx = expr.search(ctx, row)?;
    match definitions.get(idx) {
        Some(definition) if idx < expr.len() => {
            trace!(
                "Located row {} in partition {}[id={}]",
                display_row(row),
                definition.name,
                definition.id
            );
            Ok(definition.id)
        }
        // The data does not belong to any of the partitions.
        _ => Err(TableError::NoMatchingPartition {
            row: display_row(row),
        }),
    }
}
