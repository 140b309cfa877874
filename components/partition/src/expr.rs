use expression::Predicate;
use itertools::Itertools;
use log::debug;
use model::{
    error::PartitionError, Boundary, Datum, PartitionDefinition, PartitionInfo, TableInfo,
};

/// Compiled partition definition expressions.
///
/// Two lists exist because locating a row uses binary search, which requires that for any
/// partition `i`, if `upper_bounds[i]` holds for a row then `upper_bounds[i + 1]` holds too.
/// Pruning, on the other hand, needs the exact range of every partition.
///
/// ```text
/// PARTITION BY RANGE (x) (
///     PARTITION p1 VALUES LESS THAN (y1),
///     PARTITION p2 VALUES LESS THAN (y2),
///     PARTITION p3 VALUES LESS THAN MAXVALUE)
///
/// ranges:       (x < y1); (x < y2) and (x >= y1); true and (x >= y2)
/// upper_bounds: (x < y1); (x < y2);               true
/// ```
#[derive(Debug, Clone)]
pub struct PartitionExpr {
    pub ranges: Vec<Predicate>,
    pub upper_bounds: Vec<Predicate>,
}

impl PartitionExpr {
    pub fn ranges(&self) -> &[Predicate] {
        &self.ranges
    }

    pub fn upper_bounds(&self) -> &[Predicate] {
        &self.upper_bounds
    }

    /// Number of partitions.
    pub fn len(&self) -> usize {
        self.upper_bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upper_bounds.is_empty()
    }
}

/// Compile the range partition definitions of `meta`.
///
/// Boundaries are checked before compiling: every finite boundary must fold to a constant,
/// consecutive boundaries must be strictly increasing and `MAXVALUE` may only bound the last
/// partition.
pub fn generate_partition_expr(meta: &TableInfo) -> Result<PartitionExpr, PartitionError> {
    let pi = meta
        .partition_info()
        .ok_or_else(|| PartitionError::NotPartitioned(meta.name.clone()))?;
    if pi.definitions.is_empty() {
        return Err(PartitionError::EmptyDefinitions(meta.name.clone()));
    }
    check_boundaries(meta, pi)?;

    let mut ranges = Vec::with_capacity(pi.definitions.len());
    let mut upper_bounds = Vec::with_capacity(pi.definitions.len());
    for (i, definition) in pi.definitions.iter().enumerate() {
        let mut text = match &definition.less_than {
            // Expr less than MAXVALUE is always true.
            Boundary::MaxValue => "true".to_owned(),
            Boundary::LessThan(bound) => format!("(({}) < ({}))", pi.expr, bound),
        };
        upper_bounds.push(compile(&text, meta)?);

        if i > 0 {
            if let Boundary::LessThan(lower) = &pi.definitions[i - 1].less_than {
                text.push_str(&format!(" and (({}) >= ({}))", pi.expr, lower));
            }
        }
        ranges.push(compile(&text, meta)?);
    }

    debug!(
        "Generated partition expression of table `{}`, {} partitions by `{}`",
        meta.name,
        upper_bounds.len(),
        pi.expr
    );
    Ok(PartitionExpr {
        ranges,
        upper_bounds,
    })
}

fn compile(text: &str, meta: &TableInfo) -> Result<Predicate, PartitionError> {
    expression::compile(text, meta).map_err(|source| PartitionError::Compile {
        expr: text.to_owned(),
        source,
    })
}

fn check_boundaries(meta: &TableInfo, pi: &PartitionInfo) -> Result<(), PartitionError> {
    let last = pi.definitions.len() - 1;
    let mut bounds: Vec<(&PartitionDefinition, Datum)> = Vec::with_capacity(pi.definitions.len());
    for (i, definition) in pi.definitions.iter().enumerate() {
        match &definition.less_than {
            Boundary::MaxValue if i != last => {
                return Err(PartitionError::MaxValueNotLast {
                    partition: definition.name.clone(),
                });
            }
            Boundary::MaxValue => {}
            Boundary::LessThan(text) => {
                let value = expression::eval_const(text, meta).map_err(|source| {
                    PartitionError::Compile {
                        expr: text.clone(),
                        source,
                    }
                })?;
                if value.is_null() {
                    return Err(PartitionError::NonMonotonicBoundary {
                        partition: definition.name.clone(),
                    });
                }
                bounds.push((definition, value));
            }
        }
    }

    if let Some((_, (definition, _))) = bounds
        .iter()
        .tuple_windows()
        .find(|((_, lower), (_, upper))| !strictly_less(lower, upper))
    {
        return Err(PartitionError::NonMonotonicBoundary {
            partition: definition.name.clone(),
        });
    }
    Ok(())
}

fn strictly_less(lower: &Datum, upper: &Datum) -> bool {
    match (lower, upper) {
        (Datum::Int(a), Datum::Int(b)) => a < b,
        (Datum::Str(a), Datum::Str(b)) => a.as_bytes() < b.as_bytes(),
        (Datum::Int(a), Datum::Str(b)) => b.trim().parse::<i64>().map_or(false, |b| *a < b),
        (Datum::Str(a), Datum::Int(b)) => a.trim().parse::<i64>().map_or(false, |a| a < *b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::table;
    use expression::EvalContext;
    use model::error::CompileError;
    use std::error::Error;

    fn signals(predicates: &[Predicate], key: i64) -> Result<Vec<i64>, Box<dyn Error>> {
        let mut ctx = EvalContext::default();
        let row = vec![Datum::Int(key), Datum::Null];
        let mut result = vec![];
        for predicate in predicates {
            result.push(predicate.eval_int(&row, &mut ctx)?.unwrap_or(0));
        }
        Ok(result)
    }

    #[test]
    fn test_generate() -> Result<(), Box<dyn Error>> {
        ulog::try_init_log();
        let expr = generate_partition_expr(&table(&["100", "200", "MAXVALUE"]))?;
        assert_eq!(3, expr.len());
        assert_eq!("((id) < (100))", expr.upper_bounds()[0].text());
        assert_eq!("((id) < (200))", expr.upper_bounds()[1].text());
        assert_eq!("true", expr.upper_bounds()[2].text());
        assert_eq!("((id) < (100))", expr.ranges()[0].text());
        assert_eq!(
            "((id) < (200)) and ((id) >= (100))",
            expr.ranges()[1].text()
        );
        assert_eq!("true and ((id) >= (200))", expr.ranges()[2].text());

        assert_eq!(vec![1, 1, 1], signals(expr.upper_bounds(), 50)?);
        assert_eq!(vec![0, 1, 1], signals(expr.upper_bounds(), 150)?);
        assert_eq!(vec![0, 0, 1], signals(expr.upper_bounds(), 200)?);

        // Exactly one range holds for every key.
        assert_eq!(vec![1, 0, 0], signals(expr.ranges(), 99)?);
        assert_eq!(vec![0, 1, 0], signals(expr.ranges(), 100)?);
        assert_eq!(vec![0, 0, 1], signals(expr.ranges(), 1_000_000)?);
        Ok(())
    }

    #[test]
    fn test_monotonic_upper_bounds() -> Result<(), Box<dyn Error>> {
        let expr = generate_partition_expr(&table(&["-10", "0", "10", "1000", "MAXVALUE"]))?;
        for key in -50..1100 {
            let upper = signals(expr.upper_bounds(), key)?;
            let first = upper.iter().position(|s| *s > 0).expect("MAXVALUE always holds");
            assert!(upper[first..].iter().all(|s| *s > 0));
            assert!(upper[..first].iter().all(|s| *s <= 0));
            assert_eq!(1, signals(expr.ranges(), key)?.iter().filter(|s| **s > 0).count());
        }
        Ok(())
    }

    #[test]
    fn test_invalid_boundaries() {
        assert!(matches!(
            generate_partition_expr(&table(&["100", "100"])),
            Err(PartitionError::NonMonotonicBoundary { partition }) if partition == "p1"
        ));
        assert!(matches!(
            generate_partition_expr(&table(&["200", "100", "MAXVALUE"])),
            Err(PartitionError::NonMonotonicBoundary { partition }) if partition == "p1"
        ));
        assert!(matches!(
            generate_partition_expr(&table(&["MAXVALUE", "100"])),
            Err(PartitionError::MaxValueNotLast { partition }) if partition == "p0"
        ));
        assert!(matches!(
            generate_partition_expr(&table(&["NULL"])),
            Err(PartitionError::NonMonotonicBoundary { .. })
        ));
        assert!(matches!(
            generate_partition_expr(&table(&[])),
            Err(PartitionError::EmptyDefinitions(_))
        ));

        let mut meta = table(&["100"]);
        meta.partition = None;
        assert!(matches!(
            generate_partition_expr(&meta),
            Err(PartitionError::NotPartitioned(_))
        ));
    }

    #[test]
    fn test_compile_error() {
        match generate_partition_expr(&table(&["10 +", "MAXVALUE"])) {
            Err(PartitionError::Compile { expr, source }) => {
                assert_eq!("10 +", expr);
                assert!(matches!(source, CompileError::Parse { .. }));
            }
            other => panic!("Expected compile error, got {:?}", other),
        }

        let mut meta = table(&["100", "MAXVALUE"]);
        if let Some(pi) = meta.partition.as_mut() {
            pi.expr = "age".to_owned();
        }
        match generate_partition_expr(&meta) {
            Err(PartitionError::Compile { expr, source }) => {
                assert_eq!("((age) < (100))", expr);
                assert_eq!(CompileError::UnknownColumn("age".to_owned()), source);
            }
            other => panic!("Expected compile error, got {:?}", other),
        }

        // A boundary must not refer to columns.
        assert!(matches!(
            generate_partition_expr(&table(&["id"])),
            Err(PartitionError::Compile {
                source: CompileError::NotConstant(_),
                ..
            })
        ));
    }
}
