use std::cmp::Ordering;

use model::{error::EvalError, Datum};

use crate::{
    context::EvalContext,
    expr::{BinaryOp, Expr, UnaryOp},
};

impl Expr {
    /// Evaluate the expression against `row`.
    pub fn eval(&self, row: &[Datum], ctx: &mut EvalContext) -> Result<Datum, EvalError> {
        match self {
            Expr::Column { offset, .. } => {
                row.get(*offset)
                    .cloned()
                    .ok_or(EvalError::ColumnOutOfRow {
                        offset: *offset,
                        width: row.len(),
                    })
            }
            Expr::Literal(datum) => Ok(datum.clone()),
            Expr::Unary { op, expr } => {
                let value = expr.eval(row, ctx)?;
                eval_unary(*op, &value, ctx)
            }
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => eval_and(left, right, row, ctx),
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => eval_or(left, right, row, ctx),
            Expr::Binary { op, left, right } => {
                let lhs = left.eval(row, ctx)?;
                let rhs = right.eval(row, ctx)?;
                if op.is_comparison() {
                    compare(*op, &lhs, &rhs, ctx)
                } else {
                    arithmetic(*op, &lhs, &rhs, ctx)
                }
            }
        }
    }
}

/// Convert a value to an integer. `None` stands for SQL NULL.
pub(crate) fn to_int(datum: &Datum, ctx: &mut EvalContext) -> Result<Option<i64>, EvalError> {
    match datum {
        Datum::Null => Ok(None),
        Datum::Int(v) => Ok(Some(*v)),
        Datum::Str(s) => coerce_str(s, ctx).map(Some),
    }
}

fn coerce_str(s: &str, ctx: &mut EvalContext) -> Result<i64, EvalError> {
    let trimmed = s.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }

    if ctx.is_strict() {
        return Err(EvalError::Coercion(s.to_owned()));
    }

    // Take the longest prefix that reads as an integer, e.g. `12abc` -> 12.
    let bytes = trimmed.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let value = if end == digits_start {
        0
    } else {
        // An overflowing prefix saturates, e.g. `99999999999999999999x` -> i64::MAX.
        trimmed[..end].parse::<i64>().unwrap_or(if bytes[0] == b'-' {
            i64::MIN
        } else {
            i64::MAX
        })
    };
    ctx.append_warning(format!("Truncated incorrect INTEGER value: '{}'", s));
    Ok(value)
}

fn bool_datum(value: bool) -> Datum {
    Datum::Int(value as i64)
}

fn eval_unary(op: UnaryOp, value: &Datum, ctx: &mut EvalContext) -> Result<Datum, EvalError> {
    match op {
        UnaryOp::IsNull => Ok(bool_datum(value.is_null())),
        UnaryOp::IsNotNull => Ok(bool_datum(!value.is_null())),
        UnaryOp::Not => Ok(match to_int(value, ctx)? {
            None => Datum::Null,
            Some(v) => bool_datum(v == 0),
        }),
        UnaryOp::Neg => match to_int(value, ctx)? {
            None => Ok(Datum::Null),
            Some(v) => v
                .checked_neg()
                .map(Datum::Int)
                .ok_or_else(|| EvalError::Overflow(format!("-({})", v))),
        },
    }
}

fn eval_and(
    left: &Expr,
    right: &Expr,
    row: &[Datum],
    ctx: &mut EvalContext,
) -> Result<Datum, EvalError> {
    let lhs = to_int(&left.eval(row, ctx)?, ctx)?;
    if lhs == Some(0) {
        return Ok(bool_datum(false));
    }
    let rhs = to_int(&right.eval(row, ctx)?, ctx)?;
    Ok(match (lhs, rhs) {
        (_, Some(0)) => bool_datum(false),
        (Some(_), Some(_)) => bool_datum(true),
        _ => Datum::Null,
    })
}

fn eval_or(
    left: &Expr,
    right: &Expr,
    row: &[Datum],
    ctx: &mut EvalContext,
) -> Result<Datum, EvalError> {
    let lhs = to_int(&left.eval(row, ctx)?, ctx)?;
    if matches!(lhs, Some(v) if v != 0) {
        return Ok(bool_datum(true));
    }
    let rhs = to_int(&right.eval(row, ctx)?, ctx)?;
    Ok(match (lhs, rhs) {
        (_, Some(v)) if v != 0 => bool_datum(true),
        (Some(_), Some(_)) => bool_datum(false),
        _ => Datum::Null,
    })
}

fn compare(
    op: BinaryOp,
    lhs: &Datum,
    rhs: &Datum,
    ctx: &mut EvalContext,
) -> Result<Datum, EvalError> {
    let ordering = match (lhs, rhs) {
        (Datum::Null, _) | (_, Datum::Null) => return Ok(Datum::Null),
        (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
        (Datum::Str(a), Datum::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
        (Datum::Int(a), Datum::Str(b)) => a.cmp(&coerce_str(b, ctx)?),
        (Datum::Str(a), Datum::Int(b)) => coerce_str(a, ctx)?.cmp(b),
    };
    let holds = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        _ => unreachable!("`{}` is not a comparison operator", op),
    };
    Ok(bool_datum(holds))
}

fn arithmetic(
    op: BinaryOp,
    lhs: &Datum,
    rhs: &Datum,
    ctx: &mut EvalContext,
) -> Result<Datum, EvalError> {
    let (a, b) = match (to_int(lhs, ctx)?, to_int(rhs, ctx)?) {
        (Some(a), Some(b)) => (a, b),
        _ => return Ok(Datum::Null),
    };
    let result = match op {
        BinaryOp::Plus => a.checked_add(b),
        BinaryOp::Minus => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide | BinaryOp::Modulo if b == 0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Divide => a.checked_div(b),
        BinaryOp::Modulo => a.checked_rem(b),
        _ => unreachable!("`{}` is not an arithmetic operator", op),
    };
    result
        .map(Datum::Int)
        .ok_or_else(|| EvalError::Overflow(format!("({} {} {})", a, op, b)))
}
