use model::{error::CompileError, ColumnType, Datum, TableInfo};
use sqlparser::{
    ast::{BinaryOperator, Expr as SqlExpr, UnaryOperator, Value},
    dialect::GenericDialect,
    parser::Parser,
    tokenizer::Token,
};

use crate::expr::{BinaryOp, EvalType, Expr, UnaryOp};

pub(crate) fn parse(text: &str) -> Result<SqlExpr, CompileError> {
    let parse_error = |reason: String| CompileError::Parse {
        text: text.to_owned(),
        reason,
    };

    let dialect = GenericDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(text)
        .map_err(|e| parse_error(e.to_string()))?;
    let expr = parser.parse_expr().map_err(|e| parse_error(e.to_string()))?;

    let next = parser.peek_token();
    if next.token != Token::EOF {
        return Err(parse_error(format!("unexpected trailing token `{}`", next.token)));
    }
    Ok(expr)
}

/// Resolves a parsed expression against the columns of a table and type-checks it.
pub(crate) struct Compiler<'a> {
    table: &'a TableInfo,
}

impl<'a> Compiler<'a> {
    pub(crate) fn new(table: &'a TableInfo) -> Self {
        Self { table }
    }

    pub(crate) fn build(&self, expr: &SqlExpr) -> Result<Expr, CompileError> {
        match expr {
            SqlExpr::Identifier(ident) => self.column(&ident.value),
            SqlExpr::CompoundIdentifier(idents) => match idents.last() {
                Some(ident) => self.column(&ident.value),
                None => Err(CompileError::Unsupported(expr.to_string())),
            },
            SqlExpr::Value(value) => literal(value).map(Expr::Literal),
            SqlExpr::Nested(inner) => self.build(inner),
            SqlExpr::IsNull(inner) => Ok(Expr::unary(UnaryOp::IsNull, self.build(inner)?)),
            SqlExpr::IsNotNull(inner) => {
                Ok(Expr::unary(UnaryOp::IsNotNull, self.build(inner)?))
            }
            SqlExpr::UnaryOp { op, expr: inner } => match op {
                UnaryOperator::Minus => {
                    // Fold `-<number>` directly so that i64::MIN stays representable.
                    if let SqlExpr::Value(Value::Number(number, _)) = inner.as_ref() {
                        return parse_int(&format!("-{}", number)).map(Expr::Literal);
                    }
                    let operand = self.build(inner)?;
                    require_int("-", &operand)?;
                    Ok(Expr::unary(UnaryOp::Neg, operand))
                }
                UnaryOperator::Plus => {
                    let operand = self.build(inner)?;
                    require_int("+", &operand)?;
                    Ok(operand)
                }
                UnaryOperator::Not => {
                    let operand = self.build(inner)?;
                    require_int("NOT", &operand)?;
                    Ok(Expr::unary(UnaryOp::Not, operand))
                }
                _ => Err(CompileError::Unsupported(expr.to_string())),
            },
            SqlExpr::BinaryOp { left, op, right } => {
                let op = binary_op(op).ok_or_else(|| CompileError::Unsupported(expr.to_string()))?;
                let left = self.build(left)?;
                let right = self.build(right)?;
                check_binary(op, &left, &right)?;
                Ok(Expr::binary(op, left, right))
            }
            _ => Err(CompileError::Unsupported(expr.to_string())),
        }
    }

    fn column(&self, name: &str) -> Result<Expr, CompileError> {
        let column = self
            .table
            .find_column(name)
            .ok_or_else(|| CompileError::UnknownColumn(name.to_owned()))?;
        let ty = match column.ty {
            ColumnType::Int => EvalType::Int,
            ColumnType::Varchar => EvalType::Str,
        };
        Ok(Expr::Column {
            offset: column.offset,
            name: column.name.clone(),
            ty,
        })
    }
}

fn literal(value: &Value) -> Result<Datum, CompileError> {
    match value {
        Value::Number(number, _) => parse_int(number),
        Value::SingleQuotedString(s) => Ok(Datum::Str(s.clone())),
        Value::Boolean(b) => Ok(Datum::Int(*b as i64)),
        Value::Null => Ok(Datum::Null),
        _ => Err(CompileError::Unsupported(value.to_string())),
    }
}

fn parse_int(text: &str) -> Result<Datum, CompileError> {
    match text.parse::<i64>() {
        Ok(v) => Ok(Datum::Int(v)),
        Err(_) if text.contains(&['.', 'e', 'E'][..]) => Err(CompileError::Unsupported(format!(
            "non-integer literal {}",
            text
        ))),
        Err(_) => Err(CompileError::IntegerOverflow(text.to_owned())),
    }
}

fn binary_op(op: &BinaryOperator) -> Option<BinaryOp> {
    let op = match op {
        BinaryOperator::Plus => BinaryOp::Plus,
        BinaryOperator::Minus => BinaryOp::Minus,
        BinaryOperator::Multiply => BinaryOp::Multiply,
        // Rows hold integers only, so `/` and `DIV` both truncate.
        BinaryOperator::Divide | BinaryOperator::MyIntegerDivide => BinaryOp::Divide,
        BinaryOperator::Modulo => BinaryOp::Modulo,
        BinaryOperator::Lt => BinaryOp::Lt,
        BinaryOperator::LtEq => BinaryOp::LtEq,
        BinaryOperator::Gt => BinaryOp::Gt,
        BinaryOperator::GtEq => BinaryOp::GtEq,
        BinaryOperator::Eq => BinaryOp::Eq,
        BinaryOperator::NotEq => BinaryOp::NotEq,
        BinaryOperator::And => BinaryOp::And,
        BinaryOperator::Or => BinaryOp::Or,
        _ => return None,
    };
    Some(op)
}

/// A string literal in integer position is accepted only if it reads as an integer.
fn int_compatible(expr: &Expr) -> bool {
    match expr.eval_type() {
        EvalType::Int | EvalType::Null => true,
        EvalType::Str => {
            matches!(expr, Expr::Literal(Datum::Str(s)) if s.trim().parse::<i64>().is_ok())
        }
    }
}

fn require_int(op: &str, operand: &Expr) -> Result<(), CompileError> {
    if int_compatible(operand) {
        Ok(())
    } else {
        Err(CompileError::TypeMismatch(format!(
            "`{}` requires an integer operand, found `{}`",
            op, operand
        )))
    }
}

fn check_binary(op: BinaryOp, left: &Expr, right: &Expr) -> Result<(), CompileError> {
    if op.is_comparison() {
        let compatible = match (left.eval_type(), right.eval_type()) {
            (EvalType::Null, _) | (_, EvalType::Null) => true,
            (EvalType::Int, EvalType::Int) | (EvalType::Str, EvalType::Str) => true,
            _ => int_compatible(left) && int_compatible(right),
        };
        if compatible {
            return Ok(());
        }
        return Err(CompileError::TypeMismatch(format!(
            "cannot compare `{}` with `{}`",
            left, right
        )));
    }

    require_int(op.symbol(), left)?;
    require_int(op.symbol(), right)
}
