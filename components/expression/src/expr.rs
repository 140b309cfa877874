use std::fmt::{self, Display, Formatter};

use model::Datum;

/// Static type of an expression, inferred at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalType {
    Int,
    Str,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,
    NotEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::Eq
                | BinaryOp::NotEq
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Compiled expression tree. Columns are resolved to row offsets.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column {
        offset: usize,
        name: String,
        ty: EvalType,
    },
    Literal(Datum),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn unary(op: UnaryOp, expr: Expr) -> Self {
        Expr::Unary {
            op,
            expr: Box::new(expr),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn eval_type(&self) -> EvalType {
        match self {
            Expr::Column { ty, .. } => *ty,
            Expr::Literal(Datum::Null) => EvalType::Null,
            Expr::Literal(Datum::Int(_)) => EvalType::Int,
            Expr::Literal(Datum::Str(_)) => EvalType::Str,
            // Arithmetic, comparison and logical operators all yield integers.
            Expr::Unary { .. } | Expr::Binary { .. } => EvalType::Int,
        }
    }

    /// True if the expression does not reference any column.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Column { .. } => false,
            Expr::Literal(_) => true,
            Expr::Unary { expr, .. } => expr.is_constant(),
            Expr::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
        }
    }

    /// Offsets of the referenced columns, sorted and deduplicated.
    pub fn columns(&self) -> Vec<usize> {
        let mut offsets = vec![];
        self.collect_columns(&mut offsets);
        offsets.sort_unstable();
        offsets.dedup();
        offsets
    }

    fn collect_columns(&self, offsets: &mut Vec<usize>) {
        match self {
            Expr::Column { offset, .. } => offsets.push(*offset),
            Expr::Literal(_) => {}
            Expr::Unary { expr, .. } => expr.collect_columns(offsets),
            Expr::Binary { left, right, .. } => {
                left.collect_columns(offsets);
                right.collect_columns(offsets);
            }
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column { name, .. } => write!(f, "{}", name),
            Expr::Literal(datum) => write!(f, "{}", datum),
            Expr::Unary { op, expr } => match op {
                UnaryOp::Neg => write!(f, "-{}", expr),
                UnaryOp::Not => write!(f, "NOT {}", expr),
                UnaryOp::IsNull => write!(f, "{} IS NULL", expr),
                UnaryOp::IsNotNull => write!(f, "{} IS NOT NULL", expr),
            },
            Expr::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
        }
    }
}
