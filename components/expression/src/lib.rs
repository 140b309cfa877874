//! Compiles SQL expression text into predicates evaluable over table rows.
//!
//! Supported syntax covers what partition clauses need: column references, integer and
//! string literals, `TRUE`/`FALSE`/`NULL`, arithmetic, comparisons, `AND`/`OR`/`NOT`
//! and `IS [NOT] NULL`. Evaluation follows three-valued logic; comparisons yield `1`/`0`.

pub mod context;
pub mod expr;

mod compile;
mod eval;

pub use crate::context::EvalContext;
pub use crate::expr::{BinaryOp, EvalType, Expr, UnaryOp};

use log::trace;
use model::{
    error::{CompileError, EvalError},
    Datum, TableInfo,
};

use crate::compile::Compiler;

/// A compiled expression together with the text it was compiled from.
///
/// Predicates are immutable once compiled and may be shared across threads; all mutable
/// evaluation state lives in the [`EvalContext`] supplied by the caller.
#[derive(Debug, Clone)]
pub struct Predicate {
    text: String,
    expr: Expr,
}

impl Predicate {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn eval(&self, row: &[Datum], ctx: &mut EvalContext) -> Result<Datum, EvalError> {
        self.expr.eval(row, ctx)
    }

    /// Evaluate to an integer signal: a positive value means the predicate holds for `row`.
    ///
    /// `None` is returned if the result is NULL.
    pub fn eval_int(&self, row: &[Datum], ctx: &mut EvalContext) -> Result<Option<i64>, EvalError> {
        let value = self.expr.eval(row, ctx)?;
        eval::to_int(&value, ctx)
    }
}

/// Compile `text` against the columns of `table`.
pub fn compile(text: &str, table: &TableInfo) -> Result<Predicate, CompileError> {
    let ast = compile::parse(text)?;
    let expr = Compiler::new(table).build(&ast)?;
    trace!("Compiled `{}` into {}", text, expr);
    Ok(Predicate {
        text: text.to_owned(),
        expr,
    })
}

/// Fold a constant expression, such as a partition boundary literal, into a value.
pub fn eval_const(text: &str, table: &TableInfo) -> Result<Datum, CompileError> {
    let predicate = compile(text, table)?;
    if !predicate.expr.is_constant() {
        return Err(CompileError::NotConstant(text.to_owned()));
    }
    let mut ctx = EvalContext::default();
    predicate
        .eval(&[], &mut ctx)
        .map_err(|source| CompileError::Fold {
            text: text.to_owned(),
            source,
        })
}
