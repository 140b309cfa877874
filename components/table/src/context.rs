use expression::EvalContext;

/// State of the session performing a table mutation.
///
/// Each session owns its context; contexts are never shared between concurrent callers.
#[derive(Debug, Default)]
pub struct SessionContext {
    eval: EvalContext,
}

impl SessionContext {
    pub fn new(strict: bool) -> Self {
        Self {
            eval: EvalContext::new(strict),
        }
    }

    pub fn eval_ctx(&self) -> &EvalContext {
        &self.eval
    }

    pub fn eval_ctx_mut(&mut self) -> &mut EvalContext {
        &mut self.eval
    }
}
