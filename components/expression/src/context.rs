use log::trace;

/// Per-call evaluation state.
///
/// A context is owned by exactly one caller at a time, which keeps compiled predicates free of
/// shared mutable state and lets them be evaluated concurrently.
#[derive(Debug)]
pub struct EvalContext {
    /// In strict mode, a string that cannot be converted to the integer an operator needs
    /// fails the evaluation instead of being truncated.
    strict: bool,

    warnings: Vec<String>,
}

impl EvalContext {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            warnings: vec![],
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub(crate) fn append_warning(&mut self, warning: String) {
        trace!("Evaluation warning: {}", warning);
        self.warnings.push(warning);
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new(true)
    }
}
