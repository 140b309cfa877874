//! Options modifying the behavior of table mutations.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddRecordOptions {
    /// If true, the handle of the new record is not checked for duplication. Callers set it
    /// when the handle is known to be fresh.
    ///
    /// Default: false
    pub skip_handle_check: bool,
}

impl AddRecordOptions {
    pub fn skip_handle_check() -> Self {
        Self {
            skip_handle_check: true,
        }
    }
}
