use std::cell::OnceCell;

/// A value resolved on first access and reused afterwards.
///
/// Later changes to whatever produced the value do not affect it.
#[derive(Debug, Clone)]
pub struct Deferred<T> {
    cell: OnceCell<T>,
}

impl<T> Deferred<T> {
    pub fn new() -> Self {
        Deferred {
            cell: OnceCell::new(),
        }
    }

    /// The value, resolving it with `resolve` if this is the first access.
    pub fn get_or_resolve(&self, resolve: impl FnOnce() -> T) -> &T {
        self.cell.get_or_init(resolve)
    }

    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}
