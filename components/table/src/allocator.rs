use std::sync::atomic::{AtomicI64, Ordering};

use model::Handle;

/// Source of row handles.
///
/// One allocator is shared by a table and all of its partitions, which keeps handles
/// unique table-wide even though each partition has its own key space.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    base: AtomicI64,
}

impl HandleAllocator {
    pub fn new(base: Handle) -> Self {
        Self {
            base: AtomicI64::new(base),
        }
    }

    /// Allocate the next handle, which is greater than every handle allocated or rebased before.
    pub fn alloc(&self) -> Handle {
        self.base.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Make sure handles allocated afterwards are greater than `handle`.
    pub fn rebase(&self, handle: Handle) {
        self.base.fetch_max(handle, Ordering::SeqCst);
    }

    pub fn base(&self) -> Handle {
        self.base.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::HandleAllocator;
    use std::sync::Arc;

    #[test]
    fn test_alloc() {
        let allocator = HandleAllocator::default();
        assert_eq!(1, allocator.alloc());
        assert_eq!(2, allocator.alloc());

        allocator.rebase(100);
        assert_eq!(101, allocator.alloc());

        // Rebasing backwards has no effect.
        allocator.rebase(5);
        assert_eq!(102, allocator.alloc());
        assert_eq!(102, allocator.base());
    }

    #[test]
    fn test_concurrent_alloc() {
        let allocator = Arc::new(HandleAllocator::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || (0..100).map(|_| allocator.alloc()).collect::<Vec<_>>())
            })
            .collect();
        let mut all: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort();
        all.dedup();
        assert_eq!(400, all.len());
    }
}
