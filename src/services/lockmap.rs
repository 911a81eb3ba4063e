use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

/// Mutation lock for one project root. Mutating calls against the same
/// canonical root serialize through this lock; different roots proceed in
/// parallel. Read-only calls (history, log reads, validation) never take it.
pub fn root_lock(root: &Path) -> Arc<Mutex<()>> {
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = acquire(locks);
    map.entry(root.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
}

/// The lock only guards ordering, so a poisoned guard is still usable.
pub fn acquire<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::root_lock;
    use std::path::Path;
    use std::sync::Arc;

    #[test]
    fn same_root_shares_one_lock() {
        let a = root_lock(Path::new("/tmp/lockmap-test-project"));
        let b = root_lock(Path::new("/tmp/lockmap-test-project"));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn different_roots_get_distinct_locks() {
        let a = root_lock(Path::new("/tmp/lockmap-test-a"));
        let b = root_lock(Path::new("/tmp/lockmap-test-b"));
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
