use std::sync::{LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

/// Keep serving the entry list after a panic elsewhere poisoned its lock.
fn recover<G>(result: LockResult<G>, op: &'static str, access: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            access,
            backend = "memory",
            "Entry list lock was poisoned, continuing with its last contents"
        );
        poisoned.into_inner()
    })
}

pub(crate) fn read_entries<'a, T>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), op, "read")
}

pub(crate) fn write_entries<'a, T>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), op, "write")
}
