//! A per-object, reentrant, timeout-bounded read/write lock.
//!
//! Readers or one writer may hold an object's lock at a time, a thread may reacquire a lock it
//! already holds, and an acquire attempt gives up after a bounded wait rather than blocking
//! indefinitely, built on `parking_lot`'s `Mutex`/`Condvar` rather than the filesystem.
//!
//! Lock entries are held in a map of `Weak` references: once every guard referencing an object's
//! lock state has been dropped, the `Arc` refcount that state lives behind drops to zero and the
//! entry is reclaimed the next time that object is looked up. `Arc`/`Weak` does this for free, so
//! there's no need for the eviction timer a garbage-collected language would reach for.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::ocfl::error::{OcflError, Result};

/// The default amount of time a caller will wait to acquire a lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LockKind {
    Read,
    Write,
}

struct LockInner {
    /// Reentrant read-hold counts, keyed by thread.
    readers: HashMap<ThreadId, u32>,
    /// The thread currently holding the write lock, and its reentrancy count.
    writer: Option<(ThreadId, u32)>,
}

struct LockState {
    inner: Mutex<LockInner>,
    condvar: Condvar,
}

impl LockState {
    fn new() -> Self {
        Self {
            inner: Mutex::new(LockInner {
                readers: HashMap::new(),
                writer: None,
            }),
            condvar: Condvar::new(),
        }
    }
}

/// Manages one reentrant read/write lock per object ID.
pub struct ObjectLockManager {
    locks: Mutex<HashMap<String, Weak<LockState>>>,
    timeout: Duration,
}

impl Default for ObjectLockManager {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl ObjectLockManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn state_for(&self, object_id: &str) -> Arc<LockState> {
        let mut locks = self.locks.lock();

        if let Some(existing) = locks.get(object_id).and_then(Weak::upgrade) {
            return existing;
        }

        let state = Arc::new(LockState::new());
        locks.insert(object_id.to_string(), Arc::downgrade(&state));
        state
    }

    /// Acquires a read lock on `object_id`, runs `f`, and releases the lock, even if `f` panics.
    ///
    /// If the lock is already held for write by another thread, this blocks up to the
    /// manager's configured timeout before returning `OcflError::LockAcquire`.
    pub fn do_in_read_lock<T>(&self, object_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.read_lock(object_id)?;
        f()
    }

    /// Acquires a write lock on `object_id`, runs `f`, and releases the lock, even if `f` panics.
    pub fn do_in_write_lock<T>(&self, object_id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let _guard = self.write_lock(object_id)?;
        f()
    }

    pub fn read_lock(&self, object_id: &str) -> Result<LockGuard> {
        let state = self.state_for(object_id);
        let thread = thread::current().id();
        let deadline = Instant::now() + self.timeout;

        let mut inner = state.inner.lock();

        loop {
            if let Some((writer_thread, _)) = inner.writer {
                if writer_thread == thread {
                    // This thread already holds the write lock, which implies read access.
                    *inner.readers.entry(thread).or_insert(0) += 1;
                    break;
                }
            } else {
                *inner.readers.entry(thread).or_insert(0) += 1;
                break;
            }

            if inner.readers.contains_key(&thread) {
                // Reentrant read while a different thread waits to write: allow it rather than
                // risk deadlocking the thread against itself.
                *inner.readers.get_mut(&thread).unwrap() += 1;
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(OcflError::LockAcquire(object_id.to_string()));
            }

            let timed_out = state
                .condvar
                .wait_for(&mut inner, deadline - now)
                .timed_out();
            if timed_out && inner.writer.is_some() {
                return Err(OcflError::LockAcquire(object_id.to_string()));
            }
        }

        Ok(LockGuard {
            state,
            kind: LockKind::Read,
            thread,
        })
    }

    pub fn write_lock(&self, object_id: &str) -> Result<LockGuard> {
        let state = self.state_for(object_id);
        let thread = thread::current().id();
        let deadline = Instant::now() + self.timeout;

        let mut inner = state.inner.lock();

        loop {
            match inner.writer {
                Some((writer_thread, count)) if writer_thread == thread => {
                    inner.writer = Some((writer_thread, count + 1));
                    break;
                }
                None if inner.readers.is_empty() => {
                    inner.writer = Some((thread, 1));
                    break;
                }
                None if inner.readers.len() == 1 && inner.readers.contains_key(&thread) => {
                    // This thread holds only a read lock and is trying to upgrade. Like
                    // `java.util.concurrent.locks.ReentrantReadWriteLock`, upgrading is not
                    // supported: it can deadlock against other readers, so fail fast instead.
                    return Err(OcflError::Lock(format!(
                        "Thread already holds a read lock on object {} and cannot upgrade it to a write lock",
                        object_id
                    )));
                }
                _ => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(OcflError::LockAcquire(object_id.to_string()));
            }

            state.condvar.wait_for(&mut inner, deadline - now);
        }

        Ok(LockGuard {
            state,
            kind: LockKind::Write,
            thread,
        })
    }
}

/// An acquired lock on an object. The lock is released when this value is dropped.
pub struct LockGuard {
    state: Arc<LockState>,
    kind: LockKind,
    thread: ThreadId,
}

impl LockGuard {
    pub fn kind(&self) -> LockKind {
        self.kind
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let mut inner = self.state.inner.lock();

        match self.kind {
            LockKind::Read => {
                if let Some(count) = inner.readers.get_mut(&self.thread) {
                    *count -= 1;
                    if *count == 0 {
                        inner.readers.remove(&self.thread);
                    }
                }
            }
            LockKind::Write => {
                if let Some((writer_thread, count)) = inner.writer {
                    if writer_thread == self.thread {
                        if count <= 1 {
                            inner.writer = None;
                        } else {
                            inner.writer = Some((writer_thread, count - 1));
                        }
                    }
                }
            }
        }

        drop(inner);
        self.state.condvar.notify_all();
    }
}
