//! Fixed-size worker pool on a dedicated rayon thread pool. Workers pull the next unit
//! of work through a cursor guarded by a mutex, run it without holding the lock, and
//! are all finished before the call returns. Parallel iterators used by the work itself
//! (`EvolvedLayer::tick`) run on the same threads, so the pool size bounds everything.

use std::sync::{Mutex, MutexGuard};

use rayon::{ThreadPool, ThreadPoolBuilder};

use super::error::ConfigError;

pub const DEFAULT_THREADS: usize = 4;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // a panicking worker is re-raised when the scope ends, the cursor itself stays usable
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub fn new(threads: usize) -> Result<WorkerPool, ConfigError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("cosyne-worker-{i}"))
            .build()?;
        Ok(WorkerPool { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `f` inside the pool, so any rayon parallel iterator it uses stays on these threads.
    pub fn install<R, F>(&self, f: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        self.pool.install(f)
    }

    /// Runs `f` once for every item. No two workers ever receive the same index.
    pub fn for_each_mut<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        let n_workers = self.threads().min(items.len());
        if n_workers == 0 {
            return;
        }
        let cursor = Mutex::new(items.iter_mut().enumerate());
        let f = &f;
        let cursor = &cursor;
        self.pool.scope(|scope| {
            for _ in 0..n_workers {
                scope.spawn(move |_| loop {
                    let claimed = lock(cursor).next();
                    match claimed {
                        Some((index, item)) => f(index, item),
                        None => break,
                    }
                });
            }
        });
    }

    /// Computes `f` for every item and returns the results in item order.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync,
    {
        let n_workers = self.threads().min(items.len());
        if n_workers == 0 {
            return Vec::new();
        }
        let cursor = Mutex::new(0usize);
        let collected = Mutex::new(Vec::with_capacity(items.len()));
        {
            let f = &f;
            let cursor = &cursor;
            let collected = &collected;
            self.pool.scope(|scope| {
                for _ in 0..n_workers {
                    scope.spawn(move |_| {
                        let mut done = Vec::new();
                        loop {
                            let index = {
                                let mut next = lock(cursor);
                                if *next >= items.len() {
                                    break;
                                }
                                *next += 1;
                                *next - 1
                            };
                            done.push((index, f(index, &items[index])));
                        }
                        lock(collected).extend(done);
                    });
                }
            });
        }
        let mut collected = collected.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        collected.sort_unstable_by_key(|(index, _)| *index);
        collected.into_iter().map(|(_, result)| result).collect()
    }
}
