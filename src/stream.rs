//! Parallel producer, in-order consumer.
//!
//! [`OrderedStream`] runs `count` indexed tasks on a rayon pool of fixed size and
//! yields their results strictly in index order, no matter in which order they finish.
//! Used to load snapshot files for verification while the consumer walks them in sequence.

use crate::error::Result;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

struct Table<T> {
    done: HashMap<usize, T>,
    /// A task panicked; no result will ever arrive for its index.
    failed: Option<usize>,
}

struct Shared<T> {
    table: Mutex<Table<T>>,
    ready: Condvar,
    cancelled: AtomicBool,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Table<T>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Iterator over task results in index order.
///
/// Dropping the stream makes queued tasks return without running; the pool shuts down
/// once the tasks already running finish.
pub struct OrderedStream<T> {
    shared: Arc<Shared<T>>,
    next: usize,
    count: usize,
    _pool: rayon::ThreadPool,
}

impl<T: Send + 'static> OrderedStream<T> {
    /// Start a pool of `workers` threads (at least one) computing `task(0..count)`.
    pub fn spawn<F>(count: usize, workers: usize, task: F) -> Result<Self>
    where
        F: Fn(usize) -> T + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            table: Mutex::new(Table {
                done: HashMap::new(),
                failed: None,
            }),
            ready: Condvar::new(),
            cancelled: AtomicBool::new(false),
        });
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1).min(count.max(1)))
            .thread_name(|i| format!("diskgas-stream-{i}"))
            .build()?;
        let task = Arc::new(task);

        // FIFO so that low indices, which the consumer waits on first, start first.
        for i in 0..count {
            let shared = Arc::clone(&shared);
            let task = Arc::clone(&task);
            pool.spawn_fifo(move || {
                if shared.cancelled.load(Ordering::Relaxed) {
                    return;
                }
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(i)));
                let mut table = shared.lock();
                match outcome {
                    Ok(value) => {
                        table.done.insert(i, value);
                    }
                    Err(_) => {
                        tracing::error!(task = i, "stream task panicked; ending stream");
                        table.failed = Some(table.failed.map_or(i, |f| f.min(i)));
                        shared.cancelled.store(true, Ordering::Relaxed);
                    }
                }
                shared.ready.notify_all();
            });
        }

        Ok(Self {
            shared,
            next: 0,
            count,
            _pool: pool,
        })
    }
}

impl<T> OrderedStream<T> {
    /// Index of the next result to be yielded.
    pub fn position(&self) -> usize {
        self.next
    }
}

impl<T> Iterator for OrderedStream<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.next >= self.count {
            return None;
        }
        let mut table = self.shared.lock();
        loop {
            if let Some(value) = table.done.remove(&self.next) {
                self.next += 1;
                return Some(value);
            }
            if table.failed.is_some_and(|f| f <= self.next) {
                self.next = self.count;
                return None;
            }
            table = self
                .shared
                .ready
                .wait(table)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.next))
    }
}

impl<T> Drop for OrderedStream<T> {
    fn drop(&mut self) {
        self.shared.cancelled.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn yields_in_index_order_despite_completion_order() -> Result<()> {
        // Earlier indices sleep longer, so they finish last.
        let stream = OrderedStream::spawn(8, 4, |i| {
            thread::sleep(Duration::from_millis(((8 - i) * 5) as u64));
            i * 10
        })?;
        let out: Vec<usize> = stream.collect();
        assert_eq!(out, (0..8).map(|i| i * 10).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn empty_and_single_worker() -> Result<()> {
        assert_eq!(OrderedStream::spawn(0, 4, |i| i)?.count(), 0);
        let out: Vec<usize> = OrderedStream::spawn(5, 0, |i| i + 1)?.collect();
        assert_eq!(out, vec![1, 2, 3, 4, 5]);
        Ok(())
    }

    #[test]
    fn panicking_task_ends_stream() -> Result<()> {
        let stream = OrderedStream::spawn(6, 2, |i| {
            if i == 3 {
                panic!("task 3 failed");
            }
            i
        })?;
        let out: Vec<usize> = stream.collect();
        assert!(out.len() <= 3);
        assert_eq!(out, (0..out.len()).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn early_drop_does_not_hang() -> Result<()> {
        let mut stream = OrderedStream::spawn(100, 3, |i| {
            thread::sleep(Duration::from_millis(1));
            i
        })?;
        assert_eq!(stream.next(), Some(0));
        assert_eq!(stream.position(), 1);
        drop(stream);
        Ok(())
    }
}
