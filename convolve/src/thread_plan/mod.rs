//! Work distribution for the convolution phases.
//!
//! A [`ThreadPlan`] splits a flat index space (output pixels, or FFT rows and
//! columns) between a fixed number of threads in round-robin order: index `i`
//! goes to thread `i % T`. Every phase spawns its own short-lived scoped
//! threads, and the coordinating thread waits on a barrier together with the
//! workers before the next phase may start.

#[cfg(test)]
mod tests;

use std::sync::Barrier;
use std::thread;

/// Terminates every row of the index table. Larger than any valid index.
pub const SENTINEL: usize = usize::MAX;

#[derive(Debug, Clone)]
pub struct ThreadPlan {
    table: Vec<usize>,
    num_threads: usize,
    columns: usize,
    len: usize,
}

impl ThreadPlan {
    /// Distributes `len` indices between at most `num_threads` threads.
    ///
    /// The thread count is clamped to `[1, len]` so that no thread is spawned
    /// without work. Row `t` of the table holds the indices assigned to thread
    /// `t` followed by [`SENTINEL`].
    pub fn distribute(len: usize, num_threads: usize) -> Self {
        let num_threads = num_threads.min(len).max(1);
        let columns = len / num_threads + 2;

        let mut table = vec![SENTINEL; num_threads * columns];
        for i in 0..len {
            table[(i % num_threads) * columns + i / num_threads] = i;
        }

        Self {
            table,
            num_threads,
            columns,
            len,
        }
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    /// Row length of the index table, sentinel slots included.
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Total number of distributed indices.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw table row for `thread`, including the sentinel tail.
    pub fn row(&self, thread: usize) -> &[usize] {
        assert!(thread < self.num_threads, "thread {thread} out of range");
        &self.table[thread * self.columns..(thread + 1) * self.columns]
    }

    /// Indices assigned to `thread`, in increasing order.
    pub fn indices(&self, thread: usize) -> impl Iterator<Item = usize> + '_ {
        self.row(thread)
            .iter()
            .copied()
            .take_while(|&i| i != SENTINEL)
    }

    /// Rendezvous point for the workers plus the coordinating thread.
    pub fn make_barrier(&self) -> Barrier {
        Barrier::new(self.num_threads + 1)
    }

    /// Runs one parallel phase and returns once every worker has finished.
    ///
    /// `work(thread, indices)` is called once on each spawned thread with the
    /// indices of its table row. Workers and the caller meet on a barrier
    /// built for this phase only.
    ///
    /// A thread that cannot be spawned aborts the process: the workers
    /// already started would otherwise wait on the barrier forever.
    pub fn run<F>(&self, phase: &str, work: F)
    where
        F: Fn(usize, &mut dyn Iterator<Item = usize>) + Sync,
    {
        let barrier = self.make_barrier();
        let work = &work;
        let barrier_ref = &barrier;

        thread::scope(|scope| {
            for t in 0..self.num_threads {
                let spawned = thread::Builder::new()
                    .name(format!("{phase}-{t}"))
                    .spawn_scoped(scope, move || {
                        let _arrive = Arrive(barrier_ref);
                        work(t, &mut self.indices(t));
                    });
                if let Err(e) = spawned {
                    tracing::error!("Failed to spawn {phase} worker {t}: {e}");
                    std::process::abort();
                }
            }
            barrier.wait();
        });

        tracing::trace!(phase, threads = self.num_threads, items = self.len, "phase done");
    }
}

/// Arrives on the barrier when dropped, so a panicking worker still releases
/// the coordinator and the panic surfaces when the scope joins.
struct Arrive<'a>(&'a Barrier);

impl Drop for Arrive<'_> {
    fn drop(&mut self) {
        self.0.wait();
    }
}
