use std::{
    ptr::NonNull,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    thread::{Thread, available_parallelism, spawn},
};

/// A fixed pool of parked worker threads executing borrowed job slices.
/// The calling thread participates as worker zero, so a one-thread pool
/// runs everything inline.
pub struct ThreadPool {
    inner: Arc<Inner>,
    workers: Vec<Thread>,
}

impl ThreadPool {
    pub fn new() -> Self {
        Self::with_threads(available_parallelism().map(|n| n.get()).unwrap_or(1))
    }

    pub fn with_threads(threads: usize) -> Self {
        let inner = Arc::new(Inner::new());
        let workers = (0..threads.max(1) - 1)
            .map(|index| {
                let inner = inner.clone();
                spawn(move || {
                    while !inner.is_closed() {
                        match inner.take_job() {
                            Some(job) => inner.run_job(job, index + 1),
                            None => std::thread::park(),
                        }
                    }
                })
                .thread()
                .clone()
            })
            .collect();
        Self { inner, workers }
    }

    pub fn num_threads(&self) -> usize {
        1 + self.workers.len()
    }

    /// Run `func` once per job across the pool and block until every
    /// invocation has finished.
    pub fn execute<'a, T: 'a + Send>(
        &mut self,
        jobs: impl IntoIterator<Item = &'a T>,
        func: impl Fn(&'a T, usize) + Send + Sync,
    ) {
        let runner = |job: *const (), worker: usize| {
            // SAFETY: every pointer in the queue came from the iterator
            // below, and the runner is uninstalled (which waits for all
            // in-flight invocations) before `execute` returns
            func(unsafe { &*(job as *const T) }, worker);
        };

        self.inner.with_runner(&runner, || {
            let queued = self
                .inner
                .queue_jobs(jobs.into_iter().map(|job| job as *const T as *const ()));

            for worker in self.workers.iter().take(queued.max(1) - 1) {
                worker.unpark();
            }

            while let Some(job) = self.inner.take_job() {
                self.inner.run_job(job, 0);
            }
        });
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.inner.close();
        self.workers.iter().for_each(|w| w.unpark());
    }
}

unsafe impl Send for Inner {}
unsafe impl Sync for Inner {}

struct Inner {
    closed: AtomicBool,
    queue: Mutex<Vec<*const ()>>,
    // Holding the read lock while a job runs makes the uninstall (a write
    // lock) double as the completion barrier.
    runner: RwLock<Option<NonNull<dyn Fn(*const (), usize) + Send + Sync>>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            closed: AtomicBool::new(false),
            queue: Mutex::new(Vec::new()),
            runner: RwLock::new(None),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    fn take_job(&self) -> Option<*const ()> {
        self.queue.lock().unwrap().pop()
    }

    fn queue_jobs(&self, jobs: impl IntoIterator<Item = *const ()>) -> usize {
        let mut queue = self.queue.lock().unwrap();
        queue.extend(jobs);
        queue.len()
    }

    fn run_job(&self, job: *const (), worker: usize) {
        let runner = self.runner.read().unwrap();
        if let Some(runner) = *runner {
            unsafe { runner.as_ref()(job, worker) };
        }
    }

    fn with_runner(&self, runner: &(dyn Fn(*const (), usize) + Send + Sync), f: impl FnOnce()) {
        // SAFETY: erasing the borrow's lifetime is sound because the write
        // lock below (dropping the entry back to `None`) is not released
        // until `f` has returned, so no erased reference outlives `runner`.
        let erased: &(dyn Fn(*const (), usize) + Send + Sync + 'static) =
            unsafe { std::mem::transmute(runner) };
        *self.runner.write().unwrap() = Some(NonNull::from(erased));

        f();

        // blocks until the last in-flight job drops its read lock
        *self.runner.write().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn every_job_runs_exactly_once() {
        let mut pool = ThreadPool::new();
        let total = AtomicUsize::new(0);

        let jobs: Vec<usize> = (1..=500).collect();
        pool.execute(&jobs, |job, _| {
            total.fetch_add(*job, Ordering::Relaxed);
        });

        assert_eq!(total.load(Ordering::Relaxed), 500 * 501 / 2);
    }

    #[test]
    fn single_thread_pools_run_inline() {
        let mut pool = ThreadPool::with_threads(1);
        assert_eq!(pool.num_threads(), 1);
        let count = AtomicUsize::new(0);
        let jobs = [(); 16];
        pool.execute(&jobs, |_, worker| {
            assert_eq!(worker, 0);
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 16);
    }

    #[test]
    fn execute_waits_for_stragglers() {
        let mut pool = ThreadPool::with_threads(4);
        let done = AtomicUsize::new(0);
        let jobs: Vec<usize> = (0..8).collect();
        pool.execute(&jobs, |_, _| {
            std::thread::sleep(Duration::from_millis(10));
            done.fetch_add(1, Ordering::Relaxed);
        });
        // the barrier in execute means all jobs finished before it returned
        assert_eq!(done.load(Ordering::Relaxed), 8);
    }
}
