mod job;
mod worker;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crossbeam_deque::Injector;

use job::Job;
use worker::Worker;

pub use job::JobHandle;

/// Work-stealing task scheduler.
///
/// Jobs pushed into the shared queue are picked up by the worker threads;
/// idle workers steal from their siblings. Completion is observed through
/// [`JobHandle`]s, there is no result channel.
pub struct TaskScheduler {
    /// Shared by all the worker threads, any of them can steal jobs from here.
    shared_queue: Arc<Injector<Job>>,
    /// Used to ask every worker thread to wind down.
    stop: Arc<AtomicBool>,
    workers: Vec<Worker>,
}

impl TaskScheduler {
    /// Create a scheduler and spawn its worker threads immediately.
    pub fn new(num_workers: usize) -> Self {
        assert!(num_workers > 0);

        let shared_queue = Arc::new(Injector::new());
        let stop = Arc::new(AtomicBool::new(false));

        let mut workers: Vec<Worker> = (0..num_workers)
            .map(|i| Worker::new(shared_queue.clone(), format!("heron worker {}", i)))
            .collect();

        for i in 0..workers.len() {
            let siblings = workers
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != i)
                .map(|(_, w)| w.stealer())
                .collect::<Vec<_>>();

            workers[i].launch(siblings, stop.clone());
        }

        log::debug!("Task scheduler running with {} workers", num_workers);

        Self {
            shared_queue,
            stop,
            workers,
        }
    }

    #[inline]
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Submit a job, returning a handle that can be waited on.
    pub fn spawn<F>(&self, func: F) -> JobHandle
    where
        F: FnOnce() + Send + 'static,
    {
        let job = Job::new(Box::new(func));
        let handle = job.handle();
        self.shared_queue.push(job);
        handle
    }

    /// Pop one pending job and run it on the calling thread.
    ///
    /// Useful while blocking on a handle to avoid idling the waiter.
    pub fn help_once(&self) -> bool {
        if let Some(job) = self.shared_queue.steal().success() {
            job.execute();
            true
        } else {
            false
        }
    }

    /// Block until every handle in `handles` has completed, contributing the
    /// calling thread to the queue in the meantime.
    pub fn wait_all(&self, handles: &[JobHandle]) {
        for handle in handles {
            while !handle.is_finished() {
                if !self.help_once() {
                    handle.wait();
                }
            }
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);

        for worker in self.workers.drain(..) {
            worker.join();
        }
        // remaining queued jobs are dropped with the queue
    }
}
