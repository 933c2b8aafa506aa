use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use crossbeam_deque::{Injector, Stealer, Worker as LocalQueue};

use super::job::Job;

pub(crate) struct Worker {
    name: String,
    /// Held until `launch` moves it onto the worker thread.
    local: Option<LocalQueue<Job>>,
    stealer: Stealer<Job>,
    shared_queue: Arc<Injector<Job>>,
    idle: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

// `local` is a `crossbeam_deque::Worker`, which is intentionally `!Sync` since it is meant
// to be owned by a single thread. Here it is only ever touched by the owning `Worker` before
// `launch` moves it onto its dedicated thread; afterwards the field is `None` and untouched,
// so no two threads ever access it concurrently.
unsafe impl Sync for Worker {}

impl Worker {
    pub fn new(shared_queue: Arc<Injector<Job>>, name: String) -> Self {
        let local = LocalQueue::new_fifo();
        let stealer = local.stealer();

        Self {
            name,
            local: Some(local),
            stealer,
            shared_queue,
            idle: Arc::new(AtomicBool::new(true)),
            thread: None,
        }
    }

    pub fn stealer(&self) -> Stealer<Job> {
        self.stealer.clone()
    }

    pub fn launch(&mut self, siblings: Vec<Stealer<Job>>, stop: Arc<AtomicBool>) {
        let local = self.local.take().expect("Worker was launched twice!");
        let shared_queue = self.shared_queue.clone();
        let idle = self.idle.clone();

        let thread = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || loop {
                let job = find_job(&local, &shared_queue, &siblings);

                match job {
                    Some(job) => {
                        idle.store(false, Ordering::SeqCst);
                        job.execute();
                    }
                    None => {
                        idle.store(true, Ordering::SeqCst);
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                        thread::yield_now();
                    }
                }
            })
            .expect("Failed to spawn worker thread!");

        self.thread = Some(thread);
    }

    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join().expect("Worker thread panicked!");
        }
    }
}

fn find_job(
    local: &LocalQueue<Job>,
    shared_queue: &Injector<Job>,
    siblings: &[Stealer<Job>],
) -> Option<Job> {
    local.pop().or_else(|| {
        std::iter::repeat_with(|| {
            shared_queue
                .steal_batch_and_pop(local)
                .or_else(|| siblings.iter().map(|s| s.steal()).collect())
        })
        .find(|steal| !steal.is_retry())
        .and_then(|steal| steal.success())
    })
}
