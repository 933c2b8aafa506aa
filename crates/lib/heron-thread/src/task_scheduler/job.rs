use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

struct JobState {
    finished: Mutex<bool>,
    condvar: Condvar,
}

pub(crate) struct Job {
    func: Box<dyn FnOnce() + Send>,
    state: Arc<JobState>,
}

impl Job {
    pub fn new(func: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            func,
            state: Arc::new(JobState {
                finished: Mutex::new(false),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn handle(&self) -> JobHandle {
        JobHandle {
            state: self.state.clone(),
        }
    }

    pub fn execute(self) {
        (self.func)();

        *self.state.finished.lock() = true;
        self.state.condvar.notify_all();
    }
}

/// Completion handle of a submitted job.
#[derive(Clone)]
pub struct JobHandle {
    state: Arc<JobState>,
}

impl JobHandle {
    pub fn is_finished(&self) -> bool {
        *self.state.finished.lock()
    }

    /// Block the calling thread until the job has run to completion.
    pub fn wait(&self) {
        let mut finished = self.state.finished.lock();
        while !*finished {
            self.state.condvar.wait(&mut finished);
        }
    }
}
