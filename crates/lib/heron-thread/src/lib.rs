mod task_scheduler;

pub use task_scheduler::{JobHandle, TaskScheduler};

use once_cell::sync::Lazy;

static GLOBAL_SCHEDULER: Lazy<TaskScheduler> =
    Lazy::new(|| TaskScheduler::new(num_cpus::get().max(1)));

/// The process-wide task scheduler.
///
/// Lazily spawns one worker per CPU core on first use and lives for the
/// remainder of the process.
pub fn global() -> &'static TaskScheduler {
    &GLOBAL_SCHEDULER
}
