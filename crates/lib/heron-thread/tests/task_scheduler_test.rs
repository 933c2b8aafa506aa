use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use heron_thread::TaskScheduler;

#[test]
pub fn test_jobs_run_to_completion() {
    let scheduler = TaskScheduler::new(4);
    let counter = Arc::new(AtomicU32::new(0));

    let handles = (0..64)
        .map(|_| {
            let counter = counter.clone();
            scheduler.spawn(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect::<Vec<_>>();

    scheduler.wait_all(&handles);
    assert_eq!(64, counter.load(Ordering::SeqCst));
}

#[test]
pub fn test_wait_on_single_handle() {
    let scheduler = TaskScheduler::new(2);
    let flag = Arc::new(AtomicU32::new(0));

    let handle = {
        let flag = flag.clone();
        scheduler.spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            flag.store(1, Ordering::SeqCst);
        })
    };

    handle.wait();
    assert_eq!(1, flag.load(Ordering::SeqCst));
    assert!(handle.is_finished());
}

#[test]
pub fn test_global_scheduler_is_shared() {
    let a = heron_thread::global();
    let b = heron_thread::global();

    assert!(std::ptr::eq(a, b));
    assert!(a.num_workers() > 0);
}
