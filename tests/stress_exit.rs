//! Stress tests for exit coordination across many threads

use coordinated_exit::{
    exit_with_errorf, manual_interrupt, reason, CombinedFailure, ExitCoordinator, WorkerFailure,
};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[test]
fn stress_every_failure_is_reported() {
    const WORKERS: usize = 32;
    let exit = ExitCoordinator::new();
    let start = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|id| {
            let exit = exit.clone();
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                if id % 4 == 0 {
                    exit.exit_without_error();
                } else {
                    exit.exit_with_errorf(format_args!("worker {}", id));
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let got = exit.wait_for_exit().unwrap();
    let combined = got.downcast_ref::<CombinedFailure>().unwrap();
    let messages: HashSet<String> = combined.iter().map(|r| r.to_string()).collect();
    let expected: HashSet<String> = (0..WORKERS)
        .filter(|id| id % 4 != 0)
        .map(|id| format!("worker {}", id))
        .collect();
    assert_eq!(messages, expected);
}

#[test]
fn stress_waiters_and_signalers_interleave() {
    for round in 0..100 {
        let exit = ExitCoordinator::new();
        let mut handles = Vec::new();

        for i in 0..6 {
            let exit = exit.clone();
            handles.push(thread::spawn(move || {
                if (i + round) % 3 == 0 {
                    exit.exit_without_error();
                    None
                } else {
                    exit.wait_for_exit().map(|r| r.to_string())
                }
            }));
        }
        for h in handles {
            assert_eq!(h.join().unwrap(), None);
        }
    }
}

#[test]
fn stress_workers_poll_until_one_stops_everyone() {
    let exit = ExitCoordinator::new();
    let handles: Vec<_> = (0..16u32)
        .map(|id| {
            let exit = exit.clone();
            thread::spawn(move || {
                let mut ticks = 0;
                while !exit.should_exit() {
                    thread::sleep(Duration::from_millis(1));
                    ticks += 1;
                    if id == 5 && ticks == 3 {
                        exit.exit_with(WorkerFailure::new("worker 5 gave up"));
                    }
                }
                ticks
            })
        })
        .collect();

    let got = exit.wait_for_exit().unwrap();
    assert_eq!(got.to_string(), "worker 5 gave up");
    for h in handles {
        h.join().unwrap();
    }
}

#[test]
fn stress_interrupt_and_worker_race() {
    for _ in 0..50 {
        let exit = ExitCoordinator::new();
        let (source, trigger) = manual_interrupt();
        exit.install_interrupt_bridge(move || Ok(source)).unwrap();

        let failure = reason(WorkerFailure::new("worker failed"));
        let worker = {
            let exit = exit.clone();
            let failure = failure.clone();
            thread::spawn(move || exit.exit_with_error(failure))
        };
        let interrupter = thread::spawn(move || trigger.interrupt());

        worker.join().unwrap();
        interrupter.join().unwrap();

        // Whichever came first, the worker's reason is never lost
        let got = exit.wait_for_exit().unwrap();
        assert!(Arc::ptr_eq(&got, &failure));
    }
}

#[test]
fn disk_full_survives_later_clean_exit_on_global() {
    let w1 = thread::spawn(|| exit_with_errorf!("disk {}", "full"));
    w1.join().unwrap();
    let w2 = thread::spawn(coordinated_exit::exit_without_error);
    w2.join().unwrap();

    assert!(coordinated_exit::should_exit());
    let got = coordinated_exit::wait_for_exit().unwrap();
    assert_eq!(got.to_string(), "disk full");
    assert!(got.downcast_ref::<WorkerFailure>().is_some());
}
