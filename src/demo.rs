//! Worker harness for the `exit_tester` program
//!
//! Starts a random number of workers that each run a random number of
//! iterations. The first worker to finish asks the rest to exit, so the
//! program shows one worker stopping all others, Ctrl+C stopping everyone,
//! and (with `fail_worker`) an exit reason reaching the main thread.

use crate::config::DemoConfig;
use crate::exit::ExitCoordinator;
use crate::logging::log_with_worker;
use rand::Rng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::io;
use std::thread;
use std::time::Duration;

/// Runs one worker until its iterations are done or the exit is requested
///
/// # Arguments
/// * `exit` - Coordinator shared by all workers
/// * `worker_id` - Identifier for logging
/// * `iterations` - Number of ticks to run
/// * `tick` - Length of one tick
/// * `fail` - Exit with an error after the first tick instead of finishing
///
/// # Returns
/// Number of iterations completed
pub fn run_worker(
    exit: &ExitCoordinator,
    worker_id: usize,
    iterations: u32,
    tick: Duration,
    fail: bool,
) -> u32 {
    let _ = log_with_worker(
        &format!("Worker should run {} iterations", iterations),
        Some(worker_id),
    );

    let mut completed = 0;
    while completed < iterations {
        if exit.should_exit() {
            break;
        }
        thread::sleep(tick);
        completed += 1;

        if fail {
            exit.exit_with_errorf(format_args!(
                "worker {} failed after {} iteration(s)",
                worker_id, completed
            ));
            break;
        }
    }

    exit.exit_without_error();
    let _ = log_with_worker(
        &format!("Worker exited after {}/{} iterations", completed, iterations),
        Some(worker_id),
    );
    completed
}

/// Starts the demo workers on their own thread pool
///
/// Returns immediately; callers wait with `exit.wait_for_exit()`.
///
/// # Returns
/// The pool running the workers and the number of workers started
///
/// # Errors
/// If the thread pool cannot be built
pub fn start_workers<R: Rng>(
    exit: &ExitCoordinator,
    config: &DemoConfig,
    rng: &mut R,
) -> io::Result<(ThreadPool, usize)> {
    let count = rng.gen_range(config.workers());
    let pool = ThreadPoolBuilder::new()
        .num_threads(count)
        .thread_name(|i| format!("exit-demo-worker-{}", i))
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    for worker_id in 0..count {
        let iterations = rng.gen_range(config.iterations());
        let fail = config.fail_worker == Some(worker_id);
        let exit = exit.clone();
        let tick = config.tick();
        pool.spawn(move || {
            run_worker(&exit, worker_id, iterations, tick, fail);
        });
    }

    Ok((pool, count))
}
