use coordinated_exit::{cli, demo, log, set_log_file, ExitCoordinator};
use std::process;
use std::thread;

fn main() {
    let options = cli::parse_args();
    if let Some(log_file) = &options.log_file {
        if let Err(e) = set_log_file(log_file) {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
    let config = options.config;

    let exit = ExitCoordinator::new();
    if let Err(e) = exit.exit_on_interrupt() {
        let _ = log(&format!("Failed to install interrupt handler: {}", e));
        process::exit(1);
    }

    let mut rng = rand::thread_rng();
    let (_pool, count) = match demo::start_workers(&exit, &config, &mut rng) {
        Ok(started) => started,
        Err(e) => {
            let _ = log(&format!("Failed to start workers: {}", e));
            process::exit(1);
        }
    };
    let _ = log(&format!("Started {} workers", count));

    let _ = log("Main thread waiting for exit...");
    let reason = exit.wait_for_exit();
    match &reason {
        Some(e) => {
            let _ = log(&format!("wait_for_exit() returned error: {}", e));
        }
        None => {
            let _ = log("wait_for_exit() returned no error");
        }
    }

    let _ = log(&format!(
        "Lingering {} more seconds, a second Ctrl+C terminates immediately...",
        config.linger_seconds
    ));
    thread::sleep(config.linger());
    let _ = log("All done!");

    if reason.is_some() {
        process::exit(1);
    }
}
