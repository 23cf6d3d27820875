use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Global log file path protected by Mutex
///
/// When None, logs go to stdout.
pub static LOG_FILE: Lazy<Mutex<Option<String>>> = Lazy::new(|| Mutex::new(None));

/// Logs a message with timestamp to configured output
///
/// # Arguments
/// * `message` - The message to log
///
/// # Returns
/// * `io::Result<()>` - Ok on success, Err if writing fails
///
/// # Example
/// ```text
/// // let _ = log("Main thread waiting for exit");
/// ```
pub fn log(message: &str) -> io::Result<()> {
    log_with_worker(message, None)
}

/// Logs a message with timestamp and optional worker ID
///
/// Used by worker threads so their lines can be told apart.
///
/// # Arguments
/// * `message` - The message to log
/// * `worker_id` - Optional worker identifier
pub fn log_with_worker(message: &str, worker_id: Option<usize>) -> io::Result<()> {
    let log_message = format_line(message, worker_id);

    // Held while writing so lines from concurrent workers never interleave
    let guard = LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner);
    match &*guard {
        Some(log_file) => {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)?;
            file.write_all(log_message.as_bytes())?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            out.write_all(log_message.as_bytes())?;
            out.flush()?;
        }
    }

    Ok(())
}

fn format_line(message: &str, worker_id: Option<usize>) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    match worker_id {
        Some(id) => format!("{} [W{}] {}\n", timestamp, id, message),
        None => format!("{} {}\n", timestamp, message),
    }
}

/// Sets the path for the log file
///
/// Subsequent calls to `log` append to this file instead of stdout.
///
/// # Errors
/// If the path is not valid UTF-8
pub fn set_log_file<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path_str = path.as_ref().to_str().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Log file path is not valid UTF-8: {}", path.as_ref().display()),
        )
    })?;
    *LOG_FILE.lock().unwrap_or_else(PoisonError::into_inner) = Some(path_str.to_string());
    Ok(())
}
