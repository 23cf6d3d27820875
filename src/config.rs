use serde::Deserialize;
use std::fs;
use std::io::{Error, ErrorKind};
use std::ops::Range;
use std::time::Duration;

/// Settings for the `exit_tester` demo
///
/// Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    /// Fewest workers to start (JSON field: min_workers)
    pub min_workers: usize,
    /// Upper bound (exclusive) on the number of workers (JSON field: max_workers)
    pub max_workers: usize,
    /// Fewest iterations a worker runs (JSON field: min_iterations)
    pub min_iterations: u32,
    /// Upper bound (exclusive) on a worker's iterations (JSON field: max_iterations)
    pub max_iterations: u32,
    /// Length of one worker iteration in milliseconds (JSON field: tick_ms)
    pub tick_ms: u64,
    /// Seconds to keep running after the exit, so a second Ctrl+C can be
    /// tried (JSON field: linger_seconds)
    pub linger_seconds: u64,
    /// Worker that exits with an error after its first iteration (JSON field: fail_worker)
    pub fail_worker: Option<usize>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            min_workers: 10,
            max_workers: 20,
            min_iterations: 10,
            max_iterations: 20,
            tick_ms: 1000,
            linger_seconds: 10,
            fail_worker: None,
        }
    }
}

impl DemoConfig {
    /// Range the worker count is drawn from
    pub fn workers(&self) -> Range<usize> {
        self.min_workers..self.max_workers
    }

    /// Range each worker's iteration count is drawn from
    pub fn iterations(&self) -> Range<u32> {
        self.min_iterations..self.max_iterations
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_secs(self.linger_seconds)
    }

    /// Checks that the settings describe a runnable demo
    ///
    /// # Errors
    /// - Empty worker or iteration range (min >= max)
    /// - Zero workers
    pub fn validate(&self) -> Result<(), Error> {
        if self.min_workers == 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "At least one worker is required",
            ));
        }
        if self.min_workers >= self.max_workers {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "Invalid worker range {}:{} (min must be below max)",
                    self.min_workers, self.max_workers
                ),
            ));
        }
        if self.min_iterations >= self.max_iterations {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "Invalid iteration range {}:{} (min must be below max)",
                    self.min_iterations, self.max_iterations
                ),
            ));
        }
        Ok(())
    }
}

/// Parses a JSON config file into `DemoConfig`
///
/// # Arguments
/// * `filename` - Path to the configuration file
///
/// # Errors
/// - File not found or unreadable
/// - Invalid JSON or unknown field
/// - Settings rejected by `DemoConfig::validate`
///
/// # Example
/// ```text
/// // let config = parse_config("exit_tester.json")?;
/// ```
pub fn parse_config(filename: &str) -> Result<DemoConfig, Error> {
    let contents = fs::read_to_string(filename)?;
    let config: DemoConfig = serde_json::from_str(&contents).map_err(|e| {
        Error::new(
            ErrorKind::InvalidData,
            format!("Invalid config file {}: {}", filename, e),
        )
    })?;
    config.validate()?;
    Ok(config)
}

/// Parses a `min:max` range argument
///
/// # Errors
/// If either bound is missing or not a number
pub fn parse_range<T: std::str::FromStr>(arg: &str) -> Result<(T, T), Error> {
    let invalid = || {
        Error::new(
            ErrorKind::InvalidInput,
            format!("Invalid range '{}', expected min:max", arg),
        )
    };
    let (min, max) = arg.split_once(':').ok_or_else(invalid)?;
    let min = min.trim().parse().map_err(|_| invalid())?;
    let max = max.trim().parse().map_err(|_| invalid())?;
    Ok((min, max))
}
