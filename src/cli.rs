use crate::config::{parse_config, parse_range, DemoConfig};
use std::env;
use std::io::{Error, ErrorKind};
use std::process;

/// Prints usage instructions for the demo program.
pub fn print_usage() {
    println!(
        "Usage: {} [-h] [-v] [-l logfile] [-c config.json] [-w min:max] [-n min:max] [-t tick_ms] [-g linger_seconds] [-e worker_id]",
        crate::DEMO_NAME
    );
}

/// Options for one run of the demo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Path to log file (None for stdout)
    pub log_file: Option<String>,
    /// Demo settings, config file first, then command line overrides
    pub config: DemoConfig,
}

/// What the command line asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Run(Options),
}

/// Settings given on the command line, applied on top of the config file
#[derive(Debug, Default)]
struct Overrides {
    workers: Option<(usize, usize)>,
    iterations: Option<(u32, u32)>,
    tick_ms: Option<u64>,
    linger_seconds: Option<u64>,
    fail_worker: Option<usize>,
}

impl Overrides {
    fn apply(self, config: &mut DemoConfig) {
        if let Some((min, max)) = self.workers {
            config.min_workers = min;
            config.max_workers = max;
        }
        if let Some((min, max)) = self.iterations {
            config.min_iterations = min;
            config.max_iterations = max;
        }
        if let Some(tick_ms) = self.tick_ms {
            config.tick_ms = tick_ms;
        }
        if let Some(linger_seconds) = self.linger_seconds {
            config.linger_seconds = linger_seconds;
        }
        if self.fail_worker.is_some() {
            config.fail_worker = self.fail_worker;
        }
    }
}

fn missing(what: &str) -> Error {
    Error::new(ErrorKind::InvalidInput, format!("Missing {} argument", what))
}

fn number<T: std::str::FromStr>(arg: Option<String>, what: &str) -> Result<T, Error> {
    let arg = arg.ok_or_else(|| missing(what))?;
    arg.parse().map_err(|_| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("{} must be a non-negative number, got '{}'", what, arg),
        )
    })
}

/// Parses the arguments following the program name
///
/// # Errors
/// - Missing or malformed option values
/// - Unexpected positional arguments
/// - Unreadable or invalid config file
/// - Resulting settings rejected by `DemoConfig::validate`
pub fn parse_from<I>(args: I) -> Result<Command, Error>
where
    I: IntoIterator<Item = String>,
{
    let mut log_file = None;
    let mut config_file = None;
    let mut overrides = Overrides::default();

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" => return Ok(Command::Help),
            "-v" => return Ok(Command::Version),
            "-l" => log_file = Some(args.next().ok_or_else(|| missing("log file"))?),
            "-c" => config_file = Some(args.next().ok_or_else(|| missing("config file"))?),
            "-w" => {
                let arg = args.next().ok_or_else(|| missing("worker range"))?;
                overrides.workers = Some(parse_range(&arg)?);
            }
            "-n" => {
                let arg = args.next().ok_or_else(|| missing("iteration range"))?;
                overrides.iterations = Some(parse_range(&arg)?);
            }
            "-t" => overrides.tick_ms = Some(number(args.next(), "Tick length")?),
            "-g" => overrides.linger_seconds = Some(number(args.next(), "Linger seconds")?),
            "-e" => overrides.fail_worker = Some(number(args.next(), "Failing worker id")?),
            _ => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("Unexpected argument: {}", arg),
                ))
            }
        }
    }

    let mut config = match config_file {
        Some(path) => parse_config(&path)?,
        None => DemoConfig::default(),
    };
    overrides.apply(&mut config);
    config.validate()?;

    Ok(Command::Run(Options { log_file, config }))
}

/// Parses command line arguments of the running process
///
/// Prints usage or version and exits for `-h`/`-v`; prints the error and
/// usage and exits with status 1 on bad arguments.
pub fn parse_args() -> Options {
    match parse_from(env::args().skip(1)) {
        Ok(Command::Run(options)) => options,
        Ok(Command::Help) => {
            print_usage();
            process::exit(0);
        }
        Ok(Command::Version) => {
            println!("{} version {}", crate::DEMO_NAME, crate::PROGRAM_VERSION);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(list: &[&str]) -> Options {
        match parse_from(args(list)).unwrap() {
            Command::Run(options) => options,
            other => panic!("expected Run, got {:?}", other),
        }
    }

    #[test]
    fn test_no_arguments_gives_defaults() {
        let options = run(&[]);
        assert_eq!(options.log_file, None);
        assert_eq!(options.config, DemoConfig::default());
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_from(args(&["-h"])).unwrap(), Command::Help);
        assert_eq!(parse_from(args(&["-t", "5", "-v"])).unwrap(), Command::Version);
    }

    #[test]
    fn test_overrides() {
        let options = run(&["-l", "out.log", "-w", "2:3", "-n", "1:4", "-t", "10", "-g", "0", "-e", "1"]);
        assert_eq!(options.log_file.as_deref(), Some("out.log"));
        assert_eq!(options.config.workers(), 2..3);
        assert_eq!(options.config.iterations(), 1..4);
        assert_eq!(options.config.tick_ms, 10);
        assert_eq!(options.config.linger_seconds, 0);
        assert_eq!(options.config.fail_worker, Some(1));
    }

    #[test]
    fn test_command_line_wins_over_config_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"tick_ms": 50, "linger_seconds": 3}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let options = run(&["-t", "7", "-c", path.as_str()]);
        assert_eq!(options.config.tick_ms, 7);
        assert_eq!(options.config.linger_seconds, 3);
    }

    #[test]
    fn test_bad_arguments() {
        assert!(parse_from(args(&["-t"])).is_err());
        assert!(parse_from(args(&["-t", "soon"])).is_err());
        assert!(parse_from(args(&["-w", "5:5"])).is_err());
        assert!(parse_from(args(&["-w", "0:2"])).is_err());
        assert!(parse_from(args(&["config.json"])).is_err());
    }
}
