//! Session configuration from command-line arguments

use crate::interpreter::constants::{DEFAULT_HEAP_SIZE, MAX_HEAP_SIZE, MIN_HEAP_SIZE};
use crate::memory::allocator::FitStrategy;
use std::fmt;
use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: heaplab [OPTIONS]

Options:
  --heap-size N      heap cells, 8 to 256 (default 64)
  --strategy NAME    first, next, best or worst (default first)
  --log PATH         write logs to PATH; level from RUST_LOG (default info)
  --load PATH        start from a saved session
  --script PATH      evaluate PATH line by line and print results, no UI
  --help             show this message";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub heap_size: usize,
    pub strategy: FitStrategy,
    pub log_file: Option<PathBuf>,
    pub load_file: Option<PathBuf>,
    pub script: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            heap_size: DEFAULT_HEAP_SIZE,
            strategy: FitStrategy::default(),
            log_file: None,
            load_file: None,
            script: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `--help` was given
    HelpRequested,
    MissingValue { flag: String },
    InvalidValue { flag: String, value: String, reason: String },
    UnknownArgument(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::HelpRequested => return f.write_str(USAGE),
            ConfigError::MissingValue { flag } => write!(f, "Missing value for {}", flag)?,
            ConfigError::InvalidValue {
                flag,
                value,
                reason,
            } => write!(f, "Invalid value '{}' for {}: {}", value, flag, reason)?,
            ConfigError::UnknownArgument(arg) => write!(f, "Unknown argument '{}'", arg)?,
        }
        write!(f, "\n\n{}", USAGE)
    }
}

impl std::error::Error for ConfigError {}

impl SessionConfig {
    /// Parse arguments, excluding the program name
    pub fn from_args<I, S>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut config = SessionConfig::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            let mut value_for = |flag: &str| {
                args.next().ok_or_else(|| ConfigError::MissingValue {
                    flag: flag.to_string(),
                })
            };

            match arg.as_str() {
                "--help" | "-h" => return Err(ConfigError::HelpRequested),
                "--heap-size" => {
                    let value = value_for("--heap-size")?;
                    config.heap_size = parse_heap_size(&value)?;
                }
                "--strategy" => {
                    let value = value_for("--strategy")?;
                    config.strategy = value.parse().map_err(|reason| ConfigError::InvalidValue {
                        flag: "--strategy".to_string(),
                        value: value.clone(),
                        reason,
                    })?;
                }
                "--log" => config.log_file = Some(value_for("--log")?.into()),
                "--load" => config.load_file = Some(value_for("--load")?.into()),
                "--script" => config.script = Some(value_for("--script")?.into()),
                _ => return Err(ConfigError::UnknownArgument(arg)),
            }
        }

        Ok(config)
    }
}

fn parse_heap_size(value: &str) -> Result<usize, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        flag: "--heap-size".to_string(),
        value: value.to_string(),
        reason,
    };
    let size: usize = value
        .parse()
        .map_err(|_| invalid("not a number".to_string()))?;
    if !(MIN_HEAP_SIZE..=MAX_HEAP_SIZE).contains(&size) {
        return Err(invalid(format!(
            "must be between {} and {}",
            MIN_HEAP_SIZE, MAX_HEAP_SIZE
        )));
    }
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::from_args(Vec::<String>::new()).unwrap();
        assert_eq!(config, SessionConfig::default());
        assert_eq!(config.heap_size, 64);
        assert_eq!(config.strategy, FitStrategy::First);
    }

    #[test]
    fn test_all_flags() {
        let config = SessionConfig::from_args([
            "--heap-size",
            "128",
            "--strategy",
            "worst-fit",
            "--log",
            "heaplab.log",
            "--load",
            "saved.json",
        ])
        .unwrap();
        assert_eq!(config.heap_size, 128);
        assert_eq!(config.strategy, FitStrategy::Worst);
        assert_eq!(config.log_file, Some(PathBuf::from("heaplab.log")));
        assert_eq!(config.load_file, Some(PathBuf::from("saved.json")));
        assert_eq!(config.script, None);
    }

    #[test]
    fn test_heap_size_bounds() {
        assert!(SessionConfig::from_args(["--heap-size", "8"]).is_ok());
        assert!(SessionConfig::from_args(["--heap-size", "256"]).is_ok());
        assert!(matches!(
            SessionConfig::from_args(["--heap-size", "7"]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            SessionConfig::from_args(["--heap-size", "lots"]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_errors_carry_usage() {
        let err = SessionConfig::from_args(["--strategy"]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingValue {
                flag: "--strategy".to_string()
            }
        );
        assert!(err.to_string().contains("Usage: heaplab"));

        let err = SessionConfig::from_args(["--verbose"]).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownArgument(_)));
        assert_eq!(
            SessionConfig::from_args(["--help"]).unwrap_err(),
            ConfigError::HelpRequested
        );
    }
}
