use std::fmt;
use std::path::PathBuf;

use chrono::FixedOffset;
use tally_core::time::{DEFAULT_UTC_OFFSET_HOURS, offset_from_hours};

pub const DEFAULT_DATA_FILE: &str = "sessions.json";
pub const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidPort { raw: String },
    InvalidOffset { raw: String },
    InvalidDataFile { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidPort { raw } => write!(f, "invalid port: {raw}"),
            ArgsError::InvalidOffset { raw } => {
                write!(f, "invalid UTC offset (whole hours, -23..=23): {raw}")
            }
            ArgsError::InvalidDataFile { raw } => write!(f, "invalid data file path: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  tally [--data-file <path>] [--port <port>] [--utc-offset <hours>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --data-file {DEFAULT_DATA_FILE}");
    eprintln!("  --port {DEFAULT_PORT}");
    eprintln!("  --utc-offset {DEFAULT_UTC_OFFSET_HOURS}");
    eprintln!();
    eprintln!("Environment (a .env file is read if present):");
    eprintln!("  TALLY_DATA_FILE, TALLY_PORT, TALLY_UTC_OFFSET_HOURS, RUST_LOG");
}

/// Runtime configuration: flags override environment, environment overrides defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_file: PathBuf,
    pub port: u16,
    pub offset: FixedOffset,
}

/// What the command line asked for.
#[derive(Debug)]
pub enum Invocation {
    Run(Config),
    Help,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_port(raw: String) -> Result<u16, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidPort { raw })
}

fn parse_offset(raw: String) -> Result<FixedOffset, ArgsError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .and_then(offset_from_hours)
        .ok_or(ArgsError::InvalidOffset { raw })
}

fn parse_data_file(raw: String) -> Result<PathBuf, ArgsError> {
    if raw.trim().is_empty() {
        return Err(ArgsError::InvalidDataFile { raw });
    }
    Ok(PathBuf::from(raw))
}

impl Config {
    /// Resolve configuration from `args` (program name already skipped) and
    /// the variables returned by `env`.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags or unparseable values.
    pub fn resolve(
        args: impl IntoIterator<Item = String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Invocation, ArgsError> {
        let mut data_file = match env("TALLY_DATA_FILE") {
            Some(raw) => parse_data_file(raw)?,
            None => PathBuf::from(DEFAULT_DATA_FILE),
        };
        let mut port = match env("TALLY_PORT") {
            Some(raw) => parse_port(raw)?,
            None => DEFAULT_PORT,
        };
        let mut offset = match env("TALLY_UTC_OFFSET_HOURS") {
            Some(raw) => parse_offset(raw)?,
            None => tally_core::time::default_offset(),
        };

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-file" => data_file = parse_data_file(require_value(&mut args, "--data-file")?)?,
                "--port" => port = parse_port(require_value(&mut args, "--port")?)?,
                "--utc-offset" => offset = parse_offset(require_value(&mut args, "--utc-offset")?)?,
                "--help" | "-h" => return Ok(Invocation::Help),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Invocation::Run(Config {
            data_file,
            port,
            offset,
        }))
    }
}
