//! Initialisation and configuration of the program's logging.
//!
//! Messages go to the terminal (with colours, when it is one) and optionally to log files in the
//! output directory. The level can be set in `settings.toml` or overridden with the
//! `EQUISHARE_LOG_LEVEL` environment variable.
use anyhow::{Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The environment variable used to override the log level
pub const LOG_LEVEL_ENV_VAR: &str = "EQUISHARE_LOG_LEVEL";

/// The log level used if none is given in the environment or the settings file
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log file for messages about the ordinary operation of the program
const LOG_INFO_FILE_NAME: &str = "equishare_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "equishare_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Convert a log level name (case-insensitive) to a [`LevelFilter`]
fn parse_log_level(level: &str) -> Result<LevelFilter> {
    Ok(match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    })
}

/// Create (or truncate) a log file in `dir`
fn create_log_file(dir: &Path, file_name: &str) -> Result<File> {
    Ok(OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dir.join(file_name))?)
}

/// Initialise the program logger.
///
/// The environment variable takes precedence over the level from the settings file. Possible
/// levels are `off`, `error`, `warn`, `info`, `debug` and `trace`.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_dir`: Where to write log files. If `None`, no log files are written.
pub fn init(log_level_from_settings: Option<&str>, log_file_dir: Option<&Path>) -> Result<()> {
    let log_level = env::var(LOG_LEVEL_ENV_VAR).unwrap_or_else(|_| {
        log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string()
    });
    let log_level = parse_log_level(&log_level)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let use_colour_stdout = std::io::stdout().is_terminal();
    let use_colour_stderr = std::io::stderr().is_terminal();

    let mut dispatch = Dispatch::new()
        .chain(
            // Ordinary messages to stdout
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stdout, &colours);
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            // Warnings and errors to stderr
            Dispatch::new()
                .format(move |out, message, record| {
                    write_log_colour(out, message, record, use_colour_stderr, &colours);
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        );

    if let Some(dir) = log_file_dir {
        dispatch = dispatch
            .chain(
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(create_log_file(dir, LOG_INFO_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(create_log_file(dir, LOG_ERROR_FILE_NAME)?),
            );
    }

    dispatch.apply()?;
    LOGGER_INIT.get_or_init(|| ());

    Ok(())
}

/// Write a log message with a timestamp, level and target
fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Write to the log with no colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

/// Write to the log, colouring the level if `use_colour` is set
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log_plain(out, message, record);
    }
}
