use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Overrides `--log-level` when set, e.g. `prometheus_ali_sd=debug,aliyun=trace`
pub const LOG_ENV: &str = "PROMETHEUS_ALI_SD_LOG";

/// Filter directives for the crates of this project, all at `level`. `None`
/// for an unknown level.
pub fn levels(level: &str) -> Option<String> {
    let level = match level.to_ascii_lowercase().as_str() {
        "off" => return Some("off".to_string()),
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" | "warning" => "warn",
        // there is nothing above error
        "error" | "fatal" | "panic" => "error",
        _ => return None,
    };

    Some(format!("prometheus_ali_sd={level},aliyun={level}"))
}

/// Install the global subscriber. Logs go to stdout, or are appended to
/// `log_file` without colors.
///
/// Failures never stop the program, a bad filter falls back to `info` and an
/// unusable log file falls back to stdout. Both are reported once the
/// subscriber is running.
pub fn init(color: bool, levels: &str, log_file: Option<&Path>) {
    let mut open_error = None;
    let (writer, ansi) = match log_file {
        None => (BoxMakeWriter::new(std::io::stdout), color),
        Some(path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
            Err(err) => {
                open_error = Some((path, err));
                (BoxMakeWriter::new(std::io::stdout), color)
            }
        },
    };

    let (filter, filter_error) = match EnvFilter::try_new(levels) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    };

    // a subscriber installed earlier, e.g. by tests, is kept
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .try_init();

    if let Some((path, err)) = open_error {
        error!(message = "open log file failed, fallback to stdout", ?path, %err);
    }
    if let Some(err) = filter_error {
        error!(message = "invalid log filter, fallback to info", levels, %err);
    }
}
