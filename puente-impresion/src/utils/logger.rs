//! Logging Infrastructure
//!
//! Console logging, or a daily rolling file when a log directory is given.

use std::path::Path;

/// Log file prefix inside the log directory
const LOG_FILE_PREFIX: &str = "puente-impresion";

/// Initialize the logger at `info` on stdout
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger with optional file output
///
/// The directory is created when missing; if that fails, logs go to stdout.
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.parse().unwrap_or(tracing::Level::INFO))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if std::fs::create_dir_all(log_path).is_ok() {
            let file_appender = tracing_appender::rolling::daily(log_path, LOG_FILE_PREFIX);
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
        eprintln!("Cannot create log directory {dir}, logging to stdout");
    }

    subscriber.init();
}
