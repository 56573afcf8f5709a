//! Minimal stderr sink for the `log` facade.

use std::io::Write;

use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let stamp = Local::now().format("%H:%M:%S%.3f");
        let mut err = std::io::stderr().lock();
        let _ = match record.level() {
            Level::Error | Level::Warn | Level::Info => {
                writeln!(err, "{stamp} {:<5} {}", record.level(), record.args())
            }
            Level::Debug | Level::Trace => writeln!(
                err,
                "{stamp} {:<5} [{}] {}",
                record.level(),
                record.target(),
                record.args()
            ),
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Log level for a `-v` count: warnings by default, then info, debug, trace.
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the stderr logger. A logger installed earlier stays in place.
pub fn init(level: LevelFilter) {
    let logger = Box::new(StderrLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}
