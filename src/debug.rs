//! Debug logging over the serial console.
//!
//! Backs the `log` facade: every record is formatted into a fixed-size line
//! and printed on the UART. Lines longer than the buffer are truncated.

use core::fmt::Write;

use heapless::String;
use log::{Level, Record};

/// Maximum length of a single debug message
pub const MAX_DEBUG_MSG_LEN: usize = 256;

/// Short level tag printed in front of each line
fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Format one log line: `LEVEL message`.
///
/// Output that does not fit is cut at the buffer size.
pub fn format_line(level: Level, args: core::fmt::Arguments) -> String<MAX_DEBUG_MSG_LEN> {
    let mut line = Truncating(String::new());
    let _ = write!(line, "{} {}", level_tag(level), args);
    line.0
}

/// Writer that keeps what fits and silently drops the rest
struct Truncating(String<MAX_DEBUG_MSG_LEN>);

impl Write for Truncating {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Format a `log` record as a console line
pub fn format_record(record: &Record) -> String<MAX_DEBUG_MSG_LEN> {
    format_line(record.level(), *record.args())
}

#[cfg(feature = "embedded")]
mod console {
    use super::format_record;
    use log::{LevelFilter, Log, Metadata, Record};

    struct DebugLogger;

    impl Log for DebugLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                esp_println::println!("{}", format_record(record));
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: DebugLogger = DebugLogger;

    /// Install the console logger.
    ///
    /// Must be called once during startup, before anything logs.
    pub fn init(level: LevelFilter) {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }
}

#[cfg(feature = "embedded")]
pub use console::init;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_has_level_tag() {
        let line = format_line(Level::Info, format_args!("Packet queued"));
        assert_eq!(line.as_str(), "INFO  Packet queued");
    }

    #[test]
    fn test_long_line_is_truncated() {
        let long = [b'x'; 400];
        let text = core::str::from_utf8(&long).unwrap();

        let line = format_line(Level::Warn, format_args!("{}", text));

        assert_eq!(line.len(), MAX_DEBUG_MSG_LEN);
        assert!(line.starts_with("WARN  xxx"));
    }

    #[test]
    fn test_record_formatting() {
        let line = format_record(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("Next send at {}", 42))
                .build(),
        );
        assert_eq!(line.as_str(), "DEBUG Next send at 42");
    }
}
