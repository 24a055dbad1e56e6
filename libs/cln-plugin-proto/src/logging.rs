use log::{Level, LevelFilter, Metadata, Record};
use tokio::sync::mpsc::UnboundedSender;

/// A log line on its way to the host, already mapped to the host's
/// level vocabulary.
#[derive(Debug)]
pub(crate) struct LogEntry {
    pub level: &'static str,
    pub message: String,
}

/// Forwards `log` records to the host as `log` notifications.
///
/// A plugin owns stdout, so writing plain text there would corrupt the
/// protocol stream; records are queued and written as JSON notifications
/// by the runtime instead.
struct HostLogger {
    sender: UnboundedSender<LogEntry>,
}

impl log::Log for HostLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let level = match record.level() {
            Level::Error => "broken",
            Level::Warn => "unusual",
            Level::Info => "info",
            Level::Debug | Level::Trace => "debug",
        };

        // The host treats each notification as a single log line.
        let message = format!("{}", record.args());
        for line in message.lines() {
            let _ = self.sender.send(LogEntry {
                level,
                message: line.to_string(),
            });
        }
    }

    fn flush(&self) {}
}

/// Installs the host logger. A second call (e.g. a second plugin instance
/// in one test binary) leaves the first logger in place.
pub(crate) fn init(sender: UnboundedSender<LogEntry>) {
    let logger = HostLogger { sender };
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn multi_line_records_become_one_entry_per_line() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let logger = HostLogger { sender: tx };

        log::Log::log(
            &logger,
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("first\nsecond"))
                .build(),
        );

        let first = rx.try_recv().unwrap();
        assert_eq!(first.level, "unusual");
        assert_eq!(first.message, "first");

        let second = rx.try_recv().unwrap();
        assert_eq!(second.message, "second");

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn error_maps_to_broken() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let logger = HostLogger { sender: tx };

        log::Log::log(
            &logger,
            &Record::builder()
                .level(Level::Error)
                .args(format_args!("boom"))
                .build(),
        );

        assert_eq!(rx.try_recv().unwrap().level, "broken");
    }
}
