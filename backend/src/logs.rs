//! Conversion progress log.
//!
//! Every entry becomes a `tracing` event; the binary installs the subscriber.
//! Per-row details are indented under their summary line.

/// Log level of an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warning,
    Error,
}

/// A single log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting level (for per-row details under a summary line)
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self { level, message: message.into(), indent: 0 }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// Text of the event, with indentation and the success marker.
    pub fn render(&self) -> String {
        let indent = "  ".repeat(self.indent as usize);
        match self.level {
            LogLevel::Success => format!("{}✓ {}", indent, self.message),
            _ => format!("{}{}", indent, self.message),
        }
    }

    pub fn emit(&self) {
        let line = self.render();
        match self.level {
            LogLevel::Debug => tracing::debug!("{}", line),
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", line),
            LogLevel::Warning => tracing::warn!("{}", line),
            LogLevel::Error => tracing::error!("{}", line),
        }
    }
}

pub fn log_debug(msg: impl Into<String>) {
    LogEntry::new(LogLevel::Debug, msg).emit();
}

pub fn log_info(msg: impl Into<String>) {
    LogEntry::new(LogLevel::Info, msg).emit();
}

pub fn log_success(msg: impl Into<String>) {
    LogEntry::new(LogLevel::Success, msg).emit();
}

pub fn log_warning(msg: impl Into<String>) {
    LogEntry::new(LogLevel::Warning, msg).emit();
}

pub fn log_error(msg: impl Into<String>) {
    LogEntry::new(LogLevel::Error, msg).emit();
}

pub fn log_warning_indent(msg: impl Into<String>, indent: u8) {
    LogEntry::new(LogLevel::Warning, msg).with_indent(indent).emit();
}

pub fn log_error_indent(msg: impl Into<String>, indent: u8) {
    LogEntry::new(LogLevel::Error, msg).with_indent(indent).emit();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indented_entry() {
        let entry = LogEntry::new(LogLevel::Warning, "row 3 skipped").with_indent(2);
        assert_eq!(entry.render(), "    row 3 skipped");
    }

    #[test]
    fn test_success_marker() {
        assert_eq!(LogEntry::new(LogLevel::Success, "done").render(), "✓ done");
        assert_eq!(LogEntry::new(LogLevel::Info, "done").render(), "done");
    }

    #[test]
    fn test_emit_without_subscriber() {
        log_info("no subscriber installed");
        log_error_indent("still fine", 1);
    }
}
