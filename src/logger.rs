// src/logger.rs
// Colored terminal logger for probe results and run progress

use chrono::{DateTime, Local};
use colored::*;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum LogLevel {
    Pass,
    Fail,
    Skip,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogLevel::Pass => write!(f, "{}", " PASS ".on_green().bold().black()),
            LogLevel::Fail => write!(f, "{}", " FAIL ".on_red().bold().white()),
            LogLevel::Skip => write!(f, "{}", " SKIP ".on_yellow().bold().black()),
            LogLevel::Info => write!(f, "{}", " INFO ".on_magenta().bold().white()),
            LogLevel::Warn => write!(f, "{}", " WARN ".on_yellow().bold().black()),
            LogLevel::Error => write!(f, "{}", " ERROR ".on_red().bold().white()),
        }
    }
}

pub struct Logger {
    pub show_passing: bool,
    pub enable_timestamps: bool,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            show_passing: true,
            enable_timestamps: true,
        }
    }

    pub fn with_passing(mut self, enable: bool) -> Self {
        self.show_passing = enable;
        self
    }

    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.enable_timestamps = enable;
        self
    }

    fn format_timestamp(&self) -> String {
        if self.enable_timestamps {
            let now: DateTime<Local> = Local::now();
            format!("{} ", now.format("%Y-%m-%d %H:%M:%S").to_string().dimmed())
        } else {
            String::new()
        }
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        let timestamp = self.format_timestamp();
        println!("{}{} {}", timestamp, level, message);
    }

    /// One line per probe: badge, request, status and round trip time.
    pub fn probe(
        &self,
        level: LogLevel,
        path: &str,
        status: Option<u16>,
        elapsed: Option<Duration>,
        name: &str,
    ) {
        if !self.shows(level) {
            return;
        }

        let timestamp = self.format_timestamp();
        let request = format!("GET {}", path).cyan();

        if let (Some(status), Some(elapsed)) = (status, elapsed) {
            let status_colored = if status < 400 {
                format!("{}", status).green()
            } else {
                format!("{}", status).red()
            };
            println!(
                "{}{} {} - {} in {} ms {}",
                timestamp,
                level,
                request,
                status_colored,
                elapsed.as_millis(),
                name.dimmed()
            );
        } else {
            println!("{}{} {} {}", timestamp, level, request, name.dimmed());
        }
    }

    /// Indented detail line under a failed probe.
    /// Only passing cases are hidden by `-q`.
    pub fn shows(&self, level: LogLevel) -> bool {
        self.show_passing || !matches!(level, LogLevel::Pass)
    }

    pub fn detail(&self, message: &str) {
        for line in message.lines() {
            println!("        {}", line.yellow());
        }
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn startup_info(&self, name: &str, version: &str, target: &str) {
        let startup_msg = format!(
            "Starting {} v{} against {}",
            name.bold(),
            version.bold(),
            target.bright_cyan()
        );
        self.info(&startup_msg);
    }

    pub fn summary(&self, passed: usize, failed: usize, errored: usize, skipped: usize) {
        let total = passed + failed + errored + skipped;
        let headline = if failed + errored + skipped == 0 {
            format!("{}", "All routes conform".green().bold())
        } else {
            format!("{}", "Conformance check failed".red().bold())
        };

        if !atty::is(atty::Stream::Stdout) {
            self.info(&format!(
                "{} of {} cases passed ({} failed, {} errored, {} skipped)",
                passed, total, failed, errored, skipped
            ));
            return;
        }

        let mut message = headline;
        message += &format!("\n\n{}  {}/{}", "Passed:".bold(), passed, total);
        if failed > 0 {
            message += &format!("\n{}  {}", "Failed:".bold(), failed.to_string().red());
        }
        if errored > 0 {
            message += &format!("\n{} {}", "Errored:".bold(), errored.to_string().red());
        }
        if skipped > 0 {
            message += &format!("\n{} {}", "Skipped:".bold(), skipped.to_string().yellow());
        }

        self.print_boxed(&message);
    }

    pub fn print_boxed(&self, message: &str) {
        let lines: Vec<&str> = message.lines().collect();
        if lines.is_empty() {
            return;
        }

        let max_width = lines
            .iter()
            .map(|line| strip_ansi_codes(line).chars().count())
            .max()
            .unwrap_or(0);

        let box_width = max_width + 4;

        println!("┌{}┐", "─".repeat(box_width));
        println!("│{}│", " ".repeat(box_width));

        for line in lines {
            let stripped_len = strip_ansi_codes(line).chars().count();
            let padding = " ".repeat((box_width - stripped_len) / 2);
            let right_padding = " ".repeat(box_width - stripped_len - padding.len());
            println!("│{}{}{}│", padding, line, right_padding);
        }

        println!("│{}│", " ".repeat(box_width));
        println!("└{}┘", "─".repeat(box_width));
        println!();
    }

    pub fn cancel_message(&self) {
        println!();
        self.warn("Interrupted. Skipping remaining cases and tearing down fixtures...");
    }

    pub fn force_exit_message(&self) {
        println!();
        self.warn("Second interrupt, exiting without teardown.");
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

// Strip ANSI color codes for width calculation
fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            in_escape = true;
            continue;
        }

        if in_escape {
            if ch.is_ascii_alphabetic() {
                in_escape = false;
            }
            continue;
        }

        result.push(ch);
    }

    result
}

// Global logger instance
use std::sync::OnceLock;
static GLOBAL_LOGGER: OnceLock<Logger> = OnceLock::new();

pub fn init_logger(show_passing: bool, enable_timestamps: bool) {
    let _ = GLOBAL_LOGGER.set(
        Logger::new()
            .with_passing(show_passing)
            .with_timestamps(enable_timestamps),
    );
}

pub fn get_logger() -> &'static Logger {
    GLOBAL_LOGGER.get().unwrap_or(&DEFAULT_LOGGER)
}

static DEFAULT_LOGGER: Logger = Logger {
    show_passing: true,
    enable_timestamps: true,
};

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::get_logger().info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::get_logger().warn(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logger::get_logger().error(&format!($($arg)*))
    };
}
