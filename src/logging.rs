use chrono::Local;
use log::{LevelFilter, Metadata, Record, SetLoggerError};
use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::OnceLock;

/// Debug topics understood by `--debug-filter`.
pub const TOPICS: [&str; 5] = ["arena", "spawn", "combat", "render", "game"];

#[derive(Debug)]
struct ArenaLogger {
    level: LevelFilter,
    debug_filters: Option<HashSet<String>>,
}

impl ArenaLogger {
    /// Debug and trace records are only shown for selected topics when a filter is set.
    fn topic_enabled(&self, metadata: &Metadata) -> bool {
        match &self.debug_filters {
            Some(filters)
                if metadata.level() == log::Level::Debug
                    || metadata.level() == log::Level::Trace =>
            {
                filters.contains(metadata.target())
                    || filters.iter().any(|f| metadata.target().starts_with(f.as_str()))
            }
            _ => true,
        }
    }
}

impl log::Log for ArenaLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && self.topic_enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_color = match record.level() {
            log::Level::Error => "\x1B[31m", // Red
            log::Level::Warn => "\x1B[33m",  // Yellow
            log::Level::Info => "\x1B[32m",  // Green
            log::Level::Debug => "\x1B[36m", // Cyan
            log::Level::Trace => "\x1B[35m", // Magenta
        };
        let reset = "\x1B[0m";
        let timestamp = Local::now().format("%H:%M:%S%.3f");

        let mut output = format!(
            "{timestamp} {level_color}{level:5}{reset} {target}: {message}",
            level = record.level(),
            target = record.target(),
            message = record.args()
        );

        if let Some(module_path) = record.module_path() {
            if module_path != record.target() && !TOPICS.contains(&record.target()) {
                output.push_str(&format!(" [{}]", module_path));
            }
        }

        // A closed stdout is not worth aborting a training run over
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", output);
    }

    fn flush(&self) {
        let _ = io::stdout().flush();
    }
}

static LOGGER: OnceLock<ArenaLogger> = OnceLock::new();

/// Parses a comma separated topic list such as "arena,combat".
pub fn parse_filters(filter: &str) -> HashSet<String> {
    filter
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Installs the logger. Fails if another logger is already set.
pub fn init_logger(level: LevelFilter, debug_filter: Option<String>) -> Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| ArenaLogger {
        level,
        debug_filters: debug_filter.as_deref().map(parse_filters),
    });
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

/// Maps a `--log-level` string onto a filter, defaulting to Info.
pub fn level_from_str(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

// Helper macros for specific debug topics
#[macro_export]
macro_rules! debug_arena {
    (tick = $tick:expr, $($arg:tt)+) => {
        log::debug!(target: "arena", "[T{:05}] {}", $tick, format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        log::debug!(target: "arena", "{}", format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! debug_spawn {
    (tick = $tick:expr, $($arg:tt)+) => {
        log::debug!(target: "spawn", "[T{:05}] {}", $tick, format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        log::debug!(target: "spawn", "{}", format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! debug_combat {
    (tick = $tick:expr, $($arg:tt)+) => {
        log::debug!(target: "combat", "[T{:05}] {}", $tick, format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        log::debug!(target: "combat", "{}", format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! debug_game {
    (episode = $episode:expr, $($arg:tt)+) => {
        log::debug!(target: "game", "[E{:03}] {}", $episode, format_args!($($arg)+))
    };
    ($($arg:tt)+) => {
        log::debug!(target: "game", "{}", format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! debug_render {
    ($($arg:tt)+) => {
        log::trace!(target: "render", "{}", format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters() {
        let filters = parse_filters("arena, combat,,spawn ");
        assert_eq!(filters.len(), 3);
        assert!(filters.contains("arena"));
        assert!(filters.contains("combat"));
        assert!(filters.contains("spawn"));
    }

    #[test]
    fn test_level_from_str() {
        assert_eq!(level_from_str("DEBUG"), LevelFilter::Debug);
        assert_eq!(level_from_str("off"), LevelFilter::Off);
        assert_eq!(level_from_str("nonsense"), LevelFilter::Info);
    }

    #[test]
    fn test_topic_filter_only_applies_to_debug() {
        let logger = ArenaLogger {
            level: LevelFilter::Trace,
            debug_filters: Some(parse_filters("combat")),
        };
        let debug_combat = Metadata::builder()
            .level(log::Level::Debug)
            .target("combat")
            .build();
        let debug_spawn = Metadata::builder()
            .level(log::Level::Debug)
            .target("spawn")
            .build();
        let info_spawn = Metadata::builder()
            .level(log::Level::Info)
            .target("spawn")
            .build();
        assert!(log::Log::enabled(&logger, &debug_combat));
        assert!(!log::Log::enabled(&logger, &debug_spawn));
        assert!(log::Log::enabled(&logger, &info_spawn));
    }
}
