use std::env;
use std::fmt::Display;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{Level, LevelFilter, Log};
use owo_colors::OwoColorize;

/// Logger settings taken from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub level: LevelFilter,
    pub color: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(env::var("FAT_IO_LOG").ok().as_deref(), env::var_os("NO_COLOR").is_some())
    }

    /// `FAT_IO_LOG` holds a level name; anything unparsable falls back to `info`.
    fn from_vars(level: Option<&str>, no_color: bool) -> Self {
        let level = level
            .and_then(|s| LevelFilter::from_str(s.trim()).ok())
            .unwrap_or(LevelFilter::Info);
        Self { level, color: !no_color }
    }
}

struct ToolLogger {
    color: AtomicBool,
}

static LOGGER: ToolLogger = ToolLogger { color: AtomicBool::new(true) };

impl ToolLogger {
    fn write_with_color(&self, out: &mut impl Write, color: Color, string: impl Display) {
        let string: &dyn Display = if !self.color.load(Ordering::Relaxed) {
            &string
        } else {
            match color {
                Color::Default => &string,
                Color::BrightRed => &string.bright_red(),
                Color::BrightYellow => &string.bright_yellow(),
                Color::BrightBlue => &string.bright_blue(),
                Color::BrightCyan => &string.bright_cyan(),
                Color::BrightMagenta => &string.bright_magenta(),
            }
        };
        // stderr going away is not worth failing an operation over
        let _ = write!(out, "{string}");
    }
}

impl Log for ToolLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) { return; }
        let mut out = io::stderr().lock();
        let level = record.level();
        self.write_with_color(
            &mut out,
            match level {
                Level::Error => Color::BrightRed,
                Level::Warn => Color::BrightYellow,
                Level::Info => Color::BrightBlue,
                Level::Debug => Color::BrightCyan,
                Level::Trace => Color::BrightMagenta,
            },
            format_args!("{level:5} "),
        );
        self.write_with_color(&mut out, Color::Default, record.args());
        self.write_with_color(&mut out, Color::Default, "\n");
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

pub fn init(config: Config) -> Result<(), log::SetLoggerError> {
    LOGGER.color.store(config.color, Ordering::Relaxed);
    log::set_max_level(config.level);
    log::set_logger(&LOGGER)
}

enum Color {
    Default,
    BrightRed,
    BrightYellow,
    BrightBlue,
    BrightCyan,
    BrightMagenta,
}
