use std::fs::File;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use crate::Utils::settings::LogSettings;

/// Console and/or file logger as described by `settings`. Returns false when no logger was
/// installed (logging switched off, or a global logger already exists).
pub fn init_logger(settings: &LogSettings) -> bool {
    let level = settings.level;
    if level == LevelFilter::Off {
        return false;
    }

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();

    // Console logger
    if settings.console {
        loggers.push(TermLogger::new(
            level,
            Config::default(),
            TerminalMode::Stderr,
            ColorChoice::Auto,
        ));
    }

    // File logger
    if let Some(ref filename) = settings.file {
        if let Ok(file) = File::create(filename) {
            loggers.push(WriteLogger::new(level, Config::default(), file));
        }
    }

    if loggers.is_empty() {
        return false;
    }
    CombinedLogger::init(loggers).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_off_installs_nothing() {
        let settings = LogSettings {
            level: LevelFilter::Off,
            ..LogSettings::default()
        };
        assert!(!init_logger(&settings));
    }

    #[test]
    fn test_no_sink_installs_nothing() {
        let settings = LogSettings {
            level: LevelFilter::Info,
            file: None,
            console: false,
        };
        assert!(!init_logger(&settings));
    }
}
