//! different utility modules used throughout the project
/// console and file logging set up through simplelog
pub mod logger;
/// engine settings with defaults, loadable from a TOML file
pub mod settings;
