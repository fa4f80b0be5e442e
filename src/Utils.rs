//! different utility modules used throughout the project
/// console and file logging setup
pub mod logger;
/// burner configuration loaded from TOML
pub mod config;
