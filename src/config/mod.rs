/// Application configuration loading from config.toml
pub mod app;

/// Request context (token, role, department) read from the environment
pub mod session;
