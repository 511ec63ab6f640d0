//! Error types for the pixiv-mirror application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Authentication errors
    #[error("Login failed: {0}")]
    Login(String),

    /// Authentication paths the upstream services expose but this tool
    /// deliberately does not implement (captcha flows, password login).
    #[error("Not supported: {0}")]
    NotSupported(String),

    // Pipeline errors
    #[error("Mirror pipeline failed: {0}")]
    Mirror(String),

    #[error("Digest pipeline failed: {0}")]
    Digest(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes for the binary.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const LOGIN_ERROR: i32 = 2;
    pub const PIPELINE_ERROR: i32 = 3;
    pub const UNEXPECTED_ERROR: i32 = 4;
}
