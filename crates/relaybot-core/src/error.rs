use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
}

impl CoreError {
    /// Short error code string, used anywhere a stable string is surfaced to an
    /// HTTP caller (e.g. `/submit_token` failure bodies).
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Config(_) => "CONFIG_ERROR",
            CoreError::MissingEnv(_) => "MISSING_ENV",
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
