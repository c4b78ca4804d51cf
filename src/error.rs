use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Cannot launch preprocessor `{tool}`: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot read from preprocessor: {0}")]
    OpenFile(String),

    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "search-index")]
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Render error: {0}")]
    Render(String),
}

impl DocError {
    /// True for errors raised while reading configuration, before any file is processed.
    pub fn is_config(&self) -> bool {
        matches!(self, DocError::Config(_) | DocError::Pattern(_) | DocError::Toml(_))
    }
}

pub type Result<T> = std::result::Result<T, DocError>;
