use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Transport failure during {stage}: {message}")]
    Transport { stage: String, message: String },

    #[error("No spreadsheet file found on the server. Available files: {available:?}")]
    NoFileFound { available: Vec<String> },

    #[error("Downloaded file '{name}' is empty")]
    EmptyFile { name: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Unsupported date format: {raw:?}")]
    DateFormat { raw: String },

    #[error("Spreadsheet API error: {message}")]
    Spreadsheet { message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl DashboardError {
    pub fn transport(stage: impl Into<String>, message: impl ToString) -> Self {
        DashboardError::Transport {
            stage: stage.into(),
            message: message.to_string(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        DashboardError::Parse {
            message: message.into(),
        }
    }

    /// Short stable label, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            DashboardError::Transport { .. } => "transport",
            DashboardError::NoFileFound { .. } => "no_file_found",
            DashboardError::EmptyFile { .. } => "empty_file",
            DashboardError::Parse { .. } => "parse",
            DashboardError::DateFormat { .. } => "date_format",
            DashboardError::Spreadsheet { .. } => "spreadsheet",
            DashboardError::Config(_) => "config",
            DashboardError::Io(_) => "io",
            DashboardError::Json(_) => "json",
            DashboardError::Toml(_) => "toml",
            DashboardError::Http(_) => "http",
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
