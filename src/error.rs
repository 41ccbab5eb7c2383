use thiserror::Error;

// ---------------------------
// ## Error Handling
// ---------------------------

#[derive(Error, Debug)]
pub enum AstrologyError {
    #[error("calculation API responded with status {status}")]
    Api { status: u16 },

    #[error("calculation API reported: {0}")]
    Remote(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid Input: {0}")]
    InvalidInput(String),

    #[error("response is missing `{0}`")]
    MissingField(&'static str),

    #[error("{0} is not offered by this source")]
    Unsupported(&'static str),

    #[error("a calendar build is already in progress")]
    BuildInProgress,

    #[error("request task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("render error: {0}")]
    Render(String),
}

impl AstrologyError {
    /// Short, user-facing status line for the CLI.
    pub fn status_message(&self) -> String {
        match self {
            AstrologyError::Api { status } if *status >= 500 => {
                "calculation service temporarily unavailable, try again".to_string()
            }
            AstrologyError::Http(err) if err.is_connect() || err.is_timeout() => {
                "calculation service unreachable, try again".to_string()
            }
            AstrologyError::Api { status } if (400..500).contains(status) => {
                format!("calculation service rejected the request (status {})", status)
            }
            AstrologyError::InvalidInput(detail) => detail.clone(),
            AstrologyError::MissingField(field) => {
                format!("calculation service answer has no `{}`", field)
            }
            AstrologyError::BuildInProgress => "calendar build in progress".to_string(),
            other => format!("unexpected error: {}", other),
        }
    }
}

pub type Result<T, E = AstrologyError> = std::result::Result<T, E>;
