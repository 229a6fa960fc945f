use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Client(#[from] dashboard::ClientError),
    #[error(transparent)]
    Export(#[from] dashboard::ExportError),
    #[error("could not load {0}")]
    Fetch(String),
    #[error("not signed in; start pharmadesk and log in first")]
    NotSignedIn,
    #[error("terminal error: {0}")]
    Terminal(String),
}
