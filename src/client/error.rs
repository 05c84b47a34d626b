use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Non-success status with an undecodable or uninformative body.
    #[error("request failed with status {0}")]
    Status(StatusCode),
    /// Non-success status whose body carried a message.
    #[error("{message}")]
    Server { status: StatusCode, message: String },
    /// Success status with a body that is not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl FetchError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status) | Self::Server { status, .. } => Some(*status),
            Self::Http(err) => err.status(),
            Self::Decode(_) | Self::Url(_) | Self::InvalidHeader(_) => None,
        }
    }
}
