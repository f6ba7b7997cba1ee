/// 控制台与后端交互时可能出现的错误
///
/// 所有错误对发起它的页面动作都是终止性的，不做重试。
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },
    #[error("Malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Not a video file: {name} ({media_type})")]
    UnsupportedMedia { name: String, media_type: String },
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl ConsoleError {
    /// 给终端用户看的简短提示
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Transport { .. } => {
                "Could not reach the processing backend.".to_string()
            }
            ConsoleError::Status { status, .. } => {
                if *status == 404 {
                    "The requested video was not found on the backend.".to_string()
                } else {
                    format!("Backend responded with an error (HTTP {}).", status)
                }
            }
            ConsoleError::Decode { .. } => "Backend sent an unexpected response.".to_string(),
            ConsoleError::Io(_) => "Failed to read or write a local file.".to_string(),
            ConsoleError::Cancelled => "The operation was cancelled.".to_string(),
            ConsoleError::UnsupportedMedia { name, .. } => {
                format!("'{}' is not a video file.", name)
            }
            ConsoleError::InvalidUrl(url) => format!("Backend address '{}' is invalid.", url),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
