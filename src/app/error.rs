use crate::http::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InvalidInput {
    EmptyQuery,
    MissingId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum SessionError {
    #[error("invalid input: {0:?}")]
    InvalidInput(InvalidInput),
    #[error("request timed out")]
    Timeout,
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("query rejected: {}", .0.as_deref().unwrap_or("no message"))]
    QueryRejected(Option<String>),
}

impl SessionError {
    pub(crate) fn notice(&self) -> String {
        match self {
            Self::InvalidInput(InvalidInput::EmptyQuery) => "Please enter a search term".to_string(),
            Self::InvalidInput(InvalidInput::MissingId) => "Invalid video id".to_string(),
            Self::Timeout => "Request timed out; check your network connection".to_string(),
            Self::RequestFailed(_) => "Request failed; please try again later".to_string(),
            Self::QueryRejected(Some(msg)) if !msg.trim().is_empty() => msg.trim().to_string(),
            Self::QueryRejected(_) => {
                "Search failed; check the network or switch source".to_string()
            }
        }
    }

    pub(crate) fn is_input_problem(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::TimedOut => Self::Timeout,
            TransportError::Failed(detail) => Self::RequestFailed(detail),
        }
    }
}
