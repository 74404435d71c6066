use std::error::Error as _;
use std::io;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    TimedOut,
    #[error("{0}")]
    Failed(String),
}

pub trait Transport: Send + Sync {
    fn get_text(&self, path: &str, query: &[(String, String)]) -> Result<String, TransportError>;
}

pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent,
        }
    }
}

impl Transport for HttpTransport {
    fn get_text(&self, path: &str, query: &[(String, String)]) -> Result<String, TransportError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.agent.get(&url);
        for (key, value) in query {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(response) => response.into_string().map_err(|err| {
                TransportError::Failed(format!("response decode failed: {err}"))
            }),
            // The API reports application errors in the JSON body, so a
            // non-2xx status with a body is still handed to the caller.
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().ok().unwrap_or_default();
                if body.trim().is_empty() {
                    Err(TransportError::Failed(format!("HTTP status {status}")))
                } else {
                    Ok(body)
                }
            }
            Err(ureq::Error::Transport(err)) => {
                if is_timeout(&err) {
                    Err(TransportError::TimedOut)
                } else {
                    Err(TransportError::Failed(format!("transport error: {err}")))
                }
            }
        }
    }
}

fn is_timeout(err: &ureq::Transport) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>()
            && matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            )
        {
            return true;
        }
        source = cause.source();
    }
    err.kind() == ureq::ErrorKind::Io && err.to_string().contains("timed out")
}
