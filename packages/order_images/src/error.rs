use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Boxed transport error, so stream errors from any source can be carried
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a single image download. Never aborts the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server responded with {0}")]
    BadStatus(StatusCode),
    #[error("request failed: {0}")]
    NetworkFailed(BoxError),
    #[error("failed to write image: {0}")]
    WriteFailed(io::Error),
    #[error("cannot derive a file name from URL '{0}'")]
    InvalidUrl(String),
    #[error("cannot derive a file name from timestamp '{0}'")]
    InvalidName(String),
}

/// Setup failure that aborts the run before or instead of downloading
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("failed to load orders from {}", path.display())]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error("failed to create directory {}", path.display())]
    DirCreateFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to build HTTP client")]
    Client(#[from] reqwest::Error),
}

/// Why the orders file could not be loaded
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("malformed orders document")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_chain_names_cause_once() {
        let err = anyhow::Error::from(FetchError::WriteFailed(io::Error::other("disk full")));
        let rendered = format!("{err:#}");

        assert_eq!(rendered, "failed to write image: disk full");
        assert_eq!(rendered.matches("disk full").count(), 1);
    }

    #[test]
    fn test_load_error_chain() {
        let err = anyhow::Error::from(OrchestrationError::LoadFailed {
            path: PathBuf::from("orders.json"),
            source: LoadError::Io(io::Error::other("gone")),
        });

        assert_eq!(format!("{err:#}"), "failed to load orders from orders.json: gone");
    }

    #[test]
    fn test_parse_error_chain_names_cause_once() {
        let cause = serde_json::from_str::<Vec<u8>>("{").unwrap_err();
        let detail = cause.to_string();
        let err = anyhow::Error::from(OrchestrationError::LoadFailed {
            path: PathBuf::from("orders.json"),
            source: LoadError::Parse(cause),
        });
        let rendered = format!("{err:#}");

        assert!(rendered.starts_with("failed to load orders from orders.json: malformed orders document: "));
        assert_eq!(rendered.matches(detail.as_str()).count(), 1);
    }
}
