use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("invalid backend url '{url}': {message}")]
    InvalidUrl { url: String, message: String },
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Server returned {status}: {body}")]
    Status {
        status: u16,
        /// `detail` from the error body when the server sent one.
        detail: Option<String>,
        body: String,
    },
    #[error("failed to decode {what} at {path}: {message}")]
    Decode {
        what: &'static str,
        path: String,
        message: String,
    },
    #[error("failed to read upload '{}': {source}", path.display())]
    ReadUpload {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to start backend worker: {0}")]
    Runtime(#[source] io::Error),
}

impl LinkError {
    pub fn server_detail(&self) -> Option<&str> {
        match self {
            LinkError::Status {
                detail: Some(detail),
                ..
            } => Some(detail.as_str()),
            _ => None,
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, LinkError::Status { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_exposes_detail_and_renders_body() {
        let error = LinkError::Status {
            status: 400,
            detail: Some("Invalid file type.".to_string()),
            body: r#"{"detail":"Invalid file type."}"#.to_string(),
        };
        assert!(error.is_status());
        assert_eq!(error.server_detail(), Some("Invalid file type."));
        assert_eq!(
            error.to_string(),
            r#"Server returned 400: {"detail":"Invalid file type."}"#
        );
    }

    #[test]
    fn non_status_errors_have_no_detail() {
        let error = LinkError::Decode {
            what: "upload response",
            path: "file_path".to_string(),
            message: "missing field".to_string(),
        };
        assert!(!error.is_status());
        assert_eq!(error.server_detail(), None);
    }
}
