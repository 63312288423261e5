use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    #[diagnostic(
        code(clienthash_dl::network),
        help("Check your internet connection or try again later")
    )]
    Network(#[from] Box<ureq::Error>),

    #[error("HTTP {status}: {url}")]
    #[diagnostic(
        code(clienthash_dl::http_error),
        help("Status 401, 403 and 429 usually mean the API token is missing, invalid or rate limited")
    )]
    HttpError { status: u16, url: String },

    #[error("I/O error while {action}: {source}")]
    #[diagnostic(code(clienthash_dl::io))]
    Io {
        action: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid response from server")]
    #[diagnostic(code(clienthash_dl::invalid_response))]
    InvalidResponse,
}

impl From<ureq::Error> for DownloadError {
    /// Converts a `ureq::Error` into a `DownloadError::Network` variant.
    fn from(e: ureq::Error) -> Self {
        Self::Network(Box::new(e))
    }
}

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    fn with_context<C>(self, context: C) -> Result<T, DownloadError>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T, DownloadError>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            DownloadError::Io {
                action: context(),
                source: err,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_http_error() {
        let err = DownloadError::HttpError {
            status: 403,
            url: "https://api.github.com/repos/o/r/releases".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("HTTP 403"));
        assert!(msg.contains("/repos/o/r/releases"));
    }

    #[test]
    fn test_download_error_invalid_response() {
        let err = DownloadError::InvalidResponse;
        assert_eq!(err.to_string(), "Invalid response from server");
    }

    #[test]
    fn test_from_ureq_error() {
        let download_err: DownloadError = ureq::Error::ConnectionFailed.into();
        assert!(matches!(download_err, DownloadError::Network(_)));
    }

    #[test]
    fn test_with_context() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        let err = result
            .with_context(|| "writing asset".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "I/O error while writing asset: gone");
        assert!(std::error::Error::source(&err).is_some());
    }
}
