use ureq::{http::Response, Body};

use crate::{error::DownloadError, http_client::SHARED_AGENT};

pub struct Http;

impl Http {
    /// Issues a GET request and returns the response once its status is known to be
    /// successful. The body has not been read yet.
    pub fn fetch(url: &str) -> Result<Response<Body>, DownloadError> {
        let resp = SHARED_AGENT.get(url).call()?;
        ensure_success(resp, url)
    }
}

pub(crate) fn ensure_success(
    resp: Response<Body>,
    url: &str,
) -> Result<Response<Body>, DownloadError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(DownloadError::HttpError {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_success() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/asset.bin")
            .with_status(200)
            .with_body("payload")
            .create();

        let url = format!("{}/asset.bin", server.url());
        let mut resp = Http::fetch(&url).unwrap();
        let body = resp.body_mut().read_to_string().unwrap();

        assert_eq!(body, "payload");
        mock.assert();
    }

    #[test]
    fn test_fetch_not_found() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/missing").with_status(404).create();

        let url = format!("{}/missing", server.url());
        let err = Http::fetch(&url).unwrap_err();
        assert!(matches!(err, DownloadError::HttpError { status: 404, .. }));
    }
}
