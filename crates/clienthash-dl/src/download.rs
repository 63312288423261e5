use std::{
    fs::File,
    io::{BufWriter, Read, Write as _},
    path::Path,
};

use tracing::debug;
use ureq::BodyReader;

use crate::{
    error::{DownloadError, ErrorContext},
    http::Http,
};

/// Size of the buffer a download is streamed through.
pub const CHUNK_SIZE: usize = 64 * 1024;

pub struct Download {
    pub url: String,
}

impl Download {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
        }
    }

    /// Opens the response body as a reader without buffering it.
    pub fn stream(&self) -> Result<BodyReader<'static>, DownloadError> {
        let resp = Http::fetch(&self.url)?;
        Ok(resp.into_body().into_reader())
    }

    /// Streams the response body into `path`, one [`CHUNK_SIZE`] buffer at a time.
    ///
    /// The file is created (or truncated) and flushed before returning.
    ///
    /// # Returns
    ///
    /// The number of bytes written.
    pub fn to_file(&self, path: &Path) -> Result<u64, DownloadError> {
        let mut reader = self.stream()?;
        let file = File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut downloaded = 0u64;

        loop {
            let n = reader
                .read(&mut buffer)
                .with_context(|| format!("reading {}", self.url))?;
            if n == 0 {
                break;
            }

            writer
                .write_all(&buffer[..n])
                .with_context(|| format!("writing {}", path.display()))?;
            downloaded += n as u64;
        }

        writer
            .flush()
            .with_context(|| format!("flushing {}", path.display()))?;

        debug!(url = %self.url, bytes = downloaded, "download complete");
        Ok(downloaded)
    }
}
