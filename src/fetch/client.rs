// src/fetch/client.rs

//! HTTP client for artifact downloads
//!
//! A thin wrapper around blocking reqwest that streams responses to disk,
//! hashing the bytes as they arrive. There is no retry loop: the pipeline
//! surfaces the first failure verbatim.

use crate::error::{Error, Result};
use crate::hash::{ContentHash, HashAlgorithm, Hasher};
use indicatif::ProgressBar;
use reqwest::blocking::Client;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Timeout for HTTP requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Buffer size for streaming downloads
const STREAM_BUFFER_SIZE: usize = 8192;

/// HTTP download client
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Download `url` to `dest`, returning the hash of the received bytes
    ///
    /// The hash is computed while streaming so callers can verify without a
    /// second pass over the file.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        algorithm: HashAlgorithm,
        progress: Option<&ProgressBar>,
    ) -> Result<ContentHash> {
        info!("Downloading {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Network(format!("failed to fetch {url}: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Network(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        if let Some(pb) = progress {
            match response.content_length() {
                Some(len) => pb.set_length(len),
                None => pb.set_message(format!("{} (unknown size)", url)),
            }
        }

        let mut file = File::create(dest)?;
        let mut hasher = Hasher::new(algorithm);
        let mut buffer = [0u8; STREAM_BUFFER_SIZE];
        let mut downloaded: u64 = 0;

        loop {
            let n = response
                .read(&mut buffer)
                .map_err(|e| Error::Network(format!("failed reading response from {url}: {e}")))?;
            if n == 0 {
                break;
            }

            file.write_all(&buffer[..n])?;
            hasher.update(&buffer[..n]);
            downloaded += n as u64;

            if let Some(pb) = progress {
                pb.set_position(downloaded);
            }
        }

        debug!("Downloaded {} bytes from {}", downloaded, url);
        Ok(hasher.finalize())
    }
}
