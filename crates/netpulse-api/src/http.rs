// HTTP transfer client
//
// Wraps `reqwest::Client` with the three transfer shapes the engines need:
// an incrementally-read download, a single-shot upload, and a bounded
// banner fetch for device fingerprinting. Deadlines are owned by callers.

use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Upper bound on how much of a response body a banner fetch keeps.
pub const DEFAULT_BANNER_LIMIT: usize = 16 * 1024;

/// HTTP client for throughput transfers and banner fetches.
#[derive(Debug, Clone)]
pub struct TransferClient {
    http: reqwest::Client,
}

impl TransferClient {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
        })
    }

    /// Create a transfer client sharing an existing connection pool.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Start a download. Resolves once response headers arrive; the body
    /// is then pulled chunk by chunk through [`Download::next_chunk`].
    pub async fn open_download(&self, url: &Url) -> Result<Download, Error> {
        debug!("GET {url} (download)");
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(Download {
            content_length: response.content_length(),
            response,
        })
    }

    /// POST `payload` and wait for the response status.
    pub async fn upload(&self, url: &Url, payload: Bytes) -> Result<u16, Error> {
        debug!("POST {url} ({} bytes)", payload.len());
        let response = self
            .http
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(status.as_u16())
    }

    /// GET `url` and capture status, headers and at most `max_body` bytes
    /// of the body. Any status is accepted.
    pub async fn fetch_banner(&self, url: &Url, max_body: usize) -> Result<HttpBanner, Error> {
        debug!("GET {url} (banner)");
        let mut response = self.http.get(url.clone()).send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let mut body = Vec::new();
        while body.len() < max_body {
            match response.chunk().await? {
                Some(chunk) => {
                    let take = chunk.len().min(max_body - body.len());
                    body.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }

        Ok(HttpBanner {
            status,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// An in-progress download.
#[derive(Debug)]
pub struct Download {
    response: reqwest::Response,
    content_length: Option<u64>,
}

impl Download {
    /// Declared body length, if the server sent one.
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Pull the next body chunk. `Ok(None)` marks the end of the body.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        Ok(self.response.chunk().await?)
    }
}

/// What an HTTP endpoint on a device says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpBanner {
    pub status: u16,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpBanner {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}
