//! InfluxDB v2 sink.
//!
//! Writes each point as one line of line protocol to `/api/v2/write`.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::point::Point;
use crate::sink::{Sink, SinkError, SinkTarget};

/// Default request timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum response body kept in error messages.
const MAX_ERROR_BODY: usize = 256;

pub struct InfluxSink {
    write_url: Url,
    token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for InfluxSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxSink")
            .field("write_url", &self.write_url.as_str())
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

impl InfluxSink {
    /// Create a sink for the InfluxDB instance at `base_url`.
    ///
    /// # Errors
    /// Returns `SinkError::Config` if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, SinkError> {
        let base = Url::parse(base_url)
            .map_err(|e| SinkError::Config(format!("invalid url '{base_url}': {e}")))?;
        let write_url = base
            .join("api/v2/write")
            .map_err(|e| SinkError::Config(format!("invalid url '{base_url}': {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            write_url,
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    fn url_for(&self, target: &SinkTarget) -> Url {
        let mut url = self.write_url.clone();
        url.query_pairs_mut()
            .append_pair("org", &target.org)
            .append_pair("bucket", &target.bucket)
            .append_pair("precision", "ns");
        url
    }
}

#[async_trait::async_trait]
impl Sink for InfluxSink {
    async fn write(&self, point: &Point, target: &SinkTarget) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(self.url_for(target))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(point.to_line_protocol());
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let cut = (0..=MAX_ERROR_BODY)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            body.truncate(cut);
        }
        Err(SinkError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
