mod exit;

use std::time::{Duration, Instant};

use thiserror::Error;

pub use exit::{ExitResolution, ExitStatus, normalize_destination, resolve_exit};

#[derive(Debug, Error)]
pub enum NetError {
    #[error("client build error: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub final_url: String, // after redirects
}

/// A single no-body request against a destination.
pub trait ProbeTransport {
    fn probe(&self, url: &str) -> Result<ProbeResponse, NetError>;
}

impl<T: ProbeTransport + ?Sized> ProbeTransport for &T {
    fn probe(&self, url: &str) -> Result<ProbeResponse, NetError> {
        (**self).probe(url)
    }
}

/// HEAD requests over a blocking client that follows a bounded number of
/// redirects.
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration, max_redirects: usize) -> Result<Self, NetError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(max_redirects))
            .user_agent("admonitor/0.1")
            .build()
            .map_err(|e| NetError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl ProbeTransport for HttpProbe {
    fn probe(&self, url: &str) -> Result<ProbeResponse, NetError> {
        let start = Instant::now();
        let resp = self
            .client
            .head(url)
            .send()
            .map_err(|e| NetError::Request(e.to_string()))?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        log::debug!(
            target: "net",
            "HEAD {url} -> {status} ({final_url}) in {}ms",
            start.elapsed().as_millis()
        );
        Ok(ProbeResponse { status, final_url })
    }
}
