use encoding_rs::Encoding;
use reqwest::blocking::Client;

use crate::config::SourceConfig;
use crate::error::{DashboardError, Result};

// ---------------------------------------------------------------------------
// Fetch seam
// ---------------------------------------------------------------------------

/// Retrieves the raw bytes behind a URL.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP GET. A slow response blocks the calling thread.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DashboardError::network("<client>", format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        log::info!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| DashboardError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::network(url, format!("HTTP status {status}")));
        }

        let body = response
            .bytes()
            .map_err(|e| DashboardError::network(url, format!("reading body: {e}")))?;
        log::debug!("{url}: {} bytes", body.len());
        Ok(body.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Text decoding
// ---------------------------------------------------------------------------

/// Decode `bytes` with the encoding named by `label` (`latin1`, `utf-8`, ...).
///
/// A byte-order mark, if present, overrides the label.
pub fn decode(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = resolve_encoding(label)
        .ok_or_else(|| DashboardError::parse(format!("unknown text encoding '{label}'")))?;
    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DashboardError::parse(format!(
            "input is not valid {}",
            used.name()
        )));
    }
    Ok(text.into_owned())
}

/// Look up a WHATWG label, falling back to the hyphen-less spelling so
/// names like `latin-1` resolve too.
fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
        .or_else(|| Encoding::for_label(label.replace('-', "").as_bytes()))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    /// In-memory fetcher that records how often each URL was requested.
    #[derive(Default)]
    pub struct MemoryFetcher {
        bodies: HashMap<String, Vec<u8>>,
        calls: RefCell<HashMap<String, usize>>,
    }

    impl MemoryFetcher {
        pub fn with(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
            self.bodies.insert(url.to_string(), body.into());
            self
        }

        pub fn calls(&self, url: &str) -> usize {
            self.calls.borrow().get(url).copied().unwrap_or(0)
        }
    }

    impl Fetch for MemoryFetcher {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            *self.calls.borrow_mut().entry(url.to_string()).or_default() += 1;
            self.bodies
                .get(url)
                .cloned()
                .ok_or_else(|| DashboardError::network(url, "HTTP status 404 Not Found"))
        }
    }

    impl Fetch for std::rc::Rc<MemoryFetcher> {
        fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.as_ref().fetch(url)
        }
    }
}
