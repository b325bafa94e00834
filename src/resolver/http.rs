use anyhow::{Context, Result};

use super::{ApiRequest, Fetcher};

/// Blocking HTTP fetcher. Session-mode credential forwarding is a browser
/// concern; this client only applies the prepared request headers.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(super::USER_AGENT)
            .build()
            .context("build reqwest client")?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str, request: &ApiRequest) -> Result<String> {
        let mut req = self.client.get(url);
        for (key, value) in &request.headers {
            req = req.header(key, value);
        }
        let resp = req.send().with_context(|| format!("GET {}", url))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("GET {} status", url))?;
        resp.text().context("read response body")
    }
}
