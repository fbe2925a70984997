use std::time::Duration;

use super::client::HttpClient;
use async_trait::async_trait;

/// [`HttpClient`] backed directly by a `reqwest` connection pool.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// A client that gives up on requests after `timeout`.
    pub fn with_timeout(timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
