//! The HTTP client simulated users send requests through.
//!
//! Tasks never talk to reqwest directly. They go through the narrow [`HttpClient`]
//! trait, which knows the base URL of the system under test and reuses connections
//! across requests. [`ReqwestClient`] is the default implementation.

use async_trait::async_trait;
use http::StatusCode;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::swarm::TaskError;
use crate::SwarmError;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// What a task gets back from the server.
#[derive(Clone, Debug, PartialEq)]
pub struct SwarmResponse {
    /// Status code returned by the server.
    pub status: StatusCode,
    /// Response body, as text.
    pub body: String,
}

/// Sends requests to the system under test.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// POST `body` as JSON to `path`, adding `headers` to the client defaults.
    async fn post(
        &self,
        path: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<SwarmResponse, TaskError>;

    /// GET `path`, without a body.
    async fn get(&self, path: &str) -> Result<SwarmResponse, TaskError>;
}

/// Default [`HttpClient`], one reqwest connection pool shared by all users.
#[derive(Clone, Debug)]
pub struct ReqwestClient {
    base_url: Url,
    client: Client,
}
impl ReqwestClient {
    /// Build a client for `base_url`, giving up on any request that takes longer than
    /// `timeout`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, SwarmError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(ReqwestClient { base_url, client })
    }

    /// Join `path` onto the base URL.
    ///
    /// # Example
    /// ```rust
    /// use std::time::Duration;
    /// use tweetswarm::client::ReqwestClient;
    /// use url::Url;
    ///
    /// let client = ReqwestClient::new(
    ///     Url::parse("http://127.0.0.1:8080").unwrap(),
    ///     Duration::from_secs(5),
    /// ).unwrap();
    /// assert_eq!(client.build_url("/tweet").unwrap().as_str(), "http://127.0.0.1:8080/tweet");
    /// ```
    pub fn build_url(&self, path: &str) -> Result<Url, TaskError> {
        Ok(self.base_url.join(path)?)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<SwarmResponse, TaskError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(SwarmResponse { status, body })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post(
        &self,
        path: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<SwarmResponse, TaskError> {
        let url = self.build_url(path)?;
        trace!("POST {}", url);
        let mut request = self.client.post(url);
        // Headers go first, so an explicit Content-Type is not duplicated by `json()`.
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        self.send(request.json(body)).await
    }

    async fn get(&self, path: &str) -> Result<SwarmResponse, TaskError> {
        let url = self.build_url(path)?;
        trace!("GET {}", url);
        self.send(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ReqwestClient {
        ReqwestClient::new(Url::parse(base_url).unwrap(), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn build_url() {
        let client = client("http://weather.local:3000");
        assert_eq!(
            client.build_url("/api/tweets").unwrap().as_str(),
            "http://weather.local:3000/api/tweets"
        );
        assert_eq!(
            client.build_url("health").unwrap().as_str(),
            "http://weather.local:3000/health"
        );
    }

    #[test]
    fn user_agent() {
        assert!(APP_USER_AGENT.starts_with("tweetswarm/"));
    }
}
