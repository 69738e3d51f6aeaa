//! HTTP implementation of the management-client seam.
//!
//! Speaks the rules-configs REST surface of the remote management API:
//! `GET {base}/rules-configs` lists records, `PUT {base}/rules-configs/{key}`
//! creates or overwrites one record, `DELETE {base}/rules-configs/{key}`
//! removes one. Every wire call goes through the retrying call wrapper so the
//! reconciler never sees a transient rate limit.

use reqwest::{StatusCode, Url};
use thiserror::Error;

use crate::client::{ClientFuture, KeySelector, ManagementClient, RulesConfigRecord, ValuePayload};
use crate::config::{ApiConfig, ConfigError};
use crate::retry::{RetryPolicy, Transient, call_with_retry};

/// Errors raised by the HTTP management client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Raised when the supplied configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when the request never produced an HTTP response.
    #[error("transport error: {message}")]
    Transport {
        /// Underlying transport error string.
        message: String,
    },
    /// Raised when the API throttled the request.
    #[error("rate limited by the management API")]
    RateLimited,
    /// Raised when the API answered with a non-success status.
    #[error("management API returned {status}: {body}")]
    Status {
        /// HTTP status code reported by the API.
        status: u16,
        /// Response body, for diagnosis.
        body: String,
    },
    /// Raised when a response body cannot be decoded.
    #[error("failed to decode management API response: {message}")]
    Decode {
        /// Decoder error message.
        message: String,
    },
}

impl Transient for ApiError {
    fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited | Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Config(_) | Self::Decode { .. } => false,
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

/// Management client speaking HTTP with bearer-token authentication.
#[derive(Clone, Debug)]
pub struct HttpManagementClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
    retry: RetryPolicy,
}

impl HttpManagementClient {
    /// Constructs a client from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] when configuration validation fails or
    /// the base URL cannot be parsed, or [`ApiError::Transport`] when the
    /// HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        config.validate()?;
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|err| ApiError::Config(format!("invalid base URL: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(String::from(
                "base URL must carry a host and path",
            )));
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ApiError::Transport {
                message: err.to_string(),
            })?;
        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// Overrides the retry policy used for wire calls.
    ///
    /// This is primarily used by tests to keep failure scenarios fast.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    fn collection_url(&self) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("rules-configs");
        }
        url
    }

    // Keys are pushed as a single path segment so reserved characters such as
    // '/', '#', and spaces are percent-encoded on the wire.
    fn record_url(&self, key: &str) -> Url {
        let mut url = self.collection_url();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(key);
        }
        url
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch_all(&self) -> Result<Vec<RulesConfigRecord>, ApiError> {
        let response = self
            .http
            .get(self.collection_url())
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| ApiError::Transport {
                message: err.to_string(),
            })?;
        let checked = Self::check_status(response).await?;
        checked
            .json::<Vec<RulesConfigRecord>>()
            .await
            .map_err(|err| ApiError::Decode {
                message: err.to_string(),
            })
    }

    async fn delete_one(&self, selector: &KeySelector) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(self.record_url(&selector.key))
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|err| ApiError::Transport {
                message: err.to_string(),
            })?;
        Self::check_status(response).await.map(|_| ())
    }

    async fn put_one(&self, selector: &KeySelector, payload: &ValuePayload) -> Result<(), ApiError> {
        let response = self
            .http
            .put(self.record_url(&selector.key))
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await
            .map_err(|err| ApiError::Transport {
                message: err.to_string(),
            })?;
        Self::check_status(response).await.map(|_| ())
    }
}

impl ManagementClient for HttpManagementClient {
    type Error = ApiError;

    fn list(&self) -> ClientFuture<'_, Vec<RulesConfigRecord>, Self::Error> {
        Box::pin(async move { call_with_retry(&self.retry, || self.fetch_all()).await })
    }

    fn remove<'a>(&'a self, selector: &'a KeySelector) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move { call_with_retry(&self.retry, || self.delete_one(selector)).await })
    }

    fn upsert<'a>(
        &'a self,
        selector: &'a KeySelector,
        payload: &'a ValuePayload,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            call_with_retry(&self.retry, || self.put_one(selector, payload)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn client(base_url: &str) -> HttpManagementClient {
        HttpManagementClient::new(&ApiConfig {
            base_url: base_url.to_owned(),
            token: String::from("token"),
            concurrent_calls: 5,
        })
        .expect("client should build")
    }

    #[test]
    fn new_rejects_invalid_configuration() {
        let err = HttpManagementClient::new(&ApiConfig {
            base_url: String::from("  "),
            token: String::from("token"),
            concurrent_calls: 5,
        })
        .expect_err("blank base URL should be rejected");
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn new_rejects_an_unparsable_base_url() {
        let err = HttpManagementClient::new(&ApiConfig {
            base_url: String::from("not a url"),
            token: String::from("token"),
            concurrent_calls: 5,
        })
        .expect_err("unparsable base URL should be rejected");
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[rstest]
    #[case::plain("https://tenant.example.com/api/v2")]
    #[case::trailing_slash("https://tenant.example.com/api/v2/")]
    #[case::bare_host("https://tenant.example.com")]
    fn urls_are_joined_without_duplicate_slashes(#[case] base_url: &str) {
        let api = client(base_url);
        assert_eq!(
            api.collection_url().as_str(),
            format!("{}/rules-configs", base_url.trim_end_matches('/'))
        );
        assert_eq!(
            api.record_url("foo").as_str(),
            format!("{}/rules-configs/foo", base_url.trim_end_matches('/'))
        );
    }

    #[rstest]
    #[case::slash("a/b", "a%2Fb")]
    #[case::space("a b", "a%20b")]
    #[case::fragment("a#b", "a%23b")]
    #[case::query("a?b", "a%3Fb")]
    fn record_urls_percent_encode_reserved_key_characters(
        #[case] key: &str,
        #[case] encoded: &str,
    ) {
        let api = client("https://tenant.example.com/api/v2");
        assert_eq!(
            api.record_url(key).as_str(),
            format!("https://tenant.example.com/api/v2/rules-configs/{encoded}")
        );
    }

    #[rstest]
    #[case::rate_limited(ApiError::RateLimited, true)]
    #[case::transport(ApiError::Transport { message: String::from("reset") }, true)]
    #[case::server_error(ApiError::Status { status: 503, body: String::new() }, true)]
    #[case::client_error(ApiError::Status { status: 404, body: String::new() }, false)]
    #[case::decode(ApiError::Decode { message: String::from("eof") }, false)]
    #[case::config(ApiError::Config(String::from("missing token")), false)]
    fn transient_classification_matches_the_retry_contract(
        #[case] err: ApiError,
        #[case] expected: bool,
    ) {
        assert_eq!(err.is_transient(), expected);
    }
}
