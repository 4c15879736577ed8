//! Shared HTTP client construction.
//!
//! Every outbound API call goes through a [`ClientWithMiddleware`] that
//! retries transient failures with exponential backoff and honours
//! `Retry-After` headers.

use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use reqwest_retry_after::RetryAfterMiddleware;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub fn client_with_retries(max_retries: u32) -> ClientWithMiddleware {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default();

    wrap_with_retries(client, max_retries)
}

pub fn wrap_with_retries(client: reqwest::Client, max_retries: u32) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);

    ClientBuilder::new(client)
        .with(RetryAfterMiddleware::new())
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

pub fn default_client() -> ClientWithMiddleware {
    client_with_retries(DEFAULT_MAX_RETRIES)
}
