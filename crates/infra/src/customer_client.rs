//! Outbound HTTP client for the customer service.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::instrument;

use orders_core::CustomerResponse;

#[derive(Debug, Error)]
pub enum CustomerClientError {
    #[error("invalid customer service address: {0}")]
    InvalidAddress(String),

    #[error("customer service request failed: {0}")]
    Transport(String),

    /// The remote answered with anything other than 200.
    #[error("Service returned error status code: {0}")]
    Status(u16),

    #[error("could not decode customer response: {0}")]
    Decode(String),
}

/// `GET <base>/v1/customers/{id}` against a resolved customer service instance.
#[derive(Debug, Clone)]
pub struct CustomerClient {
    http: reqwest::Client,
}

impl CustomerClient {
    pub fn new(timeout: Duration) -> Result<Self, CustomerClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CustomerClientError::Transport(e.to_string()))?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Resource URL of a customer under `base`, keeping any path prefix of `base`.
    pub fn customer_url(base: &Url, customer_id: i64) -> Result<Url, CustomerClientError> {
        let mut base = base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!("v1/customers/{customer_id}"))
            .map_err(|e| CustomerClientError::InvalidAddress(format!("{base}: {e}")))
    }

    /// Fetch a customer. Only an exact 200 counts as success.
    #[instrument(skip(self, base), fields(base = %base), err)]
    pub async fn get_customer(
        &self,
        base: &Url,
        customer_id: i64,
    ) -> Result<CustomerResponse, CustomerClientError> {
        let url = Self::customer_url(base, customer_id)?;

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CustomerClientError::Transport(e.to_string()))?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(CustomerClientError::Status(status.as_u16()));
        }

        res.json::<CustomerResponse>()
            .await
            .map_err(|e| CustomerClientError::Decode(e.to_string()))
    }
}
