//! HTTP client for the budgets service.
//!
//! Used by the transactions service to push recomputed spend totals. The
//! caller's token is forwarded as is, so the budgets service applies its own
//! ownership checks.

use std::time::Duration;

use api_types::{
    ErrorBody,
    budget::{BudgetUpdate, BudgetView},
};
use reqwest::Url;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::Credential;

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("budget service timed out")]
    Timeout,
    #[error("budget service unreachable: {0}")]
    Transport(reqwest::Error),
    #[error("budget service rejected the credential")]
    Unauthorized,
    #[error("budget service denied access")]
    Forbidden,
    #[error("budget not found")]
    NotFound,
    #[error("budget service error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("invalid budget service url: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(err)
        }
    }
}

#[derive(Debug, Clone)]
pub struct BudgetClient {
    base_url: Url,
    http: reqwest::Client,
}

impl BudgetClient {
    /// `timeout` bounds each request end to end.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let mut base_url =
            Url::parse(base_url).map_err(|err| ClientError::InvalidUrl(err.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url, http })
    }

    /// `PUT budgets/{id}` with only `spent_minor` set.
    pub async fn push_spent(
        &self,
        budget_id: Uuid,
        spent_minor: i64,
        credential: &Credential,
    ) -> Result<BudgetView, ClientError> {
        let endpoint = self
            .base_url
            .join(&format!("budgets/{budget_id}"))
            .map_err(|err| ClientError::InvalidUrl(err.to_string()))?;
        let payload = BudgetUpdate {
            spent_minor: Some(spent_minor),
            ..Default::default()
        };

        let res = self
            .http
            .put(endpoint)
            .bearer_auth(credential.token())
            .json(&payload)
            .send()
            .await?;

        if res.status().is_success() {
            return Ok(res.json::<BudgetView>().await?);
        }

        let status = res.status();
        let message = res
            .json::<ErrorBody>()
            .await
            .map(|err| err.error)
            .unwrap_or_else(|_| "unknown error".to_string());

        let err = match status.as_u16() {
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden,
            404 => ClientError::NotFound,
            code => ClientError::Server {
                status: code,
                message,
            },
        };
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_its_path() {
        let client =
            BudgetClient::new("http://localhost:3003/api", Duration::from_secs(1)).unwrap();
        let url = client.base_url.join("budgets/x").unwrap();
        assert_eq!(url.as_str(), "http://localhost:3003/api/budgets/x");
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            BudgetClient::new("not a url", Duration::from_secs(1)),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
