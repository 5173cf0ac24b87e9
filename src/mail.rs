//! HTTP client for the delivery-status collaborator.
//!
//! The collaborator accepts a recipient address and platform tag and reports
//! whether a code has been delivered to that mailbox yet.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Success { code: String },
    NotFound,
    /// Any status this client does not understand; ends polling.
    Other(String),
}

#[derive(Clone)]
pub struct MailClient {
    client: Client,
    base_url: Option<String>,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct LookupRequest<'a> {
    recipient: &'a str,
    platform: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    status: String,
    #[serde(default)]
    code: Option<String>,
}

impl MailClient {
    pub fn new(base_url: Option<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    pub async fn lookup(&self, recipient: &str, platform: &str) -> Result<Delivery> {
        let base = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::Internal("MAIL_API_URL not configured".into()))?;

        let mut request = self
            .client
            .post(format!("{}/lookup", base.trim_end_matches('/')))
            .json(&LookupRequest {
                recipient,
                platform,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Delivery API error: {}", e)))?;

        if !response.status().is_success() {
            return Ok(Delivery::Other(format!(
                "http_{}",
                response.status().as_u16()
            )));
        }

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Delivery API returned bad JSON: {}", e)))?;

        match body.status.as_str() {
            "success" => body
                .code
                .filter(|c| !c.trim().is_empty())
                .map(|code| Delivery::Success { code })
                .ok_or_else(|| {
                    AppError::Internal("Delivery API reported success without a code".into())
                }),
            "not_found" => Ok(Delivery::NotFound),
            other => Ok(Delivery::Other(other.to_string())),
        }
    }
}
