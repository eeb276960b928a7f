use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::config::ContactConfig;
use crate::models::contact::ContactRequest;
use crate::services::platform::UpstreamError;
use crate::utils::error::ApiError;
use crate::utils::redact_secret;

const ENDPOINT: &str = "contact_relay";

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("invalid contact form")]
    Validation(BTreeMap<String, String>),

    #[error("contact relay is not configured")]
    NotConfigured,

    #[error("contact relay unavailable: {0}")]
    Relay(#[from] UpstreamError),

    #[error("contact relay rejected the submission: {0}")]
    Rejected(String),
}

impl From<ContactError> for ApiError {
    fn from(err: ContactError) -> Self {
        match err {
            ContactError::Validation(fields) => ApiError::Validation {
                message: "Invalid contact form".to_string(),
                fields,
            },
            ContactError::NotConfigured => {
                ApiError::ServiceUnavailable("Contact form is temporarily unavailable".to_string())
            }
            ContactError::Relay(e) => {
                tracing::error!("Contact relay failed: {}", e);
                ApiError::ServiceUnavailable("Contact form is temporarily unavailable".to_string())
            }
            ContactError::Rejected(reason) => {
                tracing::error!("Contact relay rejected submission: {}", reason);
                ApiError::Upstream {
                    code: "CONTACT_REJECTED",
                    message: "Failed to send contact message".to_string(),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Forwards contact-form submissions to the email relay API
#[derive(Clone)]
pub struct ContactService {
    client: Client,
    config: ContactConfig,
}

impl ContactService {
    pub fn new(config: ContactConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config
            .access_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Validate and relay one submission. Returns the relay's confirmation message.
    pub async fn submit(&self, request: &ContactRequest) -> Result<String, ContactError> {
        let form = request.trimmed();
        form.validate()
            .map_err(|errors| ContactError::Validation(field_messages(&errors)))?;

        let access_key = match self.config.access_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(ContactError::NotConfigured),
        };

        let params = [
            ("access_key", access_key),
            ("name", form.name.as_str()),
            ("email", form.email.as_str()),
            ("message", form.message.as_str()),
            ("subject", self.config.subject.as_str()),
            ("from_name", self.config.from_name.as_str()),
        ];

        let response = self
            .client
            .post(&self.config.endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport { endpoint: ENDPOINT, source })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let body: String = redact_secret(&raw, access_key).chars().take(512).collect();
            warn!("Contact relay returned {}", status);
            debug!("Contact relay error body: {}", body);
            return Err(UpstreamError::Status {
                endpoint: ENDPOINT,
                status,
                body,
            }
            .into());
        }

        let relay: RelayResponse = response.json().await.map_err(|e| UpstreamError::Malformed {
            endpoint: ENDPOINT,
            reason: e.to_string(),
        })?;

        if !relay.success {
            let reason = relay.message.unwrap_or_else(|| "unknown reason".to_string());
            return Err(ContactError::Rejected(redact_secret(&reason, access_key)));
        }

        info!("Contact form relayed ({} chars)", form.message.chars().count());
        Ok(relay
            .message
            .unwrap_or_else(|| "Message sent successfully".to_string()))
    }
}

/// First error message per invalid field
fn field_messages(errors: &validator::ValidationErrors) -> BTreeMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| format!("Invalid {}", field));
            (field.to_string(), message)
        })
        .collect()
}
