/// Mailing list synchronisation for confirmed newsletter subscribers
use crate::config::MailchimpConfig;
use crate::error::{AppError, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Result of a list operation; "already there" and "not there" are not errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    Applied,
    AlreadySubscribed,
    NotFound,
    Skipped,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    title: String,
    #[serde(default)]
    detail: String,
}

#[derive(Clone)]
pub struct MailchimpClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    audience_id: String,
}

impl MailchimpClient {
    pub fn new(config: &MailchimpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!("MAILCHIMP_API_KEY not set; newsletter list sync disabled");
        }

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: format!("https://{}.api.mailchimp.com/3.0", config.server_prefix),
            audience_id: config.audience_id.clone(),
        })
    }

    /// Mailchimp identifies members by the md5 of the lowercased address
    pub fn member_hash(email: &str) -> String {
        crypto_core::hash::md5_hex(&email.trim().to_lowercase())
    }

    fn members_url(&self) -> String {
        format!("{}/lists/{}/members", self.base_url, self.audience_id)
    }

    pub async fn subscribe(&self, email: &str) -> Result<ListOutcome> {
        let Some(key) = &self.api_key else {
            info!(email, "Mailchimp disabled; skipping subscribe");
            return Ok(ListOutcome::Skipped);
        };

        let response = self
            .http
            .post(self.members_url())
            .basic_auth("blog-service", Some(key))
            .json(&json!({ "email_address": email, "status": "subscribed" }))
            .send()
            .await
            .map_err(|e| AppError::ServiceFailure(format!("Mailchimp request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(ListOutcome::Applied);
        }

        let err = read_error(response).await;
        if err.title == "Member Exists" {
            return Ok(ListOutcome::AlreadySubscribed);
        }
        Err(AppError::ServiceFailure(format!(
            "Error subscribing to Mailchimp: {} {}",
            err.title, err.detail
        )))
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<ListOutcome> {
        let Some(key) = &self.api_key else {
            info!(email, "Mailchimp disabled; skipping unsubscribe");
            return Ok(ListOutcome::Skipped);
        };

        let url = format!("{}/{}", self.members_url(), Self::member_hash(email));
        let response = self
            .http
            .patch(url)
            .basic_auth("blog-service", Some(key))
            .json(&json!({ "status": "unsubscribed" }))
            .send()
            .await
            .map_err(|e| AppError::ServiceFailure(format!("Mailchimp request failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(ListOutcome::Applied);
        }

        let status = response.status();
        let err = read_error(response).await;
        if err.title == "Member Not Found" || err.title == "Resource Not Found" || status == 404 {
            return Ok(ListOutcome::NotFound);
        }
        Err(AppError::ServiceFailure(
            "Error unsubscribing from Mailchimp".to_string(),
        ))
    }
}

async fn read_error(response: reqwest::Response) -> ApiError {
    response.json::<ApiError>().await.unwrap_or(ApiError {
        title: String::new(),
        detail: String::new(),
    })
}
