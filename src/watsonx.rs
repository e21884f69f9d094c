//! watsonx.ai text-generation client.
//!
//! Covers the two HTTP calls the service needs: the IBM Cloud IAM
//! apikey-to-bearer-token exchange (cached until shortly before expiry)
//! and the `/ml/v1/text/generation` endpoint. Both base URLs come from
//! config so tests can point at a mock server.

use crate::config::WatsonxConfig;
use crate::error::{Result, TodoError};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Safety margin subtracted from the token lifetime before re-fetching.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

/// Generation parameter defaults matching the original service.
const MAX_NEW_TOKENS: u32 = 200;
const TEMPERATURE: f32 = 0.1;

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Client for watsonx.ai text generation.
pub struct WatsonxClient {
    config: WatsonxConfig,
    client: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl WatsonxClient {
    /// Create a client from config. Callers should gate construction on
    /// [`WatsonxConfig::is_configured`]; an unconfigured client fails on
    /// first use.
    #[must_use]
    pub fn new(config: WatsonxConfig) -> Self {
        info!(
            model_id = %config.model_id,
            service_url = %config.service_url,
            "watsonx client configured"
        );
        Self {
            config,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// Generate text for a prompt and return the trimmed model output.
    ///
    /// # Errors
    ///
    /// Returns `TodoError::Llm` when the token exchange or the generation
    /// call fails, or when the model returns an empty generation.
    pub async fn generate_text(&self, input: &str) -> Result<String> {
        let token = self.bearer_token().await?;

        let url = format!(
            "{}/ml/v1/text/generation?version={}",
            self.config.service_url.trim_end_matches('/'),
            self.config.version
        );
        let body = serde_json::json!({
            "input": input,
            "model_id": self.config.model_id,
            "project_id": self.config.project_id,
            "parameters": {
                "max_new_tokens": MAX_NEW_TOKENS,
                "temperature": TEMPERATURE,
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(|e| TodoError::Llm(format!("generation request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TodoError::Llm(format!(
                "generation failed ({status}): {body}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TodoError::Llm(format!("invalid generation response: {e}")))?;

        let text = payload["results"][0]["generated_text"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(TodoError::Llm("empty generation".to_owned()));
        }
        Ok(text.to_owned())
    }

    /// Exchange the IAM API key for a bearer token, reusing a cached one
    /// while it is still comfortably valid.
    async fn bearer_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.access_token.clone());
        }

        debug!("exchanging IAM API key for a bearer token");
        let response = self
            .client
            .post(&self.config.iam_url)
            .form(&[
                ("grant_type", "urn:ibm:params:oauth:grant-type:apikey"),
                ("apikey", self.config.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| TodoError::Llm(format!("IAM token request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TodoError::Llm(format!(
                "IAM token exchange failed ({status}): {body}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TodoError::Llm(format!("invalid IAM response: {e}")))?;

        let access_token = payload["access_token"]
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TodoError::Llm("IAM response missing access_token".to_owned()))?
            .to_owned();
        let expires_in = payload["expires_in"].as_u64().unwrap_or(3600);
        let lifetime = expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS).max(1);

        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(access_token)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> WatsonxConfig {
        WatsonxConfig {
            api_key: "test-key".to_owned(),
            project_id: "test-project".to_owned(),
            service_url: server.uri(),
            iam_url: format!("{}/identity/token", server.uri()),
            ..WatsonxConfig::default()
        }
    }

    async fn mount_iam(server: &MockServer, expect: u64) {
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .and(body_string_contains("apikey=test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "iam-token",
                "expires_in": 3600
            })))
            .expect(expect)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn generates_text_with_bearer_token() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/generation"))
            .and(wiremock::matchers::header("authorization", "Bearer iam-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "generated_text": "  {\"title\":\"rapat\"}  " }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WatsonxClient::new(config_for(&server));
        let text = client.generate_text("prompt").await.unwrap();
        assert_eq!(text, "{\"title\":\"rapat\"}");
    }

    #[tokio::test]
    async fn token_is_cached_across_calls() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/generation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "generated_text": "ok" }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = WatsonxClient::new(config_for(&server));
        client.generate_text("one").await.unwrap();
        client.generate_text("two").await.unwrap();
        // wiremock verifies the IAM endpoint saw exactly one request
    }

    #[tokio::test]
    async fn empty_generation_is_an_error() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/generation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{ "generated_text": "   " }]
            })))
            .mount(&server)
            .await;

        let client = WatsonxClient::new(config_for(&server));
        let err = client.generate_text("prompt").await.unwrap_err();
        assert!(err.to_string().contains("empty generation"));
    }

    #[tokio::test]
    async fn failed_generation_carries_status() {
        let server = MockServer::start().await;
        mount_iam(&server, 1).await;

        Mock::given(method("POST"))
            .and(path("/ml/v1/text/generation"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = WatsonxClient::new(config_for(&server));
        let err = client.generate_text("prompt").await.unwrap_err();
        let message = err.to_string();
        assert!(message.contains("429"), "message was: {message}");
    }

    #[tokio::test]
    async fn failed_token_exchange_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/identity/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad apikey"))
            .mount(&server)
            .await;

        let client = WatsonxClient::new(config_for(&server));
        let err = client.generate_text("prompt").await.unwrap_err();
        assert!(err.to_string().contains("IAM token exchange failed"));
    }
}
