use crate::extractor::extract_text;
use crate::schemas::generation::{GenerationOutcome, GenerationRequest};
use crate::settings::GenerationSettings;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;

/// A single, non-retrying call to the text-generation service.
pub trait GenerationClient: Send + Sync {
    fn send<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, GenerationOutcome>;
}

#[derive(Clone)]
pub struct LLMClient {
    inner: Arc<Client>,
    endpoint: String,
    api_key: String,
}

impl LLMClient {
    pub fn new(settings: &GenerationSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            inner: Arc::new(client),
            endpoint: settings.endpoint(),
            api_key: settings.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call_llm(&self, request: &GenerationRequest) -> GenerationOutcome {
        let response_result = self
            .inner
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&request.to_payload())
            .send()
            .await;

        let response = match response_result {
            Ok(resp) => resp,
            Err(e) => {
                let error_type = if e.is_timeout() {
                    "timeout"
                } else if e.is_connect() {
                    "connection"
                } else {
                    "other"
                };

                // reqwest errors carry the URL, which carries the key
                let e = e.without_url();
                tracing::warn!("LLM request failed: {} error - {}", error_type, e);

                return GenerationOutcome::TransportError(format!(
                    "Request error ({}): {}",
                    error_type, e
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| format!("HTTP error: {}", status));

            tracing::warn!(
                "LLM request failed with status {}: {}",
                status,
                error_body
            );

            return GenerationOutcome::ProtocolError {
                status: status.as_u16(),
                detail: error_body,
            };
        }

        let raw_response = match response.json::<Value>().await {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("LLM response with status {} is not JSON: {}", status, e);
                return GenerationOutcome::ProtocolError {
                    status: status.as_u16(),
                    detail: format!("JSON parsing error: {}", e.without_url()),
                };
            }
        };

        tracing::debug!(
            "LLM full response: {}",
            serde_json::to_string_pretty(&raw_response).unwrap_or_default()
        );

        match extract_text(&raw_response) {
            Some(text) => GenerationOutcome::Success(text),
            None => {
                tracing::info!("LLM response carried no usable text");
                GenerationOutcome::EmptyResult
            }
        }
    }
}

impl GenerationClient for LLMClient {
    fn send<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, GenerationOutcome> {
        self.call_llm(request).boxed()
    }
}
