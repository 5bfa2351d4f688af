use serde_json::{json, Value};

/// One prompt for the generation service. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn to_payload(&self) -> Value {
        json!({
            "system_instruction": {
                "role": "system",
                "parts": [{ "text": self.system_prompt }]
            },
            "contents": [{
                "role": "user",
                "parts": [{ "text": self.user_prompt }]
            }],
            "generation_config": {
                "max_output_tokens": self.max_output_tokens
            }
        })
    }
}

/// Classified result of a single upstream call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Success(String),
    EmptyResult,
    TransportError(String),
    ProtocolError { status: u16, detail: String },
}

impl GenerationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationOutcome::Success(_) => "SUCCESS",
            GenerationOutcome::EmptyResult => "EMPTY_RESULT",
            GenerationOutcome::TransportError(_) => "TRANSPORT_ERROR",
            GenerationOutcome::ProtocolError { .. } => "PROTOCOL_ERROR",
        }
    }

    /// Only failures to reach or be accepted by the service are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationOutcome::TransportError(_) | GenerationOutcome::ProtocolError { .. }
        )
    }
}
