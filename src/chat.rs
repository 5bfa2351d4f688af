use crate::error::ChatError;
use crate::exchange_log::ExchangeLog;
use crate::responder::{RetryingResponder, FALLBACK_REPLY};
use crate::schemas::chat::{ChatRequest, ChatResponse};
use tracing::{error, info, Instrument, Span};
use uuid::Uuid;

pub const MISSING_MESSAGE: &str = "Corpo da requisição deve conter 'message'";
pub const EMPTY_MESSAGE: &str = "Mensagem vazia";

/// Returns the trimmed message, or the validation error the caller should see.
pub fn validate(request: &ChatRequest) -> Result<&str, ChatError> {
    let message = request
        .message
        .as_deref()
        .ok_or_else(|| ChatError::Validation(MISSING_MESSAGE.to_string()))?
        .trim();

    if message.is_empty() {
        return Err(ChatError::Validation(EMPTY_MESSAGE.to_string()));
    }
    Ok(message)
}

#[derive(Clone)]
pub struct ChatService {
    responder: RetryingResponder,
    log: ExchangeLog,
}

impl ChatService {
    pub fn new(responder: RetryingResponder, log: ExchangeLog) -> Self {
        Self { responder, log }
    }

    /// Validates, answers and records one chat message. Only validation can fail;
    /// a failed log write is reported and the answer is still returned.
    #[tracing::instrument(name = "chat", skip_all, fields(request_id = %Uuid::new_v4()))]
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let message = validate(&request)?.to_string();
        let responder = self.responder.clone();
        let log = self.log.clone();

        // Detached: the exchange completes and is logged even if the caller disconnects.
        let exchange = tokio::spawn(
            async move {
                let reply = responder.respond(&message).await;
                info!(
                    "Answered after {} attempt(s){}",
                    reply.attempts,
                    if reply.fallback { " with fallback" } else { "" }
                );

                if let Err(e) = log.append(&message, &reply.text).await {
                    error!(
                        "Failed to record exchange in {}: {}",
                        log.path().display(),
                        e
                    );
                }
                reply.text
            }
            .instrument(Span::current()),
        );

        let response = match exchange.await {
            Ok(text) => text,
            Err(e) => {
                error!("Chat task failed: {}", e);
                FALLBACK_REPLY.to_string()
            }
        };

        Ok(ChatResponse { response })
    }
}
