use crate::llm_wrapper::GenerationClient;
use crate::schemas::generation::{GenerationOutcome, GenerationRequest};
use crate::settings::RetrySettings;
use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry::strategy::FixedInterval;
use tracing::{error, info, warn};

pub const FALLBACK_REPLY: &str = "Olá! Sou o Chatbot do Novembro Azul. \
Não consegui gerar uma resposta detalhada agora, mas lembre-se: \
fazer check-ups regularmente e ficar atento aos sintomas é fundamental. \
Pergunte sobre prevenção, sintomas ou exames!";

/// Suspends the calling task between attempts.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        tokio::time::sleep(duration).boxed()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based), or `None` when no attempt follows.
    pub fn backoff_after(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        FixedInterval::new(self.backoff)
            .take(self.attempts.saturating_sub(1) as usize)
            .nth(attempt as usize - 1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy {
            attempts: settings.attempts.max(1),
            backoff: Duration::from_millis(settings.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    Attempting(u32),
    Succeeded { text: String, attempts: u32 },
    Exhausted { attempts: u32 },
}

impl RetryState {
    /// Transition taken after attempt `attempt` produced `outcome`.
    pub fn after(attempt: u32, max_attempts: u32, outcome: GenerationOutcome) -> RetryState {
        if outcome.is_retryable() {
            return if attempt < max_attempts {
                RetryState::Attempting(attempt + 1)
            } else {
                RetryState::Exhausted { attempts: attempt }
            };
        }

        match outcome {
            GenerationOutcome::Success(text) => RetryState::Succeeded {
                text,
                attempts: attempt,
            },
            _ => RetryState::Exhausted { attempts: attempt },
        }
    }
}

/// Final answer for one chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub attempts: u32,
    pub fallback: bool,
}

pub fn build_request(
    user_input: &str,
    now: DateTime<Local>,
    max_output_tokens: u32,
) -> GenerationRequest {
    let system_prompt = format!(
        "Você é um assistente especializado em conscientização do Novembro Azul. \
Sempre dê ênfase a temas de câncer de próstata, prevenção, sintomas e check-ups. \
A hora atual é {}. \
Responda de forma clara, amigável e educativa.",
        now.format("%H:%M")
    );

    GenerationRequest {
        system_prompt,
        user_prompt: format!("O usuário perguntou: '{}'", user_input),
        max_output_tokens,
    }
}

#[derive(Clone)]
pub struct RetryingResponder {
    client: Arc<dyn GenerationClient>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    max_output_tokens: u32,
}

impl RetryingResponder {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            client,
            sleeper,
            policy,
            max_output_tokens,
        }
    }

    /// Never fails; falls back to [`FALLBACK_REPLY`] when no attempt yields text.
    pub async fn respond(&self, user_input: &str) -> Reply {
        let mut state = RetryState::Attempting(1);

        loop {
            match state {
                RetryState::Attempting(attempt) => {
                    tracing::debug!(
                        "LLM request attempt {}/{}",
                        attempt,
                        self.policy.attempts
                    );

                    let request = build_request(user_input, Local::now(), self.max_output_tokens);
                    let outcome = self.client.send(&request).await;
                    let kind = outcome.as_str();
                    let was_empty = outcome == GenerationOutcome::EmptyResult;
                    state = RetryState::after(attempt, self.policy.attempts, outcome);

                    if let RetryState::Attempting(_) = state {
                        if let Some(delay) = self.policy.backoff_after(attempt) {
                            warn!(
                                "Attempt {}/{} ended with {}. Retrying in {}ms",
                                attempt,
                                self.policy.attempts,
                                kind,
                                delay.as_millis()
                            );
                            self.sleeper.sleep(delay).await;
                        }
                    } else if let RetryState::Exhausted { attempts } = state {
                        if was_empty {
                            info!("No usable text after attempt {}; using fallback", attempts);
                        } else {
                            error!(
                                "LLM request failed after {} attempts. Final outcome: {}",
                                attempts, kind
                            );
                        }
                    }
                }
                RetryState::Succeeded { text, attempts } => {
                    return Reply {
                        text,
                        attempts,
                        fallback: false,
                    };
                }
                RetryState::Exhausted { attempts } => {
                    return Reply {
                        text: FALLBACK_REPLY.to_string(),
                        attempts,
                        fallback: true,
                    };
                }
            }
        }
    }
}
