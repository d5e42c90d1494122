//! HTTP client for the interpretation service.

use crate::config::{InterpreterConfig, RecoveryConfig};
use crate::interpreter::circuit_breaker::CircuitBreaker;
use crate::interpreter::{InterpretationRequest, InterpretationResponse};
use rand::Rng;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, warn};

#[derive(Debug)]
pub enum InterpreterError {
    /// No endpoint configured
    NotConfigured,
    /// Too many recent failures; the request was not sent
    CircuitOpen,
    Timeout,
    NetworkError(reqwest::Error),
    ApiError { status: reqwest::StatusCode, error_body: String },
    /// The service answered with something that is not an interpretation
    InvalidResponse(String),
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterpreterError::NotConfigured => write!(f, "Interpreter endpoint is not configured"),
            InterpreterError::CircuitOpen => {
                write!(f, "Interpreter circuit breaker is open, request not sent")
            }
            InterpreterError::Timeout => write!(f, "Interpreter request timed out"),
            InterpreterError::NetworkError(err) => write!(f, "Network error: {}", err),
            InterpreterError::ApiError { status, error_body } => {
                write!(f, "API error {}: {}", status, error_body)
            }
            InterpreterError::InvalidResponse(msg) => {
                write!(f, "Invalid interpreter response: {}", msg)
            }
        }
    }
}

impl std::error::Error for InterpreterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InterpreterError::NetworkError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for InterpreterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InterpreterError::Timeout
        } else {
            InterpreterError::NetworkError(err)
        }
    }
}

impl InterpreterError {
    /// Transient failures worth another attempt; these also count against the
    /// circuit breaker
    pub fn is_retryable(&self) -> bool {
        match self {
            InterpreterError::Timeout | InterpreterError::NetworkError(_) => true,
            InterpreterError::ApiError { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}

/// Delay before retry number `attempt` (0-based): exponential from the base
/// delay, plus up to 50% random jitter, capped at the maximum delay
pub fn retry_delay(recovery: &RecoveryConfig, attempt: u32) -> Duration {
    let exponential = recovery
        .base_retry_delay_ms
        .saturating_mul(2u64.saturating_pow(attempt))
        .min(recovery.max_retry_delay_ms);
    let jitter = rand::thread_rng().gen_range(0..=exponential / 2);
    Duration::from_millis(exponential.saturating_add(jitter).min(recovery.max_retry_delay_ms))
}

/// Client for the interpretation service
pub struct InterpreterClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
    recovery: RecoveryConfig,
    breaker: CircuitBreaker,
}

impl InterpreterClient {
    pub fn new(config: &InterpreterConfig) -> Result<Self, InterpreterError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or(InterpreterError::NotConfigured)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            endpoint,
            api_key: config.api_key.clone(),
            recovery: config.recovery.clone(),
            breaker: CircuitBreaker::new(&config.recovery),
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Ask the service to interpret a free-text edit request
    ///
    /// Transient failures are retried with backoff. The answer is returned as
    /// is and must still go through the patch validator.
    pub async fn interpret(
        &self,
        request: &InterpretationRequest,
    ) -> Result<InterpretationResponse, InterpreterError> {
        let mut attempt = 0;
        loop {
            if self.breaker.is_open() {
                warn!(endpoint = %self.endpoint, "Interpreter circuit breaker open, failing fast");
                return Err(InterpreterError::CircuitOpen);
            }

            match self.send(request).await {
                Ok(response) => {
                    self.breaker.record_success();
                    debug!(
                        hints = response.hints.len(),
                        operations = response.operations.as_ref().map_or(0, Vec::len),
                        "Interpreter answered"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_retryable() && attempt < self.recovery.max_retries => {
                    self.breaker.record_failure();
                    let delay = retry_delay(&self.recovery, attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Interpreter request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        self.breaker.record_failure();
                    }
                    error!(attempts = attempt + 1, error = %e, "Interpreter request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn send(
        &self,
        request: &InterpretationRequest,
    ) -> Result<InterpretationResponse, InterpreterError> {
        let mut builder = self
            .http
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        if response.status().is_success() {
            response
                .json::<InterpretationResponse>()
                .await
                .map_err(|e| InterpreterError::InvalidResponse(e.to_string()))
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            Err(InterpreterError::ApiError { status, error_body })
        }
    }
}
