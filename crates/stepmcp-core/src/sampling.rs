//! Server-initiated sampling support
//!
//! Lets a tool ask the client for an LLM completion. Whether the client can
//! answer is negotiated per request: [`Sampling::is_supported`] is false when
//! no [`Sampler`] was attached to the context.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{McpError, McpResult};
use crate::types::{CreateMessageRequest, CreateMessageResult, SamplingMessage};

/// Message used whenever sampling is requested from a client that can't do it.
pub const SAMPLING_NOT_SUPPORTED: &str = "Sampling not supported";

/// Channel to the client's model-serving capability.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Send a `sampling/createMessage` request to the client
    async fn create_message(&self, request: CreateMessageRequest)
    -> McpResult<CreateMessageResult>;
}

/// Per-request sampling capability.
#[derive(Clone, Default)]
pub struct Sampling {
    sampler: Option<Arc<dyn Sampler>>,
}

impl Sampling {
    /// Wrap an optional sampler.
    #[must_use]
    pub fn new(sampler: Option<Arc<dyn Sampler>>) -> Self {
        Self { sampler }
    }

    /// Whether the client supports sampling.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.sampler.is_some()
    }

    /// Start building a sampling request.
    #[must_use]
    pub fn request_builder(&self) -> SamplingRequestBuilder {
        SamplingRequestBuilder {
            sampler: self.sampler.clone(),
            request: CreateMessageRequest::default(),
        }
    }
}

impl fmt::Debug for Sampling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampling")
            .field("supported", &self.is_supported())
            .finish()
    }
}

/// Builder for [`SamplingRequest`].
pub struct SamplingRequestBuilder {
    sampler: Option<Arc<dyn Sampler>>,
    request: CreateMessageRequest,
}

impl SamplingRequestBuilder {
    /// Token budget for the completion.
    #[must_use]
    pub fn set_max_tokens(mut self, max_tokens: u32) -> Self {
        self.request.max_tokens = Some(max_tokens);
        self
    }

    /// Append a message to the conversation.
    #[must_use]
    pub fn add_message(mut self, message: SamplingMessage) -> Self {
        self.request.messages.push(message);
        self
    }

    /// System prompt.
    #[must_use]
    pub fn set_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.request.system_prompt = Some(prompt.into());
        self
    }

    /// Sampling temperature.
    #[must_use]
    pub fn set_temperature(mut self, temperature: f64) -> Self {
        self.request.temperature = Some(temperature);
        self
    }

    /// Finish the request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParams` if no message was added.
    pub fn build(self) -> McpResult<SamplingRequest> {
        if self.request.messages.is_empty() {
            return Err(McpError::invalid_params(
                "Sampling request needs at least one message",
            ));
        }
        Ok(SamplingRequest {
            sampler: self.sampler,
            request: self.request,
        })
    }
}

impl fmt::Debug for SamplingRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingRequestBuilder")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// A ready-to-send sampling request.
pub struct SamplingRequest {
    sampler: Option<Arc<dyn Sampler>>,
    request: CreateMessageRequest,
}

impl SamplingRequest {
    /// The request payload.
    #[must_use]
    pub fn request(&self) -> &CreateMessageRequest {
        &self.request
    }

    /// Send the request and wait for the client's answer.
    ///
    /// # Errors
    ///
    /// - `CapabilityNotSupported` if the client can't sample
    /// - whatever the sampler reports
    pub async fn send(self) -> McpResult<CreateMessageResult> {
        let sampler = self.sampler.ok_or_else(|| {
            McpError::capability_not_supported(SAMPLING_NOT_SUPPORTED).with_operation("sampling")
        })?;
        sampler
            .create_message(self.request)
            .await
            .map_err(|e| e.with_operation("sampling"))
    }
}

impl fmt::Debug for SamplingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SamplingRequest")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}
