use async_trait::async_trait;
use stepmcp_core::{
    CallToolResult, McpError, McpResult, RequestContext, SAMPLING_NOT_SUPPORTED, SamplingMessage,
};
use tracing::debug;

use crate::registry::{ToolArgument, ToolArguments, ToolDescriptor, ToolHandler};

/// Token budget for the sampling request.
pub const SAMPLING_MAX_TOKENS: u32 = 100;

/// `justTestSampling`: ask the client's model about a topic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingProbe;

#[async_trait]
impl ToolHandler for SamplingProbe {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("justTestSampling", "Just test the sampling feature")
            .argument(ToolArgument::required("topic", "Topic to ask about"))
    }

    async fn call(&self, args: ToolArguments, ctx: RequestContext) -> McpResult<CallToolResult> {
        let topic = args.string("topic")?;
        let sampling = ctx.sampling();
        if !sampling.is_supported() {
            return Err(McpError::capability_not_supported(SAMPLING_NOT_SUPPORTED));
        }

        let response = sampling
            .request_builder()
            .set_max_tokens(SAMPLING_MAX_TOKENS)
            .add_message(SamplingMessage::user(format!("Tell me more about {}", topic)))
            .build()?
            .send()
            .await?;

        let text = response.content.as_text().ok_or_else(|| {
            McpError::tool_execution_failed("justTestSampling", "Sampling response had no text")
        })?;
        debug!(tool = "justTestSampling", model = %response.model, "Sampling answered");
        Ok(CallToolResult::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor() {
        let descriptor = SamplingProbe.descriptor();
        assert_eq!(descriptor.name, "justTestSampling");
        assert_eq!(descriptor.description, "Just test the sampling feature");
        assert_eq!(descriptor.arguments[0].name, "topic");
        assert!(descriptor.arguments[0].required);
    }
}
