use async_trait::async_trait;
use stepmcp_core::{CallToolResult, McpResult, RequestContext};
use tracing::debug;

use crate::registry::{ToolArgument, ToolArguments, ToolDescriptor, ToolHandler};

/// Answer for Python.
pub const TABS_ANSWER: &str = "Tabs are better for indentation.";
/// Answer for every other language.
pub const SPACES_ANSWER: &str = "Spaces are better for indentation.";

const DEFAULT_LANG: &str = "Java";

/// `theAnswer`: tabs or spaces, by language.
#[derive(Debug, Clone, Copy, Default)]
pub struct TheAnswer;

impl TheAnswer {
    /// The answer for `lang`.
    #[must_use]
    pub fn answer_for(lang: &str) -> &'static str {
        if lang.eq_ignore_ascii_case("python") {
            TABS_ANSWER
        } else {
            SPACES_ANSWER
        }
    }
}

#[async_trait]
impl ToolHandler for TheAnswer {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new("theAnswer", "Answer the ultimate question to tabs vs. spaces").argument(
            ToolArgument::optional("lang", "The programming language", DEFAULT_LANG),
        )
    }

    async fn call(&self, args: ToolArguments, ctx: RequestContext) -> McpResult<CallToolResult> {
        let lang = args.string_or("lang", DEFAULT_LANG)?;
        ctx.log()
            .named("theAnswer")
            .info(format!("Let's try to answer the question for lang: {}", lang));
        let answer = Self::answer_for(&lang);
        debug!(tool = "theAnswer", %lang, answer, "Answered");
        Ok(CallToolResult::text(answer))
    }
}
