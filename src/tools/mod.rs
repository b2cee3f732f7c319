pub mod get_verse;
pub mod match_verse;

use get_verse::GetVerseParams;
use match_verse::MatchVerseParams;
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use std::sync::Arc;

use gita_match::GitaEngine;

/// The gita-match MCP tool handler. Holds the shared engine and exposes the tools via the
/// `#[tool_router]` macro.
#[derive(Clone)]
pub struct GitaTools {
    tool_router: ToolRouter<Self>,
    engine: Arc<GitaEngine>,
}

#[tool_router]
impl GitaTools {
    pub fn new(engine: Arc<GitaEngine>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            engine,
        }
    }

    /// Find the verse that best answers what the user is feeling.
    #[tool(description = "Match a personal statement (a feeling, worry, or dilemma) to the most relevant Bhagavad Gita verse. Returns the verse, its linked story, and a debug trace, or a no_match outcome with a reason.")]
    async fn match_verse(
        &self,
        Parameters(params): Parameters<MatchVerseParams>,
    ) -> Result<String, String> {
        tracing::info!(query_len = params.query.len(), "match_verse called");

        let outcome = self.engine.match_query(&params.query).await;

        serde_json::to_string(&outcome).map_err(|e| format!("serialization failed: {e}"))
    }

    /// Fetch one verse by ID.
    #[tool(description = "Get a verse by its ID (e.g. '2.47'), with its linked story if any.")]
    async fn get_verse(
        &self,
        Parameters(params): Parameters<GetVerseParams>,
    ) -> Result<String, String> {
        tracing::info!(id = %params.id, "get_verse called");

        let found = self
            .engine
            .get_entry(params.id.trim())
            .await
            .map_err(|e| format!("engine unavailable: {e}"))?;
        let (entry, narrative) = found.ok_or_else(|| format!("verse not found: {}", params.id))?;

        Ok(serde_json::json!({
            "entry": entry,
            "narrative": narrative,
        })
        .to_string())
    }
}

#[tool_handler]
impl ServerHandler for GitaTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "gita-match finds the Bhagavad Gita verse that speaks to how someone feels. \
                 Use match_verse with the user's own words, and get_verse to look up a verse \
                 by ID."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
