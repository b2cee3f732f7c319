//! MCP `match_verse` tool parameter definition.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the `match_verse` MCP tool.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MatchVerseParams {
    /// The user's statement, in their own words.
    #[schemars(
        description = "What the user is feeling or facing, in their own words, e.g. 'I feel anxious about my exams'"
    )]
    pub query: String,
}
