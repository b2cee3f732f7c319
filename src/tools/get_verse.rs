use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetVerseParams {
    #[schemars(description = "Verse ID in 'chapter.verse' form, e.g. '2.47'")]
    pub id: String,
}
