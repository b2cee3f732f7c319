pub mod doctor;
pub mod embed_corpus;
pub mod match_cmd;

/// Shorten `text` to at most `max` characters, marking the cut with "...".
pub(crate) fn preview(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}
