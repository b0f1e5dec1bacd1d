use crate::session::SessionState;

/// Plain-text view of a session, as printed by `quickask ask`.
pub fn render_state(state: &SessionState) -> String {
    if state.is_loading {
        return "Searching...\n".to_string();
    }

    let mut out = String::new();

    if let Some(error) = &state.error {
        out.push_str(&format!("! {error}\n\n"));
    }

    if let Some(answer) = &state.answer {
        out.push_str(&format!("AI Summary\n  {answer}\n\n"));
    }

    if !state.results.is_empty() {
        out.push_str("Search Results\n");
        for (i, result) in state.results.iter().enumerate() {
            out.push_str(&format!(
                "{}. {}\n   {}\n   {} <{}>\n",
                i + 1,
                result.title,
                result.snippet,
                result.source,
                result.url
            ));
        }
    }

    if out.is_empty() {
        out.push_str("Ready to search\n  Type your question to get started.\n");
    }

    out
}
