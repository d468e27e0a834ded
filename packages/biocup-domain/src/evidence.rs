/// Truncates `text` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn snippet(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((cut, _)) => format!("{}…", &text[..cut]),
		None => text.to_string(),
	}
}
