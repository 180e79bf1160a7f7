//! Display helpers shared by logging and the API layer.

use chrono::{DateTime, NaiveDate};

/// Shortens an identifier for log output.
///
/// Shows only the first 8 characters followed by ".." for longer ids.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((end, _)) => format!("{}..", &id[..end]),
		None => id.to_string(),
	}
}

/// Renders a stored order date as `YYYY-MM-DD`.
///
/// Accepts RFC 3339 timestamps and plain dates. Blank or unparsable values
/// render as an empty string so degraded records can still be displayed.
pub fn format_order_date(raw: &str) -> String {
	let raw = raw.trim();
	if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
		return timestamp.date_naive().format("%Y-%m-%d").to_string();
	}
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.map(|date| date.format("%Y-%m-%d").to_string())
		.unwrap_or_default()
}
