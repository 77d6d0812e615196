//! Compact text renderings of match data for the model prompt.
//!
//! Both renderers are total: unresolvable values degrade to empty cells or
//! the `N/A` marker, never to an error.

use super::aliases::{value_text, Resolution, ResolvedRecord, ACTION_FIELDS, MATCH_FIELDS};
use super::models::{ActionEvent, MatchContext};
use serde_json::Value;

/// Marker for match fields that are missing or empty
pub const NOT_AVAILABLE: &str = "N/A";

const COORDINATE_COLUMNS: &[&str] = &["start_x", "start_y", "end_x", "end_y", "dx", "dy"];

/// Render actions as CSV: a header line plus one row per action, in input order.
///
/// Keys outside the fixed column set (such as a persistence `id`) are dropped.
pub fn render_actions(events: &[ActionEvent]) -> String {
    let header = ACTION_FIELDS
        .iter()
        .map(|f| f.canonical)
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = Vec::with_capacity(events.len() + 1);
    lines.push(header);

    for event in events {
        let resolved =
            ResolvedRecord::resolve(event.fields(), ACTION_FIELDS, Resolution::FirstPresent);
        let row = resolved
            .iter()
            .map(|(column, lookup)| match lookup.value() {
                Some(value) => escape_csv(&cell_text(column, value)),
                None => String::new(),
            })
            .collect::<Vec<_>>()
            .join(",");
        lines.push(row);
    }

    lines.join("\n")
}

fn cell_text(column: &str, value: &Value) -> String {
    if COORDINATE_COLUMNS.contains(&column) {
        if let Some(rounded) = round_coordinate(value) {
            return rounded;
        }
    }
    value_text(value)
}

/// Round a numeric (or numeric-string) coordinate to 2 decimals, ties to
/// even on the exact binary value. Booleans count as 1.0 / 0.0.
/// Returns `None` when the value is not a finite number, so it passes through.
fn round_coordinate(value: &Value) -> Option<String> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    if !parsed.is_finite() {
        return None;
    }
    let rounded = format!("{:.2}", parsed).parse::<f64>().ok()?;
    if !rounded.is_finite() {
        return None;
    }
    // -0.0 would otherwise render as "-0.0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let mut text = rounded.to_string();
    if !text.contains('.') {
        text.push_str(".0");
    }
    Some(text)
}

fn escape_csv(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Render match metadata as one labeled line per field, in a fixed order.
pub fn render_context(context: &MatchContext) -> String {
    let resolved = ResolvedRecord::resolve(context.fields(), MATCH_FIELDS, Resolution::FirstTruthy);
    let get = |key: &str| -> String {
        resolved
            .lookup(key)
            .value()
            .map(context_text)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    [
        format!("Game ID: {}", get("gameId")),
        format!(
            "Home team: {} ({})",
            get("homeTeamNameKo"),
            get("homeTeamNameKoShort")
        ),
        format!(
            "Away team: {} ({})",
            get("awayTeamNameKo"),
            get("awayTeamNameKoShort")
        ),
        format!("Venue: {}", get("venue")),
        format!("Date: {}", get("gameDate")),
        format!("Weather: {}", get("weather")),
        format!("Temperature: {}", get("temperature")),
        format!("Home uniform: {}", get("homeTeamUniform")),
        format!("Away uniform: {}", get("awayTeamUniform")),
        format!("Referee: {}", get("referee")),
        format!("Assistant referees: {}", get("assistantReferees")),
        format!("Fourth official: {}", get("fourthOfficial")),
        format!("VAR referees: {}", get("varReferees")),
    ]
    .join("\n")
}

/// Officials often arrive as lists; show them comma-separated.
fn context_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => value_text(other),
    }
}
