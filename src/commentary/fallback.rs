use super::aliases::{Resolution, ResolvedRecord, ACTION_FIELDS};
use super::models::{ActionEvent, CommentaryLine, Tone};

/// Used when the action has no resolvable player or type
pub const FILLER_DESCRIPTION: &str = "Play continues.";

/// One minimal line per action, in input order. Never fails and never
/// consults model output.
pub fn synthesize(events: &[ActionEvent]) -> Vec<CommentaryLine> {
    events.iter().map(synthesize_one).collect()
}

/// Fallback line for a single action
pub fn synthesize_one(event: &ActionEvent) -> CommentaryLine {
    let resolved = ResolvedRecord::resolve(event.fields(), ACTION_FIELDS, Resolution::FirstPresent);

    let description = match (resolved.text("player_name_ko"), resolved.text("type_name")) {
        (Some(player), Some(action_type)) => format!("{} plays a {}.", player, action_type),
        _ => FILLER_DESCRIPTION.to_string(),
    };

    CommentaryLine {
        action_id: resolved.text("action_id").unwrap_or_default(),
        time_seconds: resolved.text("time_seconds").unwrap_or_default(),
        tone: Tone::Default,
        description,
    }
}
