//! Align a model batch with the input batch.
//!
//! The model is asked for exactly one line per action but nothing forces it.
//! Under [`ReconcilePolicy::Align`] the returned batch always has one line per
//! input action, in input order: model lines are matched by action id, missing
//! actions get a fallback line, and lines for unknown ids are dropped.

use super::fallback::synthesize_one;
use super::models::{ActionEvent, CommentaryLine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcilePolicy {
    /// Pad, drop and reorder to match the input action ids
    #[default]
    Align,
    /// Return the model batch as decoded
    Trust,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub lines: Vec<CommentaryLine>,
    /// Input actions answered by a model line
    pub matched: usize,
    /// Input actions answered by a fallback line
    pub padded: usize,
    /// Model lines with no matching input action
    pub dropped: usize,
}

impl Reconciliation {
    pub fn is_exact(&self) -> bool {
        self.padded == 0 && self.dropped == 0
    }
}

pub fn reconcile(events: &[ActionEvent], model_lines: Vec<CommentaryLine>) -> Reconciliation {
    let total_model = model_lines.len();
    let mut slots: Vec<Option<CommentaryLine>> = model_lines.into_iter().map(Some).collect();
    let mut lines = Vec::with_capacity(events.len());
    let mut matched = 0;

    for (idx, event) in events.iter().enumerate() {
        let fallback = synthesize_one(event);
        let wanted = fallback.action_id.trim();

        let position = if wanted.is_empty() {
            // No id to match on: only the line in the same position qualifies
            slots
                .get(idx)
                .and_then(|slot| slot.as_ref())
                .filter(|line| line.action_id.trim().is_empty())
                .map(|_| idx)
        } else {
            slots.iter().position(|slot| {
                slot.as_ref()
                    .is_some_and(|line| line.action_id.trim() == wanted)
            })
        };

        match position.and_then(|pos| slots[pos].take()) {
            Some(mut line) => {
                if line.time_seconds.trim().is_empty() {
                    line.time_seconds = fallback.time_seconds;
                }
                matched += 1;
                lines.push(line);
            }
            None => lines.push(fallback),
        }
    }

    Reconciliation {
        padded: lines.len() - matched,
        dropped: total_model - matched,
        matched,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commentary::fallback::FILLER_DESCRIPTION;
    use crate::commentary::models::Tone;
    use serde_json::json;

    fn events(ids: &[&str]) -> Vec<ActionEvent> {
        ids.iter()
            .map(|id| serde_json::from_value(json!({"actionId": id, "timeSeconds": "1.0"})).unwrap())
            .collect()
    }

    fn line(id: &str, description: &str) -> CommentaryLine {
        CommentaryLine {
            action_id: id.into(),
            time_seconds: "1.0".into(),
            tone: Tone::Excited,
            description: description.into(),
        }
    }

    #[test]
    fn test_exact_batch_passes_through() {
        let result = reconcile(&events(&["1", "2"]), vec![line("1", "a"), line("2", "b")]);
        assert!(result.is_exact());
        assert_eq!(result.matched, 2);
        assert_eq!(result.lines[1].description, "b");
    }

    #[test]
    fn test_missing_lines_are_padded_with_fallback() {
        let result = reconcile(&events(&["1", "2", "3"]), vec![line("1", "a"), line("3", "c")]);
        assert_eq!(result.lines.len(), 3);
        assert_eq!(result.padded, 1);
        assert_eq!(result.lines[1].action_id, "2");
        assert_eq!(result.lines[1].description, FILLER_DESCRIPTION);
        assert_eq!(result.lines[1].tone, Tone::Default);
        assert_eq!(result.lines[2].description, "c");
    }

    #[test]
    fn test_unknown_and_duplicate_lines_are_dropped() {
        let result = reconcile(
            &events(&["1"]),
            vec![line("1", "first"), line("1", "dupe"), line("99", "ghost")],
        );
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].description, "first");
        assert_eq!(result.dropped, 2);
    }

    #[test]
    fn test_out_of_order_lines_are_reordered() {
        let result = reconcile(&events(&["1", "2"]), vec![line("2", "b"), line("1", "a")]);
        assert_eq!(result.lines[0].description, "a");
        assert_eq!(result.lines[1].description, "b");
        assert!(result.is_exact());
    }

    #[test]
    fn test_blank_time_filled_from_input() {
        let mut model = line("1", "a");
        model.time_seconds = String::new();
        let result = reconcile(&events(&["1"]), vec![model]);
        assert_eq!(result.lines[0].time_seconds, "1.0");
    }

    #[test]
    fn test_policy_serde_names() {
        assert_eq!(serde_json::to_value(ReconcilePolicy::Align).unwrap(), json!("align"));
        let trust: ReconcilePolicy = serde_json::from_value(json!("trust")).unwrap();
        assert_eq!(trust, ReconcilePolicy::Trust);
    }
}
