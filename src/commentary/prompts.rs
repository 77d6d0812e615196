use super::models::{ActionEvent, CommentaryStyle, MatchContext, Prompt};
use super::serialize::{render_actions, render_context};

// ═══════════════════════════════════════════════════════════════════════════════
// SHARED BUILDING BLOCKS
// ═══════════════════════════════════════════════════════════════════════════════

/// Role, listener situation, pitch geometry, and output contract shared by every style
const BASE_CONTEXT: &str = r#"# ROLE
You are a live K League football commentator.
Your listeners are visually impaired fans, radio listeners, and newcomers to football.
Write exactly ONE sentence of commentary per action.

# LISTENER SITUATION
Listeners cannot see the match. Describe position, direction, and player movement concretely.

# RULES
- No demonstratives like "over here" or "that one". Always say who did what, and where.
- Plain words. Explain jargon when you must use it.
- Mention team names and kit colours now and then, not in every sentence.
- Never read out coordinates or distances in metres. Use natural positional language.
- Mention a player's position occasionally, at meaningful moments
  (CF striker, CAM attacking midfielder, CM central midfielder, CDM defensive midfielder,
  CB centre-back, LB/RB full-back, GK goalkeeper).

# PITCH
- 105m long (x: 0..105) by 68m wide (y: 0..68).
- Home team attacks from x=0 towards x=105. Away team attacks from x=105 towards x=0.
- Halfway line at x=52.5, centre spot at (52.5, 34). Directions do not swap at half-time.

# INPUT
Match info: labeled lines (teams, venue, date, weather, kits, officials).
Actions: CSV with columns
action_id, period_id, time_seconds, result_name, start_x, start_y, end_x, end_y, dx, dy,
type_name, player_name_ko, team_name_ko_short, position_name, main_position
- period_id: 1 first half, 2 second half
- time_seconds: match clock in seconds
- result_name: Successful, Unsuccessful, Goal, ...
- type_name: Pass, Shot, Dribble, Carry, ...

# OUTPUT
Return ONLY a JSON array with one object per input action, in input order:
[
  {
    "actionId": "action id",
    "timeSeconds": "match clock in seconds",
    "tone": "DEFAULT|EXCITED|ANGRY|SAD|CALM|QUESTION|EMPHASIS",
    "description": "commentary sentence"
  }
]
The array length MUST equal the number of input actions.

# TONE
- DEFAULT: ordinary play
- EXCITED: goals, shots, chances
- ANGRY: fouls, cards
- SAD: mistakes, conceded goals
- CALM: safe build-up
- QUESTION: unclear situations
- EMPHASIS: key moments"#;

// ═══════════════════════════════════════════════════════════════════════════════
// STYLES
// ═══════════════════════════════════════════════════════════════════════════════

const CASTER_STYLE: &str = r#"# STYLE: CASTER
Polite broadcast register. Dynamic, fast tempo, rich emotion. Build tension."#;

const ANALYST_STYLE: &str = r#"# STYLE: ANALYST
Polite register. Calm and composed. Name positions and distances concretely. Explain the tactics."#;

const FRIEND_STYLE: &str = r#"# STYLE: FRIEND
Casual register, like talking to a friend. Relaxed, easy words, minimal jargon. Use exclamations."#;

/// Persona section for a style
pub fn style_instructions(style: CommentaryStyle) -> &'static str {
    match style {
        CommentaryStyle::Caster => CASTER_STYLE,
        CommentaryStyle::Analyst => ANALYST_STYLE,
        CommentaryStyle::Friend => FRIEND_STYLE,
    }
}

/// Full system prompt for a style
pub fn system_prompt(style: CommentaryStyle) -> String {
    format!("{}\n\n{}\n", BASE_CONTEXT, style_instructions(style))
}

/// User prompt: match block, action table, then the exact expected count.
pub fn user_prompt(context: &MatchContext, events: &[ActionEvent]) -> String {
    let count = events.len();
    format!(
        "# Match\n{}\n\n# Actions (CSV)\n{}\n\n\
         **IMPORTANT: write commentary for ALL {count} actions above, with no omissions.**\n\
         One sentence per action; return a JSON array of exactly {count} objects.\n",
        render_context(context),
        render_actions(events),
    )
}

/// Build the request prompt for one batch.
pub fn assemble(style: CommentaryStyle, context: &MatchContext, events: &[ActionEvent]) -> Prompt {
    Prompt {
        system: system_prompt(style),
        user: user_prompt(context, events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn events(n: usize) -> Vec<ActionEvent> {
        (0..n)
            .map(|i| serde_json::from_value(json!({"actionId": i, "typeName": "Pass"})).unwrap())
            .collect()
    }

    #[test]
    fn test_each_style_embeds_only_its_own_text() {
        for style in CommentaryStyle::ALL {
            let prompt = assemble(style, &MatchContext::default(), &events(2));
            assert!(prompt.system.contains(style_instructions(style)));
            for other in CommentaryStyle::ALL.into_iter().filter(|s| *s != style) {
                assert!(
                    !prompt.system.contains(style_instructions(other)),
                    "{} prompt leaked {} text",
                    style,
                    other
                );
            }
        }
    }

    #[test]
    fn test_style_texts_are_distinct() {
        assert_ne!(CASTER_STYLE, ANALYST_STYLE);
        assert_ne!(ANALYST_STYLE, FRIEND_STYLE);
        assert_ne!(CASTER_STYLE, FRIEND_STYLE);
    }

    #[test]
    fn test_user_prompt_restates_cardinality() {
        let prompt = assemble(CommentaryStyle::Caster, &MatchContext::default(), &events(7));
        assert!(prompt.user.contains("ALL 7 actions"));
        assert!(prompt.user.contains("exactly 7 objects"));
    }

    #[test]
    fn test_user_prompt_section_order() {
        let prompt = assemble(CommentaryStyle::Analyst, &MatchContext::default(), &events(1));
        let match_at = prompt.user.find("# Match").unwrap();
        let actions_at = prompt.user.find("# Actions (CSV)").unwrap();
        let count_at = prompt.user.find("IMPORTANT").unwrap();
        assert!(match_at < actions_at && actions_at < count_at);
        assert!(prompt.user.contains("action_id,period_id"));
    }
}
