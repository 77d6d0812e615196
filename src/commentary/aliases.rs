//! Field-name alias tables.
//!
//! Upstream callers send either camelCase or snake_case keys. Each table is an
//! ordered list of canonical names with the source keys accepted for them,
//! checked in order. A record is resolved against a table once, then read by
//! canonical name.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub canonical: &'static str,
    pub sources: &'static [&'static str],
}

const fn field(canonical: &'static str, sources: &'static [&'static str]) -> Field {
    Field { canonical, sources }
}

/// Action columns, in CSV order.
pub const ACTION_FIELDS: &[Field] = &[
    field("action_id", &["actionId", "action_id"]),
    field("period_id", &["periodId", "period_id"]),
    field("time_seconds", &["timeSeconds", "time_seconds"]),
    field("result_name", &["resultName", "result_name"]),
    field("start_x", &["startX", "start_x"]),
    field("start_y", &["startY", "start_y"]),
    field("end_x", &["endX", "end_x"]),
    field("end_y", &["endY", "end_y"]),
    field("dx", &["dx"]),
    field("dy", &["dy"]),
    field("type_name", &["typeName", "type_name"]),
    field("player_name_ko", &["playerNameKo", "player_name_ko"]),
    field("team_name_ko_short", &["teamNameKoShort", "team_name_ko_short"]),
    field("position_name", &["positionName", "position_name"]),
    field("main_position", &["mainPosition", "main_position"]),
];

/// Match metadata fields.
pub const MATCH_FIELDS: &[Field] = &[
    field("gameId", &["gameId", "game_id"]),
    field("homeTeamNameKo", &["homeTeamNameKo", "home_team_name_ko"]),
    field("awayTeamNameKo", &["awayTeamNameKo", "away_team_name_ko"]),
    field("homeTeamNameKoShort", &["homeTeamNameKoShort", "home_team_name_ko_short"]),
    field("awayTeamNameKoShort", &["awayTeamNameKoShort", "away_team_name_ko_short"]),
    field("venue", &["venue"]),
    field("gameDate", &["gameDate", "game_date"]),
    field("weather", &["weather"]),
    field("temperature", &["temperature"]),
    field("homeTeamUniform", &["homeTeamUniform", "home_team_uniform"]),
    field("awayTeamUniform", &["awayTeamUniform", "away_team_uniform"]),
    field("referee", &["referee"]),
    field("assistantReferees", &["assistantReferees", "assistant_referees"]),
    field("fourthOfficial", &["fourthOfficial", "fourth_official"]),
    field("varReferees", &["varReferees", "var_referees"]),
];

/// How a canonical field picks among its source keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// First source key present in the record wins, even if its value is null.
    FirstPresent,
    /// First source key with a truthy value wins.
    FirstTruthy,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Absent,
    Null,
    Value(&'a Value),
}

impl<'a> Lookup<'a> {
    pub fn value(&self) -> Option<&'a Value> {
        match self {
            Lookup::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// A record resolved against one alias table.
#[derive(Debug, Clone)]
pub struct ResolvedRecord<'a> {
    table: &'static [Field],
    values: Vec<Lookup<'a>>,
}

impl<'a> ResolvedRecord<'a> {
    pub fn resolve(
        record: &'a Map<String, Value>,
        table: &'static [Field],
        resolution: Resolution,
    ) -> Self {
        let values = table
            .iter()
            .map(|field| resolve_field(record, field, resolution))
            .collect();
        Self { table, values }
    }

    /// Lookup by canonical name. Names outside the table are `Absent`.
    pub fn lookup(&self, canonical: &str) -> Lookup<'a> {
        self.table
            .iter()
            .position(|f| f.canonical == canonical)
            .map(|idx| self.values[idx])
            .unwrap_or(Lookup::Absent)
    }

    /// Resolved values in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, Lookup<'a>)> + '_ {
        self.table
            .iter()
            .zip(self.values.iter())
            .map(|(f, v)| (f.canonical, *v))
    }

    /// Non-empty text for a canonical field.
    pub fn text(&self, canonical: &str) -> Option<String> {
        self.lookup(canonical)
            .value()
            .map(value_text)
            .filter(|s| !s.is_empty())
    }
}

fn resolve_field<'a>(
    record: &'a Map<String, Value>,
    field: &Field,
    resolution: Resolution,
) -> Lookup<'a> {
    for key in field.sources {
        let Some(value) = record.get(*key) else {
            continue;
        };
        match resolution {
            Resolution::FirstPresent => {
                return if value.is_null() {
                    Lookup::Null
                } else {
                    Lookup::Value(value)
                };
            }
            Resolution::FirstTruthy if is_truthy(value) => return Lookup::Value(value),
            Resolution::FirstTruthy => {}
        }
    }
    Lookup::Absent
}

/// Null, `false`, zero, and empty strings/arrays/objects are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Plain-text form of a JSON value: strings verbatim, everything else as compact JSON.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
