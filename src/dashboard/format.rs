use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display format for a single graph field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueFormat {
    /// `3 utterances`, `1 utterance`.
    Plural { unit: String },
    /// Raw value followed by a fixed suffix, e.g. `12 s`.
    Suffix { suffix: String },
    /// `40%`.
    Percent,
    /// Calendar date rendered as `M/D/YYYY`.
    LocaleDate,
}

impl ValueFormat {
    pub fn plural(unit: &str) -> Self {
        Self::Plural {
            unit: unit.to_string(),
        }
    }

    pub fn suffix(suffix: &str) -> Self {
        Self::Suffix {
            suffix: suffix.to_string(),
        }
    }

    pub fn apply(&self, value: &Value) -> String {
        let raw = display_raw(value);
        match self {
            ValueFormat::Plural { unit } => {
                let one = value.as_f64().map(|v| v == 1.0).unwrap_or(false);
                if one {
                    format!("{raw} {unit}")
                } else {
                    format!("{raw} {unit}s")
                }
            }
            ValueFormat::Suffix { suffix } => format!("{raw}{suffix}"),
            ValueFormat::Percent => format!("{raw}%"),
            ValueFormat::LocaleDate => parse_date(value)
                .map(|d| d.format("%-m/%-d/%Y").to_string())
                .unwrap_or(raw),
        }
    }
}

pub(crate) fn display_raw(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                n.as_f64().map(|f| f.to_string()).unwrap_or_default()
            }
        }
        other => other.to_string(),
    }
}

fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.date_naive());
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.date_naive()),
        _ => None,
    }
}
