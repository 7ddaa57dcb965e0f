//! Lenient extraction of structured data from free-form model output
//!
//! Models wrap their JSON in prose more often than not. The scanner below
//! pulls out the first balanced object; strict serde deserialization of
//! that slice is the second, hardening pass. Both steps are fallible and
//! return `Option` — nothing in here throws.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

use tally_types::TransactionType;

/// Find the first balanced JSON object in `text`, tolerating surrounding
/// prose. String literals and escapes are honored, so braces inside quoted
/// values do not confuse the depth counter.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Raw shape of the analysis JSON, before validation against candidates
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    pub amount: f64,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default, rename = "type")]
    pub transaction_type: Option<TransactionType>,
    #[serde(default)]
    pub budget_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Strictly deserialize the extracted object
pub fn parse_analysis(json: &str) -> Option<RawAnalysis> {
    serde_json::from_str(json).ok()
}

/// Coerce a model-supplied date to a concrete one.
///
/// Accepts `YYYY-MM-DD` or RFC 3339; anything else (including absence)
/// falls back to `today`.
pub fn coerce_date(raw: Option<&str>, today: NaiveDate) -> NaiveDate {
    let Some(raw) = raw else { return today };
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date;
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return datetime.date_naive();
    }
    today
}

/// Clamp a model-supplied confidence to [0, 1], defaulting to 0.8
pub fn clamp_confidence(raw: Option<f64>) -> f64 {
    raw.unwrap_or(0.8).clamp(0.0, 1.0)
}
