use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical month buckets, in calendar order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonthCode {
    Jan,
    Fev,
    Mar,
    Abr,
    Mai,
    Jun,
    Jul,
    Ago,
    Set,
    Out,
    Nov,
    Dez,
}

impl MonthCode {
    pub const ALL: [MonthCode; 12] = [
        MonthCode::Jan,
        MonthCode::Fev,
        MonthCode::Mar,
        MonthCode::Abr,
        MonthCode::Mai,
        MonthCode::Jun,
        MonthCode::Jul,
        MonthCode::Ago,
        MonthCode::Set,
        MonthCode::Out,
        MonthCode::Nov,
        MonthCode::Dez,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MonthCode::Jan => "JAN",
            MonthCode::Fev => "FEV",
            MonthCode::Mar => "MAR",
            MonthCode::Abr => "ABR",
            MonthCode::Mai => "MAI",
            MonthCode::Jun => "JUN",
            MonthCode::Jul => "JUL",
            MonthCode::Ago => "AGO",
            MonthCode::Set => "SET",
            MonthCode::Out => "OUT",
            MonthCode::Nov => "NOV",
            MonthCode::Dez => "DEZ",
        }
    }

    /// Looks up an already-normalized code. Use [`normalize_month`] first for raw labels.
    pub fn from_code(code: &str) -> Option<MonthCode> {
        MonthCode::ALL.into_iter().find(|m| m.as_str() == code)
    }

    /// 0-based position in the calendar year.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for MonthCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the numeric value, or 0 when the value is absent or NaN.
pub fn coerce_number(value: Option<f64>) -> f64 {
    match value {
        Some(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}

/// Reads a loosely-typed JSON value as a number.
///
/// - Numbers pass through.
/// - Strings are trimmed and parsed; empty or unparseable strings are `None`.
/// - Anything else (null, bool, arrays, objects) is `None`.
///
/// Only finite values survive, so spellings like `"inf"` or `"NaN"` count as absent.
pub fn coerce_json_number(value: &serde_json::Value) -> Option<f64> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Trims, keeps the first three characters and upper-cases them.
pub fn normalize_month(label: &str) -> String {
    label.trim().chars().take(3).collect::<String>().to_uppercase()
}

/// `actual / target * 100`, defined as 0 when the target is 0.
pub fn percent_of(actual: f64, target: f64) -> f64 {
    if target != 0.0 {
        (actual / target) * 100.0
    } else {
        0.0
    }
}
