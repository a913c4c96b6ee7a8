//! Loosely-typed input for generic field edits.
//!
//! Inputs are coerced, never rejected: a number field given text that does
//! not parse becomes unset, and a text field given a number stores its
//! decimal rendering.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    /// `None` is an unset number (an emptied input box).
    Number(Option<f64>),
}

impl FieldValue {
    /// Interpret raw numeric input the way a number box does: blank is
    /// unset, anything else is parsed.
    pub fn from_input(raw: &str) -> Self {
        Self::Number(parse_f64(raw))
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Number(Some(n)) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            Self::Number(Some(n)) => n.to_string(),
            Self::Number(None) => String::new(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Text(s) => parse_f64(s),
            Self::Number(n) => n.filter(|n| n.is_finite()),
        }
    }

    /// Truncating integer view; out-of-range values saturate.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|n| n.trunc() as i64)
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_f64().map(|n| n.trunc() as i32)
    }
}

fn parse_f64(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Number(Some(f64::from(value)))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(Some(value))
    }
}

impl From<Option<i32>> for FieldValue {
    fn from(value: Option<i32>) -> Self {
        Self::Number(value.map(f64::from))
    }
}
