use indexmap::IndexMap;
use std::borrow::Cow;

/// Ordered attribute map. Insertion order is the serialization order.
pub type Attributes = IndexMap<String, AttrValue>;

/// An attribute value.
///
/// Numbers written by the engine are kept as `f64` so repeated edits never round-trip through
/// text; they are only turned into text at serialization time.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
}

impl AttrValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            Self::Number(_) => None,
        }
    }

    /// Canonical textual form.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(s) => Cow::Borrowed(s.as_str()),
            Self::Number(v) => Cow::Owned(format_number(*v)),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// Formats a number the way browsers stringify attribute numbers (`10`, not `10.0`).
pub fn format_number(mut v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    if v == -0.0 {
        v = 0.0;
    }
    let mut buf = ryu_js::Buffer::new();
    buf.format_finite(v).to_string()
}
