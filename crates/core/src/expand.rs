// Recursive base64/JSON expansion of payload trees

use crate::value::Value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Maximum number of decode layers applied to a single string
pub const MAX_EXPAND_DEPTH: usize = 10;

/// Best-effort normalizer for base64-encoded payloads.
///
/// Strings that decode to JSON are replaced by the (recursively expanded)
/// JSON value; strings that decode to further base64 are decoded again.
/// Anything that does not decode cleanly is left as it was, so `expand`
/// never fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expander {
    max_depth: usize,
}

impl Default for Expander {
    fn default() -> Self {
        Self {
            max_depth: MAX_EXPAND_DEPTH,
        }
    }
}

impl Expander {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the decode layer limit
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Expand every string in `value`, returning a new tree
    pub fn expand(&self, value: &Value) -> Value {
        self.expand_value(value, 0)
    }

    fn expand_value(&self, value: &Value, depth: usize) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.expand_value(item, depth))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, item)| (key.clone(), self.expand_value(item, depth)))
                    .collect(),
            ),
            Value::String(s) => self.expand_string(s, depth),
            other => other.clone(),
        }
    }

    fn expand_string(&self, s: &str, depth: usize) -> Value {
        if depth >= self.max_depth {
            tracing::debug!(depth, "base64 expansion depth limit reached");
            return Value::String(s.to_string());
        }

        // binary payloads are never partially expanded
        let Some(text) = decode_text(s) else {
            return Value::String(s.to_string());
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => self.expand_value(&parsed, depth + 1),
            Err(_) if is_base64_candidate(&text) => self.expand_string(&text, depth + 1),
            Err(_) => Value::String(text),
        }
    }
}

/// Decode strict standard base64 into UTF-8 text
fn decode_text(s: &str) -> Option<String> {
    if s.is_empty() {
        return None;
    }
    let bytes = STANDARD.decode(s).ok()?;
    String::from_utf8(bytes).ok()
}

/// Cheap syntactic check for standard padded base64
fn is_base64_candidate(s: &str) -> bool {
    if s.is_empty() || s.len() % 4 != 0 {
        return false;
    }
    let body = s.trim_end_matches('=');
    if s.len() - body.len() > 2 {
        return false;
    }
    body.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}
