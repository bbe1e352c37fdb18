//! SQL text helpers and key values

pub use rusqlite::types::Value;

/// A value usable as a relation key
///
/// Relations join on integer or text columns only, so reals, blobs and
/// NULL never produce a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Integer(i64),
    Text(String),
}

impl Key {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Integer(i) => Some(Key::Integer(*i)),
            Value::Text(s) => Some(Key::Text(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Key::Integer(i) => Value::Integer(*i),
            Key::Text(s) => Value::Text(s.clone()),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Integer(value)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `?, ?, ?`
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
