use serde_json::Value as JsonValue;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single cell value in a table.
///
/// Loaded cells are always `Text`; callers may store `Number` explicitly.
/// Equality and hashing are exact and type-sensitive, so `Text("1")` and
/// `Number(1.0)` are different group keys.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn empty() -> Self {
        Value::Text(String::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// String form used for lexicographic comparison and export.
    /// `Null` reads as the empty string.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Null => Cow::Borrowed(""),
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            Value::Number(n) => Cow::Owned(format_number(*n)),
        }
    }

    /// The value as a number when it is one, or when its text is a complete
    /// numeric literal.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(*n),
            Value::Text(s) => parse_numeric(s),
        }
    }

    /// Whether the value looks numeric, the test that decides quoting in CSV output.
    pub fn is_numeric(&self) -> bool {
        self.as_number().is_some()
    }

    /// Numeric sort key: numbers as is, text by its leading numeric prefix,
    /// anything else as zero.
    pub fn sort_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Number(n) => *n,
            Value::Text(s) => leading_number(s),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Number(n) => number_to_json(*n),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Text(s) => s.hash(state),
            Value::Number(n) => n.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, ""),
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::empty()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Text(b.to_string()),
            JsonValue::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .unwrap_or_else(|| Value::Text(n.to_string())),
            JsonValue::String(s) => Value::Text(s.clone()),
            // Nested structures are kept as their JSON text
            JsonValue::Array(_) | JsonValue::Object(_) => Value::Text(json.to_string()),
        }
    }
}

/// Compare a cell against a filter operand.
///
/// When either side is a `Number` and the other side reads as a number the
/// comparison is numeric; otherwise both sides compare as strings.
pub fn compare_values(cell: &Value, operand: &Value) -> Ordering {
    let numeric_side =
        matches!(cell, Value::Number(_)) || matches!(operand, Value::Number(_));
    if numeric_side {
        if let (Some(a), Some(b)) = (cell.as_number(), operand.as_number()) {
            return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        }
    }
    cell.as_text().as_ref().cmp(operand.as_text().as_ref())
}

/// Lexicographic ordering used by `ASC`/`DESC` sorting
pub fn compare_lexicographic(a: &Value, b: &Value) -> Ordering {
    a.as_text().as_ref().cmp(b.as_text().as_ref())
}

/// Numeric ordering used by `ASC_NUM`/`DESC_NUM` sorting
pub fn compare_numeric(a: &Value, b: &Value) -> Ordering {
    a.sort_number().total_cmp(&b.sort_number())
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn number_to_json(n: f64) -> JsonValue {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

/// Length of the numeric literal at the start of `s`: optional sign, digits
/// with an optional fraction, then an optional exponent.
fn numeric_prefix_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if digits > 0 || j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }

    if digits == 0 {
        return 0;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }

    i
}

/// Parse a complete numeric literal, allowing surrounding whitespace.
/// `inf`, `nan` and hex forms are not numeric here.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    let len = numeric_prefix_len(trimmed);
    if len != trimmed.len() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn leading_number(s: &str) -> f64 {
    let trimmed = s.trim_start();
    let len = numeric_prefix_len(trimmed);
    if len == 0 {
        return 0.0;
    }
    trimmed[..len].parse::<f64>().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_detection() {
        assert_eq!(parse_numeric("42"), Some(42.0));
        assert_eq!(parse_numeric(" -1.5 "), Some(-1.5));
        assert_eq!(parse_numeric(".5"), Some(0.5));
        assert_eq!(parse_numeric("1e3"), Some(1000.0));
        assert_eq!(parse_numeric("12abc"), None);
        assert_eq!(parse_numeric("inf"), None);
        assert_eq!(parse_numeric("NaN"), None);
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("."), None);
    }

    #[test]
    fn test_sort_number_uses_leading_prefix() {
        assert_eq!(Value::text("12abc").sort_number(), 12.0);
        assert_eq!(Value::text("abc").sort_number(), 0.0);
        assert_eq!(Value::Null.sort_number(), 0.0);
        assert_eq!(Value::text("  7.25kg").sort_number(), 7.25);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::text("abc").to_string(), "abc");
    }

    #[test]
    fn test_equality_is_type_sensitive() {
        assert_ne!(Value::text("1"), Value::Number(1.0));
        assert_eq!(Value::Number(1.0), Value::Number(1.0));
        assert_ne!(Value::Null, Value::empty());
    }

    #[test]
    fn test_compare_values_coercion() {
        // Text against text is lexicographic
        assert_eq!(
            compare_values(&Value::text("9"), &Value::text("10")),
            Ordering::Greater
        );
        // A numeric operand switches to numeric comparison
        assert_eq!(
            compare_values(&Value::text("9"), &Value::Number(10.0)),
            Ordering::Less
        );
        // Non-numeric text against a number falls back to strings
        assert_eq!(
            compare_values(&Value::text("abc"), &Value::Number(10.0)),
            Ordering::Greater
        );
        // Null reads as the empty string
        assert_eq!(
            compare_values(&Value::Null, &Value::text("")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(Value::Number(4.0).to_json(), serde_json::json!(4));
        assert_eq!(Value::Number(4.5).to_json(), serde_json::json!(4.5));
        assert_eq!(
            Value::from(&serde_json::json!("x")),
            Value::text("x")
        );
        assert_eq!(Value::from(&serde_json::json!(null)), Value::Null);
    }
}
