//! Property-name fallback chains.
//!
//! Source files name the same attribute differently (`DESA`, `NAMOBJ`,
//! `NAMA_DESA`, ...). A `KeyChain` lists candidate keys in priority order and
//! returns the first one holding a usable value.

use geojson::{Feature, JsonObject, JsonValue};

/// Shown wherever a value is missing, null or empty
pub const PLACEHOLDER: &str = "-";

/// Ordered candidate property keys, first match wins
#[derive(Clone, Copy, Debug)]
pub struct KeyChain(pub &'static [&'static str]);

impl KeyChain {
    /// First present value. Null, empty strings, zero and `false` count as absent.
    pub fn find<'a>(&self, props: &'a JsonObject) -> Option<&'a JsonValue> {
        self.0
            .iter()
            .filter_map(|key| props.get(*key))
            .find(|value| is_present(value))
    }

    /// First present value rendered as text
    pub fn text(&self, props: &JsonObject) -> Option<String> {
        self.find(props).map(display_value)
    }

    /// First present value as text, or the placeholder
    pub fn text_or_placeholder(&self, props: &JsonObject) -> String {
        self.text(props).unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    /// First present value as a number (numeric strings included)
    pub fn number(&self, props: &JsonObject) -> Option<f64> {
        match self.find(props)? {
            JsonValue::Number(n) => n.as_f64(),
            JsonValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn is_present(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => true,
    }
}

/// Render any property value for display: strings bare, numbers/bools as
/// written, null as the placeholder, arrays/objects as JSON
pub fn display_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => PLACEHOLDER.to_string(),
        JsonValue::String(s) if s.is_empty() => PLACEHOLDER.to_string(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| PLACEHOLDER.to_string()),
    }
}

/// Feature properties, or an empty map for features without any
pub fn properties(feature: &Feature) -> &JsonObject {
    static EMPTY: std::sync::OnceLock<JsonObject> = std::sync::OnceLock::new();
    feature
        .properties
        .as_ref()
        .unwrap_or_else(|| EMPTY.get_or_init(JsonObject::new))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VILLAGE: KeyChain = KeyChain(&["DESA", "NAMOBJ", "NAMA_DESA", "KELURAHAN", "KAMPUNG"]);

    fn props(value: JsonValue) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let p = props(json!({"NAMOBJ": "Remu", "KAMPUNG": "Klasaman"}));
        assert_eq!(VILLAGE.text(&p).as_deref(), Some("Remu"));
    }

    #[test]
    fn test_empty_values_fall_through() {
        let p = props(json!({"DESA": "", "NAMOBJ": null, "NAMA_DESA": "Malaingkedi"}));
        assert_eq!(VILLAGE.text(&p).as_deref(), Some("Malaingkedi"));
    }

    #[test]
    fn test_zero_and_false_fall_through() {
        let p = props(json!({"DESA": 0, "NAMOBJ": false, "NAMA_DESA": "Remu"}));
        assert_eq!(VILLAGE.text(&p).as_deref(), Some("Remu"));
        assert_eq!(VILLAGE.text_or_placeholder(&props(json!({"DESA": 0}))), PLACEHOLDER);
        // The string "0" is a real value
        assert_eq!(VILLAGE.text(&props(json!({"DESA": "0"}))).as_deref(), Some("0"));
    }

    #[test]
    fn test_missing_uses_placeholder() {
        let p = props(json!({"OTHER": 1}));
        assert_eq!(VILLAGE.text_or_placeholder(&p), PLACEHOLDER);
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        let chain = KeyChain(&["ELEV", "HEIGHT"]);
        assert_eq!(chain.number(&props(json!({"ELEV": "250"}))), Some(250.0));
        assert_eq!(chain.number(&props(json!({"HEIGHT": 500}))), Some(500.0));
    }

    #[test]
    fn test_display_value_stringifies_nested() {
        assert_eq!(display_value(&json!([1, 2])), "[1,2]");
        assert_eq!(display_value(&json!({"a": true})), "{\"a\":true}");
        assert_eq!(display_value(&json!(null)), PLACEHOLDER);
        assert_eq!(display_value(&json!(12.5)), "12.5");
    }
}
