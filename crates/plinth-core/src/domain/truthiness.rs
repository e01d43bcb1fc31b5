//! The single truthiness rule shared by conditions and template blocks.
//!
//! | Value                    | Truthy? |
//! |--------------------------|---------|
//! | missing (undefined)      | no      |
//! | `null`                   | no      |
//! | `false`                  | no      |
//! | `""`                     | no      |
//! | `[]`                     | no      |
//! | `0`, `0.0`               | **yes** |
//! | `{}`                     | yes     |
//! | anything else            | yes     |
//!
//! Numeric zero is not special-cased. Blueprints in the wild rely on
//! `{{#if module.parameters.port}}` being true for `port = 0`.

use serde_json::Value;

/// Truthiness of a present value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Number(_) | Value::Object(_) => true,
    }
}

/// Truthiness of a possibly-missing value; missing is falsy.
pub fn is_truthy_opt(value: Option<&Value>) -> bool {
    value.is_some_and(is_truthy)
}

/// Truthiness of rendered template output.
///
/// Rendered text loses its type, so the literal spellings of the falsy
/// values are read back as those values.
pub fn is_truthy_text(rendered: &str) -> bool {
    !matches!(rendered.trim(), "" | "false" | "undefined" | "null" | "[]")
}
