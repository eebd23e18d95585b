//! Helpers for reading uniform values from a `serde_json::Value`.
//!
//! Numbers become `Int` when they are integers that fit in `i32` and
//! `Float` otherwise. Numeric arrays become `Vec`; arrays of numeric arrays
//! are flattened column by column into `Mat`. Strings starting with `#` are
//! colors; any other string names a texture.

use serde_json::{Map, Value};

use crate::uniforms::{UniformValue, Uniforms};

impl UniformValue {
    /// Converts one JSON value. Returns `None` for null, objects, mixed or
    /// empty arrays.
    pub fn from_json(value: &Value) -> Option<UniformValue> {
        match value {
            Value::Bool(b) => Some(UniformValue::Bool(*b)),
            Value::Number(n) => Some(
                match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                    Some(i) => UniformValue::Int(i),
                    None => UniformValue::Float(n.as_f64()? as f32),
                },
            ),
            Value::String(s) if s.starts_with('#') => Some(UniformValue::ColorHex(s.clone())),
            Value::String(s) => Some(UniformValue::TextureRef(s.clone())),
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) if items.iter().all(Value::is_array) => {
                let columns: Option<Vec<Vec<f32>>> = items.iter().map(float_array).collect();
                let columns = columns?;
                let n = columns.len();
                columns
                    .iter()
                    .all(|c| c.len() == n)
                    .then(|| UniformValue::Mat(columns.concat()))
            }
            Value::Array(_) => float_array(value).map(UniformValue::Vec),
            Value::Null | Value::Object(_) => None,
        }
    }
}

fn float_array(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

/// Converts a JSON object into a uniform map.
///
/// # Errors
///
/// Returns a message naming the first entry that cannot be converted, or
/// stating that `value` is not an object.
pub fn uniforms_from_json(value: &Value) -> Result<Uniforms, String> {
    let object: &Map<String, Value> = value
        .as_object()
        .ok_or_else(|| "uniforms must be a JSON object".to_string())?;
    object
        .iter()
        .map(|(name, v)| {
            UniformValue::from_json(v)
                .map(|u| (name.clone(), u))
                .ok_or_else(|| format!("unsupported value for uniform '{name}': {v}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integers_become_int() {
        assert_eq!(UniformValue::from_json(&json!(3)), Some(UniformValue::Int(3)));
    }

    #[test]
    fn fractions_become_float() {
        assert_eq!(
            UniformValue::from_json(&json!(0.5)),
            Some(UniformValue::Float(0.5))
        );
    }

    #[test]
    fn out_of_range_integer_becomes_float() {
        assert_eq!(
            UniformValue::from_json(&json!(5_000_000_000i64)),
            Some(UniformValue::Float(5_000_000_000.0))
        );
    }

    #[test]
    fn bools_stay_bools() {
        assert_eq!(
            UniformValue::from_json(&json!(true)),
            Some(UniformValue::Bool(true))
        );
    }

    #[test]
    fn hash_strings_are_colors_and_others_textures() {
        assert_eq!(
            UniformValue::from_json(&json!("#ff0000")),
            Some(UniformValue::ColorHex("#ff0000".into()))
        );
        assert_eq!(
            UniformValue::from_json(&json!("logo")),
            Some(UniformValue::TextureRef("logo".into()))
        );
    }

    #[test]
    fn numeric_arrays_become_vectors() {
        assert_eq!(
            UniformValue::from_json(&json!([1, 2.5, 3])),
            Some(UniformValue::Vec(vec![1.0, 2.5, 3.0]))
        );
    }

    #[test]
    fn nested_square_arrays_become_matrices() {
        assert_eq!(
            UniformValue::from_json(&json!([[1, 0], [0, 1]])),
            Some(UniformValue::Mat(vec![1.0, 0.0, 0.0, 1.0]))
        );
        assert_eq!(UniformValue::from_json(&json!([[1, 0], [0]])), None);
    }

    #[test]
    fn unsupported_values_are_none() {
        assert_eq!(UniformValue::from_json(&json!(null)), None);
        assert_eq!(UniformValue::from_json(&json!({"a": 1})), None);
        assert_eq!(UniformValue::from_json(&json!([])), None);
        assert_eq!(UniformValue::from_json(&json!([1, "x"])), None);
    }

    #[test]
    fn uniforms_from_json_reads_every_entry() {
        let uniforms = uniforms_from_json(&json!({"iTime": 1.5, "iColor": "#00ff00"})).unwrap();
        assert_eq!(uniforms.len(), 2);
        assert_eq!(uniforms["iTime"], UniformValue::Float(1.5));
    }

    #[test]
    fn uniforms_from_json_names_bad_entry() {
        let err = uniforms_from_json(&json!({"bad": null})).unwrap_err();
        assert!(err.contains("'bad'"), "got: {err}");
    }

    #[test]
    fn uniforms_from_json_requires_object() {
        assert!(uniforms_from_json(&json!([1, 2])).is_err());
    }
}
