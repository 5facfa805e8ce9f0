// Type validators for bound parameters

use aqua_core::{ValidationError, ValidatorFn, validator};
use serde_json::{Map, Number, Value};

/// Field name used for errors about the value itself
pub const ROOT: &str = "root";

/// JSON type name of a value, as used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_mismatch(expected: &str, value: &Value) -> Vec<ValidationError> {
    let error = ValidationError::new(
        ROOT,
        format!("Expected {}, but got {}", expected, type_name(value)),
    );
    // A missing value is reported without echoing it back
    match value {
        Value::Null => vec![error],
        _ => vec![error.with_value(value.clone())],
    }
}

/// Accepts strings only.
pub fn string() -> ValidatorFn {
    validator(|value| match value {
        Value::String(_) => Ok(value.clone()),
        _ => Err(type_mismatch("string", value)),
    })
}

/// Accepts numbers, or strings that parse to a finite number.
///
/// Parsed strings with no fractional part become integers, so `"42"`
/// binds as `42` and `"42.5"` as `42.5`.
pub fn number() -> ValidatorFn {
    validator(|value| match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => parse_number(s).ok_or_else(|| type_mismatch("number", value)),
        _ => Err(type_mismatch("number", value)),
    })
}

fn parse_number(s: &str) -> Option<Value> {
    let parsed: f64 = s.trim().parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
        return Some(Value::Number(Number::from(parsed as i64)));
    }
    Number::from_f64(parsed).map(Value::Number)
}

/// Accepts booleans, or the strings `"true"` / `"false"` in any case.
pub fn boolean() -> ValidatorFn {
    validator(|value| match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        _ => Err(type_mismatch("boolean", value)),
    })
}

/// Validates a mapping field by field.
///
/// Errors from a field validator are reported under the field's key
/// (`key`, or `key.nested` for errors from nested validators). The result
/// holds the validated value of every schema key present in the input.
pub fn object<I, K>(schema: I) -> ValidatorFn
where
    I: IntoIterator<Item = (K, ValidatorFn)>,
    K: Into<String>,
{
    let schema: Vec<(String, ValidatorFn)> = schema
        .into_iter()
        .map(|(key, validate)| (key.into(), validate))
        .collect();

    validator(move |value| {
        let Value::Object(input) = value else {
            return Err(vec![
                ValidationError::new(ROOT, "Expected object").with_value(value.clone()),
            ]);
        };

        let mut output = Map::new();
        let mut errors = Vec::new();

        for (key, validate) in &schema {
            let field = input.get(key).unwrap_or(&Value::Null);
            match validate(field) {
                Ok(data) => {
                    if input.contains_key(key) || !data.is_null() {
                        output.insert(key.clone(), data);
                    }
                }
                Err(field_errors) => errors.extend(
                    field_errors
                        .into_iter()
                        .map(|e| {
                            let name = nested_field(key, &e.field);
                            e.with_field(name)
                        }),
                ),
            }
        }

        if errors.is_empty() {
            Ok(Value::Object(output))
        } else {
            Err(errors)
        }
    })
}

fn nested_field(key: &str, inner: &str) -> String {
    if inner == ROOT {
        key.to_string()
    } else if inner.starts_with('[') {
        format!("{}{}", key, inner)
    } else {
        format!("{}.{}", key, inner)
    }
}

/// Validates every element, reporting errors as `[index]` or
/// `[index].nested`.
pub fn array(item: ValidatorFn) -> ValidatorFn {
    validator(move |value| {
        let Value::Array(items) = value else {
            return Err(vec![
                ValidationError::new(ROOT, "Expected array").with_value(value.clone()),
            ]);
        };

        let mut output = Vec::with_capacity(items.len());
        let mut errors = Vec::new();

        for (index, element) in items.iter().enumerate() {
            match item(element) {
                Ok(data) => output.push(data),
                Err(item_errors) => errors.extend(item_errors.into_iter().map(|e| {
                    let name = if e.field == ROOT {
                        format!("[{}]", index)
                    } else {
                        format!("[{}].{}", index, e.field)
                    };
                    e.with_field(name)
                })),
            }
        }

        if errors.is_empty() {
            Ok(Value::Array(output))
        } else {
            Err(errors)
        }
    })
}

/// Missing (`null`) values pass with no data; anything else goes through
/// `inner`.
pub fn optional(inner: ValidatorFn) -> ValidatorFn {
    validator(move |value| match value {
        Value::Null => Ok(Value::Null),
        _ => inner(value),
    })
}

/// Decodes JSON carried in a string before validating it.
///
/// Query and path parameters always arrive as strings; this lets a
/// parameter such as `?filter={"active":true}` bind to an object. Strings
/// that are not JSON are validated as they are.
pub fn json_string(inner: ValidatorFn) -> ValidatorFn {
    validator(move |value| match value {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(decoded) => inner(&decoded),
            Err(_) => inner(value),
        },
        _ => inner(value),
    })
}
