//! The fixed set of helper functions callable from template expressions.

use crate::template::error::TemplateError;
use crate::template::value::TemplateValue;
use base64::Engine as _;

/// Dispatch a helper function call by name. `source`/`offset` are only used
/// to anchor any error raised.
pub fn call(
    name: &str,
    args: &[TemplateValue],
    source: &str,
    offset: usize,
) -> Result<TemplateValue, TemplateError> {
    let err = |reason: String| TemplateError::new(source, offset, reason);
    let string_arg = |i: usize| -> Result<String, TemplateError> {
        args.get(i)
            .ok_or_else(|| err(format!("{name}: missing argument {i}")))?
            .as_interpolated_string()
            .map_err(|e| err(format!("{name}: {e}")))
    };

    match name {
        "upper" => Ok(TemplateValue::String(string_arg(0)?.to_uppercase())),
        "lower" => Ok(TemplateValue::String(string_arg(0)?.to_lowercase())),
        "camelCase" => Ok(TemplateValue::String(to_camel_case(&string_arg(0)?))),
        "kebabCase" => Ok(TemplateValue::String(to_kebab_case(&string_arg(0)?))),
        "join" => {
            let TemplateValue::Array(items) = args
                .first()
                .ok_or_else(|| err("join: missing array argument".to_string()))?
            else {
                return Err(err("join: first argument must be an array".to_string()));
            };
            let sep = if args.len() > 1 {
                string_arg(1)?
            } else {
                ",".to_string()
            };
            let parts: Result<Vec<String>, String> =
                items.iter().map(TemplateValue::as_interpolated_string).collect();
            let parts = parts.map_err(|e| err(format!("join: {e}")))?;
            Ok(TemplateValue::String(parts.join(&sep)))
        }
        "split" => {
            let s = string_arg(0)?;
            let sep = string_arg(1)?;
            let parts = if sep.is_empty() {
                vec![s]
            } else {
                s.split(sep.as_str()).map(str::to_string).collect()
            };
            Ok(TemplateValue::Array(
                parts.into_iter().map(TemplateValue::String).collect(),
            ))
        }
        "isEmpty" => {
            let value = args
                .first()
                .ok_or_else(|| err("isEmpty: missing argument".to_string()))?;
            let empty = match value {
                TemplateValue::Null => true,
                TemplateValue::String(s) => s.is_empty(),
                TemplateValue::Array(a) => a.is_empty(),
                TemplateValue::Object(o) => o.is_empty(),
                _ => false,
            };
            Ok(TemplateValue::Bool(empty))
        }
        "slice" => {
            let TemplateValue::Array(items) = args
                .first()
                .ok_or_else(|| err("slice: missing array argument".to_string()))?
            else {
                return Err(err("slice: first argument must be an array".to_string()));
            };
            let start = number_arg(args, 1, 0.0)? as usize;
            let end = match args.get(2) {
                Some(TemplateValue::Number(n)) => (*n as usize).min(items.len()),
                _ => items.len(),
            };
            let start = start.min(items.len());
            Ok(TemplateValue::Array(items[start..end.max(start)].to_vec()))
        }
        "jsonEncode" => {
            let value = args
                .first()
                .ok_or_else(|| err("jsonEncode: missing argument".to_string()))?;
            let json = to_json(value);
            Ok(TemplateValue::String(
                serde_json::to_string(&json).map_err(|e| err(e.to_string()))?,
            ))
        }
        "yamlEncode" => {
            let value = args
                .first()
                .ok_or_else(|| err("yamlEncode: missing argument".to_string()))?;
            let json = to_json(value);
            Ok(TemplateValue::String(
                serde_yaml::to_string(&json).map_err(|e| err(e.to_string()))?,
            ))
        }
        "base64Encode" => Ok(TemplateValue::String(
            base64::engine::general_purpose::STANDARD.encode(string_arg(0)?),
        )),
        "base64Decode" => {
            let decoded = base64::engine::general_purpose::STANDARD
                .decode(string_arg(0)?)
                .map_err(|e| err(format!("base64Decode: {e}")))?;
            Ok(TemplateValue::String(
                String::from_utf8(decoded).map_err(|e| err(format!("base64Decode: {e}")))?,
            ))
        }
        "indent" => {
            let s = string_arg(0)?;
            let n = number_arg(args, 1, 2.0)? as usize;
            let prefix = " ".repeat(n);
            Ok(TemplateValue::String(
                s.lines()
                    .map(|line| format!("{prefix}{line}"))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ))
        }
        "formatDateUTC" => {
            let timestamp = number_arg(args, 0, 0.0)?;
            let format = args
                .get(1)
                .map(TemplateValue::as_interpolated_string)
                .transpose()
                .map_err(|e| err(e))?
                .unwrap_or_else(|| "%Y-%m-%dT%H:%M:%SZ".to_string());
            let dt = chrono::DateTime::from_timestamp(timestamp as i64, 0)
                .ok_or_else(|| err("formatDateUTC: invalid timestamp".to_string()))?;
            Ok(TemplateValue::String(dt.format(&format).to_string()))
        }
        other => Err(err(format!("unknown helper function '{other}'"))),
    }
}

fn number_arg(
    args: &[TemplateValue],
    index: usize,
    default: f64,
) -> Result<f64, TemplateError> {
    match args.get(index) {
        Some(TemplateValue::Number(n)) => Ok(*n),
        None => Ok(default),
        Some(_) => Ok(default),
    }
}

fn to_camel_case(input: &str) -> String {
    let mut result = String::new();
    let mut capitalize_next = false;
    for (i, ch) in input.chars().enumerate() {
        if ch == '-' || ch == '_' || ch == ' ' {
            capitalize_next = true;
        } else if capitalize_next {
            result.extend(ch.to_uppercase());
            capitalize_next = false;
        } else if i == 0 {
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

fn to_kebab_case(input: &str) -> String {
    let mut result = String::new();
    for (i, ch) in input.chars().enumerate() {
        if ch == '_' || ch == ' ' {
            result.push('-');
        } else if ch.is_uppercase() {
            if i != 0 {
                result.push('-');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

fn to_json(value: &TemplateValue) -> serde_json::Value {
    match value {
        TemplateValue::Null => serde_json::Value::Null,
        TemplateValue::Bool(b) => serde_json::Value::Bool(*b),
        TemplateValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        TemplateValue::String(s) => serde_json::Value::String(s.clone()),
        TemplateValue::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        TemplateValue::Object(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map {
                obj.insert(k.clone(), to_json(v));
            }
            serde_json::Value::Object(obj)
        }
        TemplateValue::Unresolved(_) => serde_json::Value::Null,
    }
}
