pub mod edamam;
pub mod open_food_facts;
pub mod spoonacular;
pub mod trait_impl;
pub mod usda;

pub use edamam::EdamamProvider;
pub use open_food_facts::OpenFoodFactsProvider;
pub use spoonacular::SpoonacularProvider;
pub use trait_impl::NutritionProvider;
pub use usda::UsdaProvider;

use crate::error::{NutritionError, Result};
use reqwest::RequestBuilder;
use serde_json::Value;

/// Longest response body excerpt kept in error messages
const MAX_ERROR_BODY: usize = 500;

/// Send the request and parse a JSON body, mapping non-success statuses
pub(crate) async fn fetch_json(request: RequestBuilder) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let body = if text.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text[..end].to_string()
        } else {
            text
        };
        return Err(NutritionError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let text = response.text().await?;
    let value: Value = serde_json::from_str(&text)?;
    if !value.is_object() {
        return Err(NutritionError::InvalidResponse(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    Ok(value)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Numeric field as `f64`; missing, null or unparsable values are 0.
/// Numeric strings are accepted since some providers emit them.
pub(crate) fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// First element of a non-empty array field
pub(crate) fn first<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    value.get(field).and_then(Value::as_array).and_then(|items| items.first())
}

/// Non-empty string field, falling back to `default`
pub(crate) fn text_or(value: &Value, field: &str, default: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Never log a full credential
pub(crate) fn key_prefix(key: &str) -> &str {
    match key.char_indices().nth(4) {
        Some((idx, _)) if key.len() > 8 => &key[..idx],
        _ => "***",
    }
}
