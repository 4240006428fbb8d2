//! Response envelope and pagination decoding
//!
//! The backend answers in several shapes. Payloads are accepted in this order:
//!
//! 1. an object with a boolean `success`: `{success, data, message, errors}`,
//!    where `success: false` is an [`ClientError::Api`] error;
//! 2. an object with a `data` key: `{data, message?}`;
//! 3. anything else is the payload itself.
//!
//! Pages are read, after unwrapping an envelope whose `data` is an object, as
//! `{data: [...], currentPage, totalPages, totalItems, hasNext, hasPrev}`,
//! then as Spring `{content: [...], number, totalPages, totalElements, first,
//! last}`, then as a bare array holding a single page.

use crate::client::error::ClientError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded payload plus the backend's message, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse<T> {
    pub data: T,
    pub message: Option<String>,
}

/// One page of a listing, numbered from 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl<T> Page<T> {
    /// Everything in one page
    pub fn single(items: Vec<T>) -> Self {
        let total_items = items.len() as u64;
        Self {
            items,
            current_page: 1,
            total_pages: 1,
            total_items,
            has_next: false,
            has_prev: false,
        }
    }
}

/// Decode a response body into its payload
///
/// # Errors
///
/// Returns [`ClientError::Api`] for `success: false` and
/// [`ClientError::Serialization`] if the payload does not match `T`.
pub fn decode<T: DeserializeOwned>(body: Value) -> Result<ApiResponse<T>, ClientError> {
    let (payload, message) = unwrap_envelope(body)?;
    Ok(ApiResponse {
        data: serde_json::from_value(payload)?,
        message,
    })
}

/// Decode a response body into a normalized page
///
/// # Errors
///
/// Returns [`ClientError::Api`] for `success: false`,
/// [`ClientError::UnexpectedResponse`] if no list can be found, and
/// [`ClientError::Serialization`] if an item does not match `T`.
pub fn decode_page<T: DeserializeOwned>(body: Value) -> Result<Page<T>, ClientError> {
    let payload = match body {
        Value::Object(mut fields) => {
            reject_failure(&mut fields)?;
            if fields.get("data").is_some_and(Value::is_object) {
                fields.remove("data").unwrap_or_default()
            } else {
                Value::Object(fields)
            }
        }
        other => other,
    };

    match payload {
        Value::Array(items) => Ok(Page::single(decode_items(items)?)),
        Value::Object(mut fields) => {
            if let Some(Value::Array(items)) = fields.remove("data") {
                return Ok(current_page_style(decode_items(items)?, &fields));
            }
            if let Some(Value::Array(items)) = fields.remove("content") {
                return Ok(spring_style(decode_items(items)?, &fields));
            }
            Err(ClientError::UnexpectedResponse(
                "expected a list or a paginated object".into(),
            ))
        }
        other => Err(ClientError::UnexpectedResponse(format!(
            "expected a list, got {}",
            kind_of(&other)
        ))),
    }
}

fn message_of(fields: &Map<String, Value>) -> Option<String> {
    fields
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn reject_failure(fields: &mut Map<String, Value>) -> Result<(), ClientError> {
    if fields.get("success") != Some(&Value::Bool(false)) {
        return Ok(());
    }
    Err(ClientError::Api {
        message: message_of(fields).unwrap_or_else(|| "request was not successful".to_string()),
        errors: fields.remove("errors").map(flatten_errors).unwrap_or_default(),
    })
}

fn unwrap_envelope(body: Value) -> Result<(Value, Option<String>), ClientError> {
    let Value::Object(mut fields) = body else {
        return Ok((body, None));
    };
    reject_failure(&mut fields)?;

    let enveloped = matches!(fields.get("success"), Some(Value::Bool(true)))
        || fields.contains_key("data");
    if enveloped {
        let message = message_of(&fields);
        Ok((fields.remove("data").unwrap_or(Value::Null), message))
    } else {
        Ok((Value::Object(fields), None))
    }
}

fn flatten_errors(errors: Value) -> Vec<String> {
    match errors {
        Value::Array(items) => items.into_iter().map(value_text).collect(),
        Value::Object(fields) => fields
            .into_iter()
            .map(|(field, value)| format!("{field}: {}", value_text(value)))
            .collect(),
        Value::Null => Vec::new(),
        other => vec![value_text(other)],
    }
}

fn value_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, ClientError> {
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(ClientError::from))
        .collect()
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<u64> {
    fields.get(key).and_then(Value::as_u64)
}

fn flag(fields: &Map<String, Value>, key: &str) -> Option<bool> {
    fields.get(key).and_then(Value::as_bool)
}

fn current_page_style<T>(items: Vec<T>, fields: &Map<String, Value>) -> Page<T> {
    let current_page = number(fields, "currentPage").unwrap_or(1).max(1);
    let total_items = number(fields, "totalItems").unwrap_or(items.len() as u64);
    let total_pages = number(fields, "totalPages").unwrap_or(1);

    Page {
        items,
        current_page,
        total_pages,
        total_items,
        has_next: flag(fields, "hasNext").unwrap_or(current_page < total_pages),
        has_prev: flag(fields, "hasPrev").unwrap_or(current_page > 1),
    }
}

fn spring_style<T>(items: Vec<T>, fields: &Map<String, Value>) -> Page<T> {
    let current_page = number(fields, "number").unwrap_or(0) + 1;
    let total_items = number(fields, "totalElements").unwrap_or(items.len() as u64);
    let total_pages = number(fields, "totalPages").unwrap_or(1);

    Page {
        items,
        current_page,
        total_pages,
        total_items,
        has_next: flag(fields, "last").map_or(current_page < total_pages, |last| !last),
        has_prev: flag(fields, "first").map_or(current_page > 1, |first| !first),
    }
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    #[test]
    fn test_decode_success_envelope() {
        let response: ApiResponse<Item> =
            decode(json!({"success": true, "data": {"id": 1}, "message": "ok"})).unwrap();
        assert_eq!(response.data, Item { id: 1 });
        assert_eq!(response.message.as_deref(), Some("ok"));
    }

    #[test]
    fn test_decode_failed_envelope() {
        let err = decode::<Item>(json!({
            "success": false,
            "message": "Validation failed",
            "errors": {"name": "required"}
        }))
        .unwrap_err();

        match err {
            ClientError::Api { message, errors } => {
                assert_eq!(message, "Validation failed");
                assert_eq!(errors, vec!["name: required".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_data_wrapper_and_bare_value() {
        let wrapped: ApiResponse<Vec<Item>> =
            decode(json!({"message": "3 annonces", "data": [{"id": 3}]})).unwrap();
        assert_eq!(wrapped.data, vec![Item { id: 3 }]);
        assert_eq!(wrapped.message.as_deref(), Some("3 annonces"));

        let bare: ApiResponse<Item> = decode(json!({"id": 4})).unwrap();
        assert_eq!(bare.data, Item { id: 4 });
        assert_eq!(bare.message, None);
    }

    #[test]
    fn test_page_from_nested_envelope() {
        let page: Page<Item> = decode_page(json!({
            "success": true,
            "data": {
                "data": [{"id": 1}, {"id": 2}],
                "currentPage": 2,
                "totalPages": 3,
                "totalItems": 12,
                "hasNext": true,
                "hasPrev": true
            }
        }))
        .unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_items, 12);
        assert!(page.has_next && page.has_prev);
    }

    #[test]
    fn test_page_from_spring_shape() {
        let page: Page<Item> = decode_page(json!({
            "content": [{"id": 7}],
            "number": 0,
            "totalPages": 4,
            "totalElements": 31,
            "first": true,
            "last": false
        }))
        .unwrap();

        assert_eq!(page.current_page, 1);
        assert_eq!(page.total_pages, 4);
        assert_eq!(page.total_items, 31);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_page_fields_beside_data() {
        let page: Page<Item> = decode_page(json!({
            "data": [{"id": 1}],
            "currentPage": 1,
            "totalPages": 2,
            "totalItems": 15
        }))
        .unwrap();

        assert_eq!(page.items, vec![Item { id: 1 }]);
        assert_eq!(page.total_items, 15);
        assert!(page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_page_from_bare_array() {
        let page: Page<Item> = decode_page(json!([{"id": 1}, {"id": 2}, {"id": 3}])).unwrap();
        assert_eq!(page, Page::single(vec![Item { id: 1 }, Item { id: 2 }, Item { id: 3 }]));
    }

    #[test]
    fn test_page_errors_are_not_empty_pages() {
        assert!(matches!(
            decode_page::<Item>(json!({"success": false, "message": "boom"})),
            Err(ClientError::Api { .. })
        ));
        assert!(matches!(
            decode_page::<Item>(json!({"data": {"total": 0}})),
            Err(ClientError::UnexpectedResponse(_))
        ));
    }
}
