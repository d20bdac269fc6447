//! Response envelope decoding.
//!
//! The backend wraps lists in several ways depending on the route. Each body is classified
//! into exactly one [`ListShape`]; anything else is a decode error rather than an empty list.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ApiError;

/// Recognized list envelopes.
#[derive(Debug, Clone, PartialEq)]
pub enum ListShape {
    /// `[...]`
    Bare(Vec<Value>),
    /// `{"data": [...]}`
    Data(Vec<Value>),
    /// `{"items": [...]}`
    Items(Vec<Value>),
    /// `{"<resource>": [...]}`, e.g. `{"products": [...]}`
    Named(Vec<Value>),
}

impl ListShape {
    pub fn into_items(self) -> Vec<Value> {
        match self {
            ListShape::Bare(v) | ListShape::Data(v) | ListShape::Items(v) | ListShape::Named(v) => v,
        }
    }
}

/// Pagination metadata found next to a wrapped list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub total: Option<u64>,
    pub total_pages: Option<u32>,
}

impl PageMeta {
    fn from_map(map: &Map<String, Value>) -> Self {
        let read = |key: &str| map.get(key).and_then(Value::as_u64);
        Self {
            page: read("page").and_then(|v| u32::try_from(v).ok()),
            limit: read("limit").and_then(|v| u32::try_from(v).ok()),
            total: read("total"),
            total_pages: read("totalPages").and_then(|v| u32::try_from(v).ok()),
        }
    }
}

/// What the caller asked for, used to fill metadata the server left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// A normalized page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    fn assemble(data: Vec<T>, meta: PageMeta, request: PageRequest) -> Self {
        let count = u32::try_from(data.len()).unwrap_or(u32::MAX);
        let page = meta.page.or(request.page).unwrap_or(1).max(1);
        let limit = meta.limit.or(request.limit).unwrap_or(count);
        let total = meta.total.unwrap_or(data.len() as u64);
        let total_pages = meta.total_pages.unwrap_or_else(|| {
            if limit == 0 {
                1
            } else {
                u32::try_from(total.div_ceil(u64::from(limit)))
                    .unwrap_or(u32::MAX)
                    .max(1)
            }
        });
        Self {
            data,
            page,
            limit,
            total,
            total_pages,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        }
    }

    /// Like [`Page::map`], dropping items for which `f` returns `None`. Metadata is kept as
    /// the server reported it.
    pub fn filter_map<U>(self, f: impl FnMut(T) -> Option<U>) -> Page<U> {
        Page {
            data: self.data.into_iter().filter_map(f).collect(),
            page: self.page,
            limit: self.limit,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}

/// Classify a list response body.
pub fn classify(value: Value, resource_key: &str) -> Result<(ListShape, PageMeta), ApiError> {
    match value {
        Value::Array(items) => Ok((ListShape::Bare(items), PageMeta::default())),
        Value::Object(mut map) => {
            let meta = PageMeta::from_map(&map);
            let candidates: [(&str, fn(Vec<Value>) -> ListShape); 3] = [
                ("data", ListShape::Data),
                (resource_key, ListShape::Named),
                ("items", ListShape::Items),
            ];
            for (key, shape) in candidates {
                if matches!(map.get(key), Some(Value::Array(_))) {
                    if let Some(Value::Array(items)) = map.remove(key) {
                        return Ok((shape(items), meta));
                    }
                }
            }
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            Err(ApiError::decode(format!(
                "unrecognized list envelope for '{resource_key}' (keys: {})",
                keys.join(", ")
            )))
        }
        other => Err(ApiError::decode(format!(
            "expected a list envelope for '{resource_key}', got {}",
            json_kind(&other)
        ))),
    }
}

/// Decode a list response into a normalized page.
pub fn decode_list<T: DeserializeOwned>(
    value: Value,
    resource_key: &str,
    request: PageRequest,
) -> Result<Page<T>, ApiError> {
    let (shape, meta) = classify(value, resource_key)?;
    let data = shape
        .into_items()
        .into_iter()
        .map(decode)
        .collect::<Result<Vec<T>, _>>()?;
    Ok(Page::assemble(data, meta, request))
}

/// Decode a single-record response. Accepts a bare record (has `_id` or `id`) or one wrapped
/// under `data`, the resource key, `result` or `item`.
pub fn decode_record<T: DeserializeOwned>(value: Value, resource_key: &str) -> Result<T, ApiError> {
    match value {
        Value::Object(map) if map.contains_key("_id") || map.contains_key("id") => {
            decode(Value::Object(map))
        }
        Value::Object(mut map) => {
            for key in ["data", resource_key, "result", "item"] {
                if matches!(map.get(key), Some(Value::Object(_))) {
                    if let Some(inner) = map.remove(key) {
                        return decode(inner);
                    }
                }
            }
            Err(ApiError::decode(format!(
                "no '{resource_key}' record in response"
            )))
        }
        other => Err(ApiError::decode(format!(
            "expected a '{resource_key}' record, got {}",
            json_kind(&other)
        ))),
    }
}

/// Keys the backend may send twice under two names. The first of each pair wins and the
/// second is dropped before decoding.
const DUPLICATE_KEYS: [(&str, &str); 2] = [("_id", "id"), ("category", "categoryId")];

/// Serde decode with the error mapped into [`ApiError::Decode`]. Records are normalized
/// first, see [`normalize`].
pub fn decode<T: DeserializeOwned>(mut value: Value) -> Result<T, ApiError> {
    normalize(&mut value);
    serde_json::from_value(value).map_err(|e| ApiError::decode(e.to_string()))
}

/// Tidy every object in `value` so one odd record cannot fail a whole page:
/// - `null` members are removed, so the model's default applies
/// - of `_id`/`id` and `category`/`categoryId`, only the first is kept when both are present
pub fn normalize(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            for (keep, drop) in DUPLICATE_KEYS {
                if map.contains_key(keep) {
                    map.remove(drop);
                }
            }
            map.values_mut().for_each(normalize);
        }
        Value::Array(items) => items.iter_mut().for_each(normalize),
        _ => {}
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    }

    #[test]
    fn test_named_key_checked_before_items() {
        let body = json!({"products": [{"_id": "p1"}], "items": []});
        let (shape, _) = classify(body, "products").unwrap();
        assert!(matches!(shape, ListShape::Named(ref v) if v.len() == 1));
    }

    #[test]
    fn test_meta_read_from_wrapper() {
        let body = json!({"data": [{"_id": "a"}], "page": 2, "limit": 1, "total": 5});
        let page: Page<Row> = decode_list(body, "orders", PageRequest::default()).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 1);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 5);
    }

    #[test]
    fn test_missing_meta_uses_request_then_count() {
        let body = json!([{"_id": "a"}, {"id": "b"}, {"_id": "c"}]);
        let page: Page<Row> = decode_list(
            body,
            "orders",
            PageRequest {
                page: Some(1),
                limit: Some(2),
            },
        )
        .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data[1].id, "b");
    }

    #[test]
    fn test_empty_bare_list_has_one_page() {
        let page: Page<Row> = decode_list(json!([]), "orders", PageRequest::default()).unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_record_shapes() {
        let bare: Row = decode_record(json!({"_id": "x"}), "coupon").unwrap();
        let data: Row = decode_record(json!({"data": {"_id": "x"}}), "coupon").unwrap();
        let named: Row = decode_record(json!({"coupon": {"id": "x"}}), "coupon").unwrap();
        let result: Row = decode_record(json!({"result": {"_id": "x"}}), "coupon").unwrap();
        assert_eq!(bare, data);
        assert_eq!(named, result);
    }

    #[test]
    fn test_out_of_range_meta_counts_as_missing() {
        let body = json!({
            "data": [{"_id": "a"}, {"_id": "b"}],
            "page": 8_589_934_592u64,
            "limit": 4_294_967_296u64,
            "totalPages": 4_294_967_297u64
        });
        let page: Page<Row> = decode_list(
            body,
            "orders",
            PageRequest {
                page: Some(3),
                limit: None,
            },
        )
        .unwrap();
        assert_eq!(page.page, 3);
        assert_eq!(page.limit, 2);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_normalize_keeps_first_of_duplicate_keys() {
        let mut value = json!({
            "_id": "p1",
            "id": "p1",
            "price": null,
            "category": {"_id": "c1", "id": "c1", "name": "Greens"},
            "categoryId": "c1"
        });
        normalize(&mut value);
        assert_eq!(
            value,
            json!({"_id": "p1", "category": {"_id": "c1", "name": "Greens"}})
        );
    }

    #[test]
    fn test_record_without_payload_is_error() {
        let err = decode_record::<Row>(json!({"message": "ok"}), "coupon").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
