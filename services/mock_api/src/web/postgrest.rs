//! services/mock_api/src/web/postgrest.rs
//!
//! Just enough of the PostgREST query conventions for the frontend's client
//! library: `column=eq.value` filters, `Prefer: count=exact`, and the
//! `Content-Range` header that carries the count.

use std::collections::HashMap;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::error::{error_response, HandlerError};

/// The query parameters of one request, read as equality filters.
#[derive(Debug, Default, Clone)]
pub struct Filters(HashMap<String, String>);

impl From<HashMap<String, String>> for Filters {
    fn from(params: HashMap<String, String>) -> Self {
        Self(params)
    }
}

impl Filters {
    /// The value of a `column=eq.value` filter. Other operators are ignored.
    pub fn eq(&self, column: &str) -> Option<&str> {
        self.0.get(column)?.strip_prefix("eq.")
    }

    /// An `eq.true` / `eq.false` filter.
    pub fn eq_bool(&self, column: &str) -> Result<Option<bool>, HandlerError> {
        match self.eq(column) {
            None => Ok(None),
            Some("true") => Ok(Some(true)),
            Some("false") => Ok(Some(false)),
            Some(other) => Err(error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid boolean for {column}: {other}"),
            )),
        }
    }

    /// The id targeted by an update, required for PATCH.
    pub fn required_id(&self) -> Result<&str, HandlerError> {
        self.eq("id").ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "An id=eq.<value> filter is required",
            )
        })
    }
}

/// Whether the caller asked for an exact count via the `Prefer` header.
pub fn wants_exact_count(headers: &HeaderMap) -> bool {
    headers
        .get_all("prefer")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|pref| pref.trim() == "count=exact")
}

/// `0-<n-1>/<n>`, or `*/0` for an empty result.
pub fn content_range(total: usize) -> String {
    if total == 0 {
        "*/0".to_string()
    } else {
        format!("0-{}/{}", total - 1, total)
    }
}

/// Answers a collection query. In count mode the body is an empty array and
/// the total travels in `Content-Range`.
pub fn collection<T: Serialize>(rows: Vec<T>, count_only: bool) -> Response {
    if !count_only {
        return Json(rows).into_response();
    }
    let mut response = Json(Vec::<T>::new()).into_response();
    if let Ok(value) = HeaderValue::from_str(&content_range(rows.len())) {
        response.headers_mut().insert(header::CONTENT_RANGE, value);
    }
    response
}
