//! Parsed response page

use super::cursor::Cursor;
use crate::error::{Error, Result};
use crate::types::{created_time, Batch, JsonValue};

/// One successful response: its records and where to go next
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Records from the `data` array, in server order
    pub records: Batch,
    /// Cursor from `pagination.next_url`; `None` at the end of results
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// Create a page
    pub fn new(records: Batch, next_cursor: Option<Cursor>) -> Self {
        Self {
            records,
            next_cursor,
        }
    }

    /// Parse a response body.
    ///
    /// A missing `data` array is malformed. A missing, null or empty
    /// `pagination.next_url` means there are no further pages.
    pub fn from_body(body: &JsonValue) -> Result<Self> {
        let records = match body.get("data") {
            Some(JsonValue::Array(records)) => records.clone(),
            Some(other) => {
                return Err(Error::malformed(format!(
                    "'data' must be an array, got {}",
                    json_type(other)
                )))
            }
            None => return Err(Error::malformed("response has no 'data' field")),
        };

        let next_cursor = match body.get("pagination").and_then(|p| p.get("next_url")) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(url)) if url.trim().is_empty() => None,
            Some(JsonValue::String(url)) => Some(
                Cursor::parse(url)
                    .map_err(|e| Error::malformed(format!("invalid next_url '{url}': {e}")))?,
            ),
            Some(other) => {
                return Err(Error::malformed(format!(
                    "'pagination.next_url' must be a string, got {}",
                    json_type(other)
                )))
            }
        };

        Ok(Self::new(records, next_cursor))
    }

    /// Number of records in the page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the page has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether upstream has more pages
    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// `created_time` of the final record; the oldest one for a
    /// reverse-chronological feed
    pub fn last_created_time(&self) -> Option<i64> {
        self.records.last().and_then(created_time)
    }
}

fn json_type(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
