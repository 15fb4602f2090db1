//! Record transforms
//!
//! A transform maps the raw `data` array of one response to the records that
//! are written to the sink. It runs before truncation, so the quota counts
//! output records.

use crate::types::{Batch, JsonValue, Record};
use serde::{Deserialize, Serialize};

/// Maps a raw batch to an output batch
pub trait Transform: Send + Sync {
    /// Transform one response's records, keeping server order
    fn apply(&self, raw: Batch) -> Batch;

    /// Name used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Transform for F
where
    F: Fn(Batch) -> Batch + Send + Sync,
{
    fn apply(&self, raw: Batch) -> Batch {
        self(raw)
    }
}

/// Pass records through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transform for Identity {
    fn apply(&self, raw: Batch) -> Batch {
        raw
    }

    fn name(&self) -> &str {
        "raw"
    }
}

/// `[created_time, likes.count]` per record
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampLikes;

impl Transform for TimestampLikes {
    fn apply(&self, raw: Batch) -> Batch {
        raw.iter()
            .map(|post| JsonValue::Array(vec![field(post, "/created_time"), field(post, "/likes/count")]))
            .collect()
    }

    fn name(&self) -> &str {
        "timestamp-likes"
    }
}

/// `[images.standard_resolution.url, created_time, likes.count]` per record
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTimestampLikes;

impl Transform for ImageTimestampLikes {
    fn apply(&self, raw: Batch) -> Batch {
        raw.iter()
            .map(|post| {
                JsonValue::Array(vec![
                    field(post, "/images/standard_resolution/url"),
                    field(post, "/created_time"),
                    field(post, "/likes/count"),
                ])
            })
            .collect()
    }

    fn name(&self) -> &str {
        "image-timestamp-likes"
    }
}

/// Missing fields become null rather than failing the whole batch
fn field(record: &Record, pointer: &str) -> JsonValue {
    record.pointer(pointer).cloned().unwrap_or(JsonValue::Null)
}

/// Built-in transforms selectable from configuration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    /// Raw record objects
    #[default]
    Raw,
    /// Creation time and like count
    TimestampLikes,
    /// Image URL, creation time and like count
    ImageTimestampLikes,
}

impl TransformKind {
    /// Instantiate the transform
    pub fn build(self) -> Box<dyn Transform> {
        match self {
            Self::Raw => Box::new(Identity),
            Self::TimestampLikes => Box::new(TimestampLikes),
            Self::ImageTimestampLikes => Box::new(ImageTimestampLikes),
        }
    }
}
