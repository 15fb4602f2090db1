//! Pagination module
//!
//! Cursor handling for the recent-media-by-tag endpoint.
//!
//! # Overview
//!
//! The upstream API paginates with a `next_url` in the response body. Instead
//! of treating that URL as an opaque string, the module parses it into a
//! [`Cursor`]: base URL plus ordered query parameters. Swapping the credential
//! after a rate-limit is then a structural parameter update rather than a
//! substring replacement.

mod cursor;
mod page;

pub use cursor::{Cursor, CREDENTIAL_PARAM, DEFAULT_BASE_URL, PAGE_SIZE_PARAM};
pub use page::Page;
