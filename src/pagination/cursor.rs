//! Structured pagination cursor

use crate::credentials::Credential;
use crate::error::{Error, Result};
use std::fmt;
use url::Url;

/// Query parameter carrying the credential
pub const CREDENTIAL_PARAM: &str = "client_id";

/// Query parameter carrying the page size
pub const PAGE_SIZE_PARAM: &str = "count";

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.instagram.com/v1";

/// Position of the next request: endpoint plus query parameters
///
/// Parameters keep their original order so a cursor read back from the
/// cursor log renders to the same URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Endpoint without query string
    base: Url,
    /// Decoded query parameters, in order
    params: Vec<(String, String)>,
}

impl Cursor {
    /// Build the `/tags/{tag}/media/recent` endpoint under `base_url`
    pub fn tag_endpoint(base_url: &str, tag: &str) -> Result<Url> {
        let tag = tag.trim().trim_start_matches('#');
        if tag.is_empty() {
            return Err(Error::config("Tag cannot be empty"));
        }

        let mut url = Url::parse(base_url)?;
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| Error::config(format!("Base URL cannot be a base: {base_url}")))?
            .pop_if_empty()
            .extend(["tags", tag, "media", "recent"]);
        Ok(url)
    }

    /// First cursor of a fresh run.
    ///
    /// User parameters come first; the credential and page size are set
    /// afterwards and win over user parameters with the same name.
    pub fn initial(
        base_url: &str,
        tag: &str,
        credential: &Credential,
        page_size: u32,
        extra_params: &[(String, String)],
    ) -> Result<Self> {
        let mut cursor = Self {
            base: Self::tag_endpoint(base_url, tag)?,
            params: extra_params.to_vec(),
        };
        cursor.set_credential(credential);
        cursor.set_param(PAGE_SIZE_PARAM, page_size.to_string());
        Ok(cursor)
    }

    /// Parse a cursor from an absolute URL
    pub fn parse(url: &str) -> Result<Self> {
        Ok(Self::from_url(Url::parse(url.trim())?))
    }

    /// Split a URL into endpoint and parameters
    pub fn from_url(mut url: Url) -> Self {
        let params = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.set_query(None);
        Self { base: url, params }
    }

    /// Credential embedded in the cursor, if any
    pub fn credential(&self) -> Option<&str> {
        self.param(CREDENTIAL_PARAM)
    }

    /// Point the cursor at a different credential
    pub fn set_credential(&mut self, credential: &Credential) {
        self.set_param(CREDENTIAL_PARAM, credential.as_str());
    }

    /// Value of the first parameter named `key`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a parameter, replacing it in place if present (duplicates are
    /// dropped) or appending it otherwise.
    pub fn set_param(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.params.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                self.params[idx].1 = value;
                let mut seen = false;
                self.params.retain(|(k, _)| {
                    if k != key {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => self.params.push((key.to_string(), value)),
        }
    }

    /// All query parameters, in order
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Endpoint without query
    pub fn endpoint(&self) -> &Url {
        &self.base
    }

    /// Render the full request URL
    pub fn to_url(&self) -> Url {
        let mut url = self.base.clone();
        if !self.params.is_empty() {
            url.query_pairs_mut()
                .clear()
                .extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        url
    }

    /// Last path segment plus query, with the credential masked. Used for
    /// progress logging.
    pub fn short_display(&self) -> String {
        let segment = self
            .base
            .path_segments()
            .and_then(Iterator::last)
            .unwrap_or_default();
        let query = self
            .params
            .iter()
            .map(|(k, v)| {
                if k == CREDENTIAL_PARAM {
                    format!("{k}={}…", v.chars().take(4).collect::<String>())
                } else {
                    format!("{k}={v}")
                }
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{segment}?{query}")
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_url().as_str())
    }
}

impl std::str::FromStr for Cursor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
