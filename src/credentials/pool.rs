//! Credential and credential pool types

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

/// Canonical credential length
pub const CREDENTIAL_LEN: usize = 32;

/// An opaque API credential
///
/// Always exactly [`CREDENTIAL_LEN`] ASCII alphanumeric characters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Validate and wrap a token
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::invalid_credential("no API key provided"));
        }
        let len = token.chars().count();
        if len != CREDENTIAL_LEN {
            return Err(Error::invalid_credential(format!(
                "expected {CREDENTIAL_LEN} characters, got {len}"
            )));
        }
        if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::invalid_credential(
                "key must only contain ASCII letters and digits",
            ));
        }
        Ok(Self(token))
    }

    /// The raw token
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shortened form safe for logs
    pub fn masked(&self) -> String {
        format!("{}…", &self.0[..4])
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Ordered rotation of credentials
///
/// The head of the queue is the credential currently in use. Rotation moves
/// the head to the back, so the credential used first is tried again last.
#[derive(Debug, Clone)]
pub struct CredentialPool {
    credentials: VecDeque<Credential>,
}

impl CredentialPool {
    /// Build a pool from raw tokens. Fails if the list is empty or any token
    /// is malformed.
    pub fn new<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let credentials = tokens
            .into_iter()
            .map(Credential::new)
            .collect::<Result<VecDeque<_>>>()?;

        Self::from_credentials(credentials)
    }

    /// Build a pool from already validated credentials
    pub fn from_credentials(credentials: impl IntoIterator<Item = Credential>) -> Result<Self> {
        let credentials: VecDeque<_> = credentials.into_iter().collect();
        if credentials.is_empty() {
            return Err(Error::invalid_credential("credential pool is empty"));
        }
        Ok(Self { credentials })
    }

    /// Load credentials from a key file.
    ///
    /// One credential per line; only the first comma-separated field is
    /// used. Blank lines, `#` comments and a `client_id` header are skipped.
    pub fn from_keyfile(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read key file '{}': {e}", path.display()))
        })?;
        Self::parse_keyfile(&content)
    }

    /// Parse key file contents
    pub fn parse_keyfile(content: &str) -> Result<Self> {
        let tokens = content
            .lines()
            .map(|line| line.split(',').next().unwrap_or_default().trim())
            .map(|field| field.trim_matches('"'))
            .filter(|field| !field.is_empty() && !field.starts_with('#'))
            .filter(|field| !field.eq_ignore_ascii_case("client_id"))
            .map(str::to_string)
            .collect::<Vec<_>>();

        Self::new(tokens)
    }

    /// The credential currently in use
    pub fn current(&self) -> &Credential {
        // Non-empty by construction
        &self.credentials[0]
    }

    /// Move the current credential to the back and return the new current one.
    ///
    /// Returns `None` for a singleton pool: there is no alternate credential.
    pub fn rotate(&mut self) -> Option<&Credential> {
        if self.credentials.len() < 2 {
            return None;
        }
        self.credentials.rotate_left(1);
        Some(self.current())
    }

    /// Number of credentials in the pool
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Whether the pool can rotate at all
    pub fn has_alternates(&self) -> bool {
        self.credentials.len() > 1
    }

    /// Iterate in rotation order, starting with the current credential
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.iter()
    }
}
