//! Credential module
//!
//! Static API credentials (client IDs) and the rotation pool used to spread
//! requests across per-credential rate limits.
//!
//! Credentials are appended to every request as the `client_id` query
//! parameter. When the upstream answers with a rate-limit status, the engine
//! rotates the pool and retries with the next credential.

mod pool;

pub use pool::{Credential, CredentialPool, CREDENTIAL_LEN};
