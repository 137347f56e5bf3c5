//! API-key and OAuth 2.0 client-credentials authentication, discovery
//! document builders, and the audit-log interface (spec §4.10/§6/§7).
//! SQLite-backed persistence for keys/clients/refresh-tokens/audit rows
//! is out of scope (spec §1); this crate defines the narrow traits a
//! persistent adapter would implement.

pub mod apikey;
pub mod audit;
pub mod bearer;
pub mod discovery;
pub mod error;
pub mod oauth;

pub use apikey::{ApiKeyRecord, ApiKeyStore, InMemoryApiKeyStore};
pub use audit::{AuditSink, BridgeAuditRecord, TracingAuditSink};
pub use bearer::{extract_bearer, keys_equal, www_authenticate};
pub use error::AuthError;
pub use oauth::{ClientStore, InMemoryClientStore, OAuthClient, TokenIssuer, TokenResponse};
