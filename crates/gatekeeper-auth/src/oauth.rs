//! OAuth 2.0 client-credentials and refresh-token issuance (spec §6), a
//! narrow in-process token issuer sitting in front of whatever client
//! store the deployment configures (SQLite-backed or otherwise - out of
//! scope for this crate, spec §1).

use async_trait::async_trait;
use rand::RngCore;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;

use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Validates `client_id`/`client_secret`, returning the client record
    /// on success. Implementations must compare the secret in constant
    /// time.
    async fn validate(&self, client_id: &str, client_secret: &str) -> Option<OAuthClient>;
}

pub struct InMemoryClientStore {
    clients: HashMap<String, OAuthClient>,
}

impl InMemoryClientStore {
    pub fn new(clients: Vec<OAuthClient>) -> Self {
        InMemoryClientStore {
            clients: clients.into_iter().map(|c| (c.client_id.clone(), c)).collect(),
        }
    }
}

#[async_trait]
impl ClientStore for InMemoryClientStore {
    async fn validate(&self, client_id: &str, client_secret: &str) -> Option<OAuthClient> {
        let client = self.clients.get(client_id)?;
        if crate::bearer::keys_equal(client_secret, &client.client_secret) {
            Some(client.clone())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    pub refresh_token: String,
}

struct IssuedToken {
    client_id: String,
    scope: Option<String>,
    expires_at: SystemTime,
}

/// Issues and tracks bearer access tokens plus their refresh tokens.
/// Entirely in-memory - restart invalidates every outstanding token,
/// which matches the "no persistent session resumption" non-goal.
pub struct TokenIssuer {
    clients: Box<dyn ClientStore>,
    access_ttl: Duration,
    access_tokens: RwLock<HashMap<String, IssuedToken>>,
    refresh_to_client: RwLock<HashMap<String, String>>,
}

impl TokenIssuer {
    pub fn new(clients: Box<dyn ClientStore>, access_ttl: Duration) -> Self {
        TokenIssuer {
            clients,
            access_ttl,
            access_tokens: RwLock::new(HashMap::new()),
            refresh_to_client: RwLock::new(HashMap::new()),
        }
    }

    pub async fn client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
        scope: Option<String>,
    ) -> Result<TokenResponse, AuthError> {
        let client = self
            .clients
            .validate(client_id, client_secret)
            .await
            .ok_or(AuthError::InvalidClient)?;
        let effective_scope = scope.or_else(|| client.scope.clone());
        Ok(self.issue(client.client_id, effective_scope).await)
    }

    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let client_id = self
            .refresh_to_client
            .write()
            .await
            .remove(refresh_token)
            .ok_or(AuthError::InvalidGrant)?;
        Ok(self.issue(client_id, None).await)
    }

    async fn issue(&self, client_id: String, scope: Option<String>) -> TokenResponse {
        let access_token = random_token();
        let refresh_token = random_token();
        let expires_at = SystemTime::now() + self.access_ttl;

        self.access_tokens.write().await.insert(
            access_token.clone(),
            IssuedToken {
                client_id: client_id.clone(),
                scope: scope.clone(),
                expires_at,
            },
        );
        self.refresh_to_client
            .write()
            .await
            .insert(refresh_token.clone(), client_id);

        TokenResponse {
            access_token,
            token_type: "Bearer",
            expires_in: self.access_ttl.as_secs(),
            refresh_token,
        }
    }

    /// Validates a presented bearer access token, returning the client it
    /// was issued for if it exists and has not expired.
    pub async fn validate_access_token(&self, token: &str) -> Option<String> {
        let tokens = self.access_tokens.read().await;
        let issued = tokens.get(token)?;
        if issued.expires_at <= SystemTime::now() {
            return None;
        }
        Some(issued.client_id.clone())
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
