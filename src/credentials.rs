//! Credentials for the storage API.
//!
//! Either an already issued OAuth access token, or a service-account JSON key that is
//! exchanged for one through the OAuth2 JWT bearer grant (RFC 7523).

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::contract::SinkError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.full_control";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file this crate needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Signed RS256 assertion requesting `scope`, valid for one hour from now.
    pub fn assertion(&self, scope: &str) -> Result<String, SinkError> {
        let iat = Utc::now();
        let claims = Claims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: iat.timestamp(),
            exp: (iat + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())?;
        Ok(jsonwebtoken::encode(&header, &claims, &key)?)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// How the sink authenticates.
#[derive(Clone)]
pub enum Credentials {
    AccessToken(String),
    ServiceAccount(ServiceAccountKey),
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::AccessToken(_) => f.write_str("AccessToken(..)"),
            Credentials::ServiceAccount(key) => f.debug_tuple("ServiceAccount").field(key).finish(),
        }
    }
}

impl Credentials {
    /// Produce a bearer token, exchanging the service-account key when needed.
    pub async fn access_token(&self, client: &Client) -> Result<String, SinkError> {
        match self {
            Credentials::AccessToken(token) => Ok(token.clone()),
            Credentials::ServiceAccount(key) => exchange_key(client, key).await,
        }
    }
}

async fn exchange_key(client: &Client, key: &ServiceAccountKey) -> Result<String, SinkError> {
    info!(client_email = %key.client_email, token_uri = %key.token_uri, "[AUTH] Exchanging service-account key");
    let assertion = key.assertion(STORAGE_SCOPE)?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        error!(%status, body = %body, "[AUTH][ERROR] Token exchange failed");
        return Err(format!("token exchange failed with status {status}: {body}").into());
    }

    let token: TokenResponse = response.json().await?;
    debug!(expires_in = ?token.expires_in, "[AUTH] Access token issued");
    Ok(token.access_token)
}
