//! Service-account credentials and the OAuth2 JWT-bearer token exchange.
//!
//! The payload is the JSON key file downloaded from the Google Cloud console. Only the
//! fields needed to sign an assertion are read; everything else is ignored.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::{ReportError, ReportResult};

pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: Option<String>,
    client_email: String,
    private_key: String,
    private_key_id: Option<String>,
    token_uri: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to sign assertion: {0}")]
    Sign(String),

    #[error("token exchange failed: {0}")]
    Exchange(String),

    #[error("token cache poisoned")]
    Poisoned,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Parsed service-account key plus a cached access token.
pub struct ServiceAccountCredentials {
    client_email: String,
    token_uri: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for ServiceAccountCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountCredentials")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountCredentials {
    /// Parses the key file and loads its RSA key. No network activity.
    pub fn from_json(payload: &[u8]) -> ReportResult<Self> {
        let key: ServiceAccountKey = serde_json::from_slice(payload)
            .map_err(|e| ReportError::Authentication(format!("not a service account key: {e}")))?;

        if let Some(key_type) = key.key_type.as_deref() {
            if key_type != "service_account" {
                return Err(ReportError::Authentication(format!(
                    "expected type 'service_account', found '{key_type}'"
                )));
            }
        }

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| ReportError::Authentication(format!("unusable private_key: {e}")))?;

        info!(action = "load", component = "credentials", client_email = %key.client_email, "Service account credentials loaded");

        Ok(Self {
            client_email: key.client_email,
            token_uri: key.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key_id: key.private_key_id,
            signing_key,
            token: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn claims(&self, now: DateTime<Utc>) -> Claims {
        build_claims(&self.client_email, &self.token_uri, now)
    }

    /// Returns a cached token, or exchanges a fresh signed assertion for one.
    pub fn access_token(&self, http: &reqwest::blocking::Client) -> Result<String, TokenError> {
        let mut cached = self.token.lock().map_err(|_| TokenError::Poisoned)?;

        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.clone());
            }
        }

        debug!(action = "refresh", component = "credentials", token_uri = %self.token_uri, "Exchanging assertion for access token");
        let token = self.exchange(http, now)?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    fn exchange(
        &self,
        http: &reqwest::blocking::Client,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, TokenError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let assertion = jsonwebtoken::encode(&header, &self.claims(now), &self.signing_key)
            .map_err(|e| TokenError::Sign(e.to_string()))?;

        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| TokenError::Exchange(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TokenError::Exchange(format!("{status}: {body}")));
        }

        let body: TokenResponse = response.json().map_err(|e| TokenError::Exchange(e.to_string()))?;
        Ok(AccessToken {
            value: body.access_token,
            expires_at: now + Duration::seconds(body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS)),
        })
    }
}

pub fn build_claims(client_email: &str, token_uri: &str, now: DateTime<Utc>) -> Claims {
    let iat = now.timestamp();
    Claims {
        iss: client_email.to_string(),
        scope: ANALYTICS_READONLY_SCOPE.to_string(),
        aud: token_uri.to_string(),
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    }
}
