//! Service account credentials and OAuth access token acquisition.
//!
//! Loading a key file only parses and validates it. The first API call
//! exchanges a signed JWT assertion for an access token at the key's token
//! endpoint, and the token is cached until shortly before it expires.
use async_trait::async_trait;
use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use log::*;
use reqwest::Client;
use ring::{
    rand::SystemRandom,
    signature::{self, RsaKeyPair},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tokio::sync::Mutex;
use url::Url;

#[cfg(test)]
use mockall::automock;

use crate::error::{Result, UploadError};

/// OAuth scope for managing releases through the publisher API.
pub const ANDROID_PUBLISHER_SCOPE: &str =
    "https://www.googleapis.com/auth/androidpublisher";
/// Token endpoint used when the key file does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Supplies bearer tokens for API requests.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<SecretString>;
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'a str,
    typ: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// A parsed service account key, scoped to a set of OAuth scopes.
pub struct ServiceAccountCredentials {
    client_email: String,
    private_key_id: Option<String>,
    token_uri: Url,
    scopes: Vec<String>,
    key_pair: RsaKeyPair,
}

impl ServiceAccountCredentials {
    /// Load a service account JSON key from `path`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|err| UploadError::credential(path, err))?;
        Self::from_json(&content)
            .map_err(|reason| UploadError::credential(path, reason))
    }

    fn from_json(content: &str) -> std::result::Result<Self, String> {
        let key: ServiceAccountKey = serde_json::from_str(content)
            .map_err(|err| format!("malformed key file: {err}"))?;

        if key.key_type != SERVICE_ACCOUNT_TYPE {
            return Err(format!(
                "expected key type '{SERVICE_ACCOUNT_TYPE}' but found '{}'",
                key.key_type
            ));
        }

        if key.client_email.is_empty() {
            return Err("client_email must not be empty".into());
        }

        let private_key = SecretString::from(key.private_key);
        let pem = pem::parse(private_key.expose_secret())
            .map_err(|err| format!("invalid private key: {err}"))?;

        if pem.tag() != "PRIVATE KEY" {
            return Err(format!(
                "expected a PKCS#8 private key but found '{}'",
                pem.tag()
            ));
        }

        let key_pair = RsaKeyPair::from_pkcs8(pem.contents())
            .map_err(|err| format!("rejected private key: {err}"))?;

        let token_uri = Url::parse(
            key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI),
        )
        .map_err(|err| format!("invalid token_uri: {err}"))?;

        Ok(Self {
            client_email: key.client_email,
            private_key_id: key.private_key_id,
            token_uri,
            scopes: vec![],
            key_pair,
        })
    }

    /// Replace the requested scopes with exactly `scopes`.
    pub fn scoped<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    #[cfg(test)]
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    #[cfg(test)]
    pub fn token_uri(&self) -> &Url {
        &self.token_uri
    }

    /// Build an RS256-signed JWT bearer assertion issued at `issued_at`.
    fn assertion(&self, issued_at: DateTime<Utc>) -> Result<String> {
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.private_key_id.as_deref(),
        };

        let iat = issued_at.timestamp();
        let claims = JwtClaims {
            iss: &self.client_email,
            scope: self.scopes.join(" "),
            aud: self.token_uri.as_str(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let message = format!(
            "{}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );

        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        let rng = SystemRandom::new();
        self.key_pair
            .sign(
                &signature::RSA_PKCS1_SHA256,
                &rng,
                message.as_bytes(),
                &mut signature,
            )
            .map_err(|_| {
                UploadError::remote(
                    "Authentication failed: unable to sign token request",
                )
            })?;

        Ok(format!(
            "{message}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(signature)
        ))
    }
}

struct AccessToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_MARGIN_SECS) < self.expires_at
    }
}

/// Exchanges service account assertions for access tokens, lazily.
pub struct ServiceAccountAuthenticator {
    credentials: ServiceAccountCredentials,
    client: Client,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccountAuthenticator {
    pub fn new(credentials: ServiceAccountCredentials) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            credentials,
            client,
            cached: Mutex::new(None),
        })
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let now = Utc::now();
        let assertion = self.credentials.assertion(now)?;

        debug!(
            "requesting access token for {} from {}",
            self.credentials.client_email, self.credentials.token_uri
        );

        let response = self
            .client
            .post(self.credentials.token_uri.clone())
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|err| {
                UploadError::remote(format!("Authentication failed: {err}"))
            })?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<TokenErrorResponse>(&body)
            {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {description}", err.error),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(UploadError::remote(format!(
                "Authentication failed with status {status}: {reason}"
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|err| {
            UploadError::remote(format!(
                "Authentication failed: invalid token response: {err}"
            ))
        })?;

        let lifetime = token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);

        Ok(AccessToken {
            token: SecretString::from(token.access_token),
            expires_at: now + Duration::seconds(lifetime),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountAuthenticator {
    async fn access_token(&self) -> Result<SecretString> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.is_fresh(Utc::now())
        {
            return Ok(token.token.clone());
        }

        let token = self.fetch_token().await?;
        let secret = token.token.clone();
        *cached = Some(token);
        Ok(secret)
    }
}
