//! Identity provider ID token verification
//!
//! ID tokens are RS256 JWTs signed with keys published as a JWKS. Keys are
//! cached for `JWKS_CACHE_TTL_SECS`; an unknown `kid` forces a refresh at most
//! once per `JWKS_MIN_REFRESH_SECS` so a flood of forged tokens cannot turn
//! into a flood of key fetches.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::credential::VerifiedSubject;
use super::issuer::{IdAssertion, IssuerError};
use crate::core::constants::{
    HTTP_CLIENT_TIMEOUT_SECS, ID_TOKEN_ISSUER_PREFIX, JWKS_CACHE_TTL_SECS, JWKS_MIN_REFRESH_SECS,
};

/// Provider user ids are at most 128 characters
const MAX_UID_LENGTH: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default)]
    pub auth_time: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

enum KeySource {
    Remote {
        url: String,
        http_client: reqwest::Client,
    },
    /// Fixed key set, never refreshed
    Static,
}

struct KeyCache {
    keys: JwkSet,
    fetched_at: Option<Instant>,
}

impl KeyCache {
    /// Empty cache, filled on first verification
    fn empty() -> Self {
        Self {
            keys: JwkSet { keys: Vec::new() },
            fetched_at: None,
        }
    }
}

pub struct IdTokenVerifier {
    audience: String,
    issuer: String,
    source: KeySource,
    cache: RwLock<KeyCache>,
}

fn to_decoding_key(jwk: &Jwk) -> Result<DecodingKey, IssuerError> {
    DecodingKey::from_jwk(jwk).map_err(|e| IssuerError::KeySource(e.to_string()))
}

impl IdTokenVerifier {
    /// Verifier that fetches signing keys from `jwks_url`
    pub fn new(project_id: &str, jwks_url: &str) -> Result<Self, IssuerError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_CLIENT_TIMEOUT_SECS))
            .build()
            .map_err(|e| IssuerError::KeySource(e.to_string()))?;

        Ok(Self {
            audience: project_id.to_string(),
            issuer: format!("{ID_TOKEN_ISSUER_PREFIX}{project_id}"),
            source: KeySource::Remote {
                url: jwks_url.to_string(),
                http_client,
            },
            cache: RwLock::new(KeyCache::empty()),
        })
    }

    /// Verifier with a fixed key set
    pub fn with_keys(project_id: &str, keys: JwkSet) -> Self {
        Self {
            audience: project_id.to_string(),
            issuer: format!("{ID_TOKEN_ISSUER_PREFIX}{project_id}"),
            source: KeySource::Static,
            cache: RwLock::new(KeyCache {
                keys,
                fetched_at: Some(Instant::now()),
            }),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<IdAssertion, IssuerError> {
        let header = decode_header(token).map_err(|e| IssuerError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IssuerError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IssuerError::InvalidToken("missing kid".to_string()))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "aud", "iss"]);
        let leeway = validation.leeway as i64;

        let claims = decode::<IdTokenClaims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => IssuerError::Expired,
                _ => IssuerError::InvalidToken(e.to_string()),
            })?
            .claims;

        let now = Utc::now().timestamp();
        if claims.iat > now + leeway {
            return Err(IssuerError::InvalidToken(
                "issued in the future".to_string(),
            ));
        }
        if claims.sub.is_empty() || claims.sub.len() > MAX_UID_LENGTH {
            return Err(IssuerError::InvalidToken("invalid subject".to_string()));
        }
        let email = claims
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| IssuerError::InvalidToken("missing email".to_string()))?;
        let auth_time = claims.auth_time.unwrap_or(claims.iat);
        if auth_time > now + leeway {
            return Err(IssuerError::InvalidToken(
                "auth_time in the future".to_string(),
            ));
        }

        Ok(IdAssertion {
            subject: VerifiedSubject::new(claims.sub.clone(), email),
            name: claims.name.filter(|n| !n.trim().is_empty()),
            picture: claims.picture.filter(|p| !p.trim().is_empty()),
            auth_time,
        })
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, IssuerError> {
        let (cached, fresh, may_force) = {
            let cache = self.cache.read();
            let age = cache.fetched_at.map(|t| t.elapsed());
            (
                cache.keys.find(kid).cloned(),
                age.is_some_and(|a| a < Duration::from_secs(JWKS_CACHE_TTL_SECS)),
                age.is_none_or(|a| a >= Duration::from_secs(JWKS_MIN_REFRESH_SECS)),
            )
        };

        if let (Some(jwk), true) = (&cached, fresh) {
            return to_decoding_key(jwk);
        }

        let remote = matches!(self.source, KeySource::Remote { .. });
        if remote && (!fresh || may_force) {
            if let Err(e) = self.refresh().await {
                return match cached {
                    Some(jwk) => {
                        tracing::warn!(error = %e, "Key refresh failed, using cached signing key");
                        to_decoding_key(&jwk)
                    }
                    None => Err(e),
                };
            }
        }

        let cache = self.cache.read();
        match cache.keys.find(kid) {
            Some(jwk) => to_decoding_key(jwk),
            None => Err(IssuerError::UnknownKey(kid.to_string())),
        }
    }

    async fn refresh(&self) -> Result<(), IssuerError> {
        let KeySource::Remote { url, http_client } = &self.source else {
            return Ok(());
        };

        let response = http_client
            .get(url)
            .send()
            .await
            .map_err(|e| IssuerError::KeySource(e.to_string()))?;
        if !response.status().is_success() {
            return Err(IssuerError::KeySource(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }
        let keys: JwkSet = response
            .json()
            .await
            .map_err(|e| IssuerError::KeySource(e.to_string()))?;

        tracing::debug!(count = keys.keys.len(), "Refreshed ID token signing keys");
        *self.cache.write() = KeyCache {
            keys,
            fetched_at: Some(Instant::now()),
        };
        Ok(())
    }
}

/// Token signing helpers shared by auth tests
#[cfg(test)]
pub(crate) mod test_keys {
    use jsonwebtoken::jwk::JwkSet;
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde_json::json;

    pub const PROJECT_ID: &str = "rintrack-test";
    pub const KID: &str = "test-key-1";

    const PRIVATE_KEY_PEM: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/id_token_test_key.pem"
    ));
    pub const JWKS_JSON: &str = include_str!(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/id_token_test_jwks.json"
    ));

    pub fn jwks() -> JwkSet {
        serde_json::from_str(JWKS_JSON).unwrap()
    }

    pub fn sign(claims: &serde_json::Value, kid: &str) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_rsa_pem(PRIVATE_KEY_PEM.as_bytes()).unwrap();
        encode(&header, claims, &key).unwrap()
    }

    pub fn claims_for(email: &str, auth_age_secs: i64) -> serde_json::Value {
        let now = chrono::Utc::now().timestamp();
        json!({
            "iss": format!("https://securetoken.google.com/{PROJECT_ID}"),
            "aud": PROJECT_ID,
            "sub": format!("uid-{}", email.split('@').next().unwrap_or("x")),
            "iat": now,
            "exp": now + 3600,
            "auth_time": now - auth_age_secs,
            "email": email,
            "name": "Test User",
        })
    }

    /// Fresh ID token for `email`, signed with the fixture key
    pub fn id_token(email: &str) -> String {
        sign(&claims_for(email, 0), KID)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::test_keys::*;
    use super::*;

    fn verifier() -> IdTokenVerifier {
        IdTokenVerifier::with_keys(PROJECT_ID, jwks())
    }

    #[tokio::test]
    async fn test_valid_token() {
        let assertion = verifier()
            .verify(&id_token("Ana@Example.com"))
            .await
            .unwrap();
        assert_eq!(assertion.subject.email, "ana@example.com");
        assert_eq!(assertion.subject.uid, "uid-Ana");
        assert_eq!(assertion.name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn test_wrong_audience_and_issuer() {
        let mut claims = claims_for("ana@example.com", 0);
        claims["aud"] = json!("someone-else");
        assert!(matches!(
            verifier().verify(&sign(&claims, KID)).await,
            Err(IssuerError::InvalidToken(_))
        ));

        let mut claims = claims_for("ana@example.com", 0);
        claims["iss"] = json!("https://securetoken.google.com/someone-else");
        assert!(matches!(
            verifier().verify(&sign(&claims, KID)).await,
            Err(IssuerError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let mut claims = claims_for("ana@example.com", 7200);
        let now = chrono::Utc::now().timestamp();
        claims["iat"] = json!(now - 7200);
        claims["exp"] = json!(now - 3600);
        assert!(matches!(
            verifier().verify(&sign(&claims, KID)).await,
            Err(IssuerError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_missing_email_and_unknown_kid() {
        let mut claims = claims_for("ana@example.com", 0);
        claims.as_object_mut().unwrap().remove("email");
        assert!(matches!(
            verifier().verify(&sign(&claims, KID)).await,
            Err(IssuerError::InvalidToken(_))
        ));

        let token = sign(&claims_for("ana@example.com", 0), "rotated-away");
        assert!(matches!(
            verifier().verify(&token).await,
            Err(IssuerError::UnknownKey(kid)) if kid == "rotated-away"
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_rs256() {
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &claims_for("ana@example.com", 0),
            &jsonwebtoken::EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert!(matches!(
            verifier().verify(&token).await,
            Err(IssuerError::InvalidToken(_))
        ));
        assert!(verifier().verify("").await.is_err());
    }

    #[tokio::test]
    async fn test_remote_verifier_starts_empty() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(JWKS_JSON);
            })
            .await;

        let verifier = IdTokenVerifier::new(PROJECT_ID, &server.url("/jwks")).unwrap();
        {
            let cache = verifier.cache.read();
            assert!(cache.keys.keys.is_empty());
            assert!(cache.fetched_at.is_none());
        }
        mock.assert_hits_async(0).await;

        verifier.verify(&id_token("ana@example.com")).await.unwrap();
        mock.assert_hits_async(1).await;
        assert!(verifier.cache.read().fetched_at.is_some());
    }

    #[tokio::test]
    async fn test_remote_keys_are_cached() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(JWKS_JSON);
            })
            .await;

        let verifier = IdTokenVerifier::new(PROJECT_ID, &server.url("/jwks")).unwrap();
        verifier.verify(&id_token("ana@example.com")).await.unwrap();
        verifier.verify(&id_token("bo@example.com")).await.unwrap();

        // Unknown kid right after a fetch does not force another one
        let stranger = sign(&claims_for("ana@example.com", 0), "unknown-kid");
        assert!(matches!(
            verifier.verify(&stranger).await,
            Err(IssuerError::UnknownKey(_))
        ));

        mock.assert_hits_async(1).await;
    }

    #[tokio::test]
    async fn test_key_source_failure_is_internal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/jwks");
                then.status(503);
            })
            .await;

        let verifier = IdTokenVerifier::new(PROJECT_ID, &server.url("/jwks")).unwrap();
        let err = verifier
            .verify(&id_token("ana@example.com"))
            .await
            .unwrap_err();
        assert!(err.is_internal());
    }
}
