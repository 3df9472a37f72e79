//! JWT token generation and verification.
//!
//! Access and refresh tokens are signed with separate HS256 secrets, so a
//! leaked access secret cannot mint refresh tokens and vice versa.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::debug;
use uuid::Uuid;

use super::AuthError;
use super::config::SessionConfig;
use crate::models::auth::{TokenClaims, TokenKind};

/// Signing and verification material for one token kind.
struct KeySet {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl KeySet {
    fn new(secret: &str, ttl: Duration, config: &SessionConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        validation.leeway = config.leeway_secs;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }
}

/// Stateless signer/verifier for access and refresh credentials.
pub struct TokenCodec {
    access: KeySet,
    refresh: KeySet,
    issuer: String,
    audience: String,
}

impl TokenCodec {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            access: KeySet::new(
                &config.access_secret,
                Duration::minutes(config.access_ttl_minutes),
                config,
            ),
            refresh: KeySet::new(
                &config.refresh_secret,
                Duration::days(config.refresh_ttl_days),
                config,
            ),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// Sign a short-lived access token for `subject`.
    pub fn sign_access(&self, subject: &Uuid) -> Result<String, AuthError> {
        self.sign(TokenKind::Access, subject).map(|(token, _)| token)
    }

    /// Sign a refresh token for `subject`, returning the token and its `jti`.
    ///
    /// The token is not considered issued until the caller has persisted a
    /// refresh record under the returned `jti`.
    pub fn sign_refresh(&self, subject: &Uuid) -> Result<(String, Uuid), AuthError> {
        self.sign(TokenKind::Refresh, subject)
    }

    pub fn verify_access(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(TokenKind::Access, token)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<TokenClaims, AuthError> {
        self.verify(TokenKind::Refresh, token)
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.access.ttl.num_seconds()
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh.ttl.num_seconds()
    }

    fn keys(&self, kind: TokenKind) -> &KeySet {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign(&self, kind: TokenKind, subject: &Uuid) -> Result<(String, Uuid), AuthError> {
        let now = Utc::now();
        let jti = Uuid::new_v4();
        let claims = TokenClaims {
            sub: subject.to_string(),
            jti: jti.to_string(),
            kind,
            iat: now.timestamp(),
            exp: (now + self.keys(kind).ttl).timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = self.encode_claims(kind, &claims)?;
        Ok((token, jti))
    }

    fn encode_claims(&self, kind: TokenKind, claims: &TokenClaims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.keys(kind).encoding,
        )
        .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenClaims, AuthError> {
        let keys = self.keys(kind);
        let claims = decode::<TokenClaims>(token, &keys.decoding, &keys.validation)
            .map_err(|e| {
                debug!(?kind, error = %e, "token rejected");
                AuthError::InvalidCredential
            })?
            .claims;
        if claims.kind != kind {
            debug!(expected = ?kind, found = ?claims.kind, "token type mismatch");
            return Err(AuthError::InvalidCredential);
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::new("access-secret", "refresh-secret", "askdata", "askdata-web")
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(&config())
    }

    fn claims_expiring_at(kind: TokenKind, subject: &Uuid, exp: i64) -> TokenClaims {
        TokenClaims {
            sub: subject.to_string(),
            jti: Uuid::new_v4().to_string(),
            kind,
            iat: exp - 60,
            exp,
            iss: "askdata".into(),
            aud: "askdata-web".into(),
        }
    }

    #[test]
    fn access_token_carries_subject_and_tag() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let token = codec.sign_access(&subject).unwrap();
        let claims = codec.verify_access(&token).unwrap();
        assert_eq!(claims.sub, subject.to_string());
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.iss, "askdata");
        assert_eq!(claims.aud, "askdata-web");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn refresh_token_returns_embedded_jti() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let (token, jti) = codec.sign_refresh(&subject).unwrap();
        let claims = codec.verify_refresh(&token).unwrap();
        assert_eq!(claims.jti, jti.to_string());
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.exp - claims.iat, 30 * 24 * 3600);
    }

    #[test]
    fn every_token_gets_a_fresh_jti() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let (_, a) = codec.sign_refresh(&subject).unwrap();
        let (_, b) = codec.sign_refresh(&subject).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn kinds_do_not_cross_verify() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let access = codec.sign_access(&subject).unwrap();
        let (refresh, _) = codec.sign_refresh(&subject).unwrap();
        assert!(matches!(
            codec.verify_refresh(&access),
            Err(AuthError::InvalidCredential)
        ));
        assert!(matches!(
            codec.verify_access(&refresh),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn type_tag_is_checked_even_with_the_right_secret() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let exp = Utc::now().timestamp() + 600;
        let mislabeled = codec
            .encode_claims(
                TokenKind::Refresh,
                &claims_expiring_at(TokenKind::Access, &subject, exp),
            )
            .unwrap();
        assert!(matches!(
            codec.verify_refresh(&mislabeled),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn foreign_issuer_or_audience_is_rejected() {
        let subject = Uuid::new_v4();
        let token = codec().sign_access(&subject).unwrap();

        let mut other = config();
        other.issuer = "someone-else".into();
        assert!(TokenCodec::new(&other).verify_access(&token).is_err());

        let mut other = config();
        other.audience = "another-app".into();
        assert!(TokenCodec::new(&other).verify_access(&token).is_err());
    }

    #[test]
    fn expiry_boundary_without_leeway() {
        let codec = codec();
        let subject = Uuid::new_v4();
        let now = Utc::now().timestamp();

        let expired = codec
            .encode_claims(
                TokenKind::Refresh,
                &claims_expiring_at(TokenKind::Refresh, &subject, now - 1),
            )
            .unwrap();
        assert!(matches!(
            codec.verify_refresh(&expired),
            Err(AuthError::InvalidCredential)
        ));

        let live = codec
            .encode_claims(
                TokenKind::Refresh,
                &claims_expiring_at(TokenKind::Refresh, &subject, now + 1),
            )
            .unwrap();
        assert!(codec.verify_refresh(&live).is_ok());
    }

    #[test]
    fn leeway_tolerates_small_skew() {
        let mut cfg = config();
        cfg.leeway_secs = 30;
        let codec = TokenCodec::new(&cfg);
        let subject = Uuid::new_v4();
        let now = Utc::now().timestamp();
        let token = codec
            .encode_claims(
                TokenKind::Access,
                &claims_expiring_at(TokenKind::Access, &subject, now - 1),
            )
            .unwrap();
        assert!(codec.verify_access(&token).is_ok());
    }

    #[test]
    fn flipped_signature_bit_is_rejected() {
        let codec = codec();
        let token = codec.sign_access(&Uuid::new_v4()).unwrap();
        let (head, sig) = token.rsplit_once('.').unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(sig).unwrap();
        raw[0] ^= 0x01;
        let tampered = format!("{head}.{}", URL_SAFE_NO_PAD.encode(raw));
        assert_ne!(tampered, token);
        assert!(matches!(
            codec.verify_access(&tampered),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let codec = codec();
        for junk in ["", "not-a-jwt", "a.b.c", "...."] {
            assert!(matches!(
                codec.verify_access(junk),
                Err(AuthError::InvalidCredential)
            ));
        }
    }
}
