// Supabase access token verification
// Tokens are HS256 with the project's JWT secret; `sub` is the user id.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq)]
pub enum JwtError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token subject is not a user id")]
    InvalidSubject,
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            _ => JwtError::InvalidToken,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseClaims {
    pub sub: String,
    pub exp: u64,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Identity taken from a verified token
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("decoding_key", &"<redacted>")
            .field("audience", &self.validation.aud)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        validation.leeway = 30;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, JwtError> {
        let data = decode::<SupabaseClaims>(token, &self.decoding_key, &self.validation)?;
        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| JwtError::InvalidSubject)?;

        Ok(AuthenticatedUser {
            user_id,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-supabase-jwt-secret-with-32-chars!";

    fn token(sub: &str, aud: &str, exp_offset: i64) -> String {
        let claims = SupabaseClaims {
            sub: sub.to_string(),
            exp: (chrono::Utc::now().timestamp() + exp_offset) as u64,
            aud: Some(aud.to_string()),
            email: Some("a@b.com".to_string()),
            role: Some("authenticated".to_string()),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_yields_user() {
        let verifier = JwtVerifier::new(SECRET, "authenticated");
        let user_id = Uuid::new_v4();

        let user = verifier.verify(&token(&user_id.to_string(), "authenticated", 3600)).unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_rejections() {
        let verifier = JwtVerifier::new(SECRET, "authenticated");
        let user_id = Uuid::new_v4().to_string();

        assert_eq!(
            verifier.verify(&token(&user_id, "authenticated", -3600)),
            Err(JwtError::TokenExpired)
        );
        assert_eq!(
            verifier.verify(&token(&user_id, "anon", 3600)),
            Err(JwtError::InvalidToken)
        );
        assert_eq!(
            verifier.verify(&token("service-role", "authenticated", 3600)),
            Err(JwtError::InvalidSubject)
        );
        assert_eq!(verifier.verify("garbage"), Err(JwtError::InvalidToken));
    }
}
