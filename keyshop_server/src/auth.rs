//! Bearer token verification.
//!
//! Tokens are compact JWTs signed with HS256 using `KSP_AUTH_SECRET`. Issuing them is the job of the account
//! service; this server only verifies them. The claims it relies on are:
//! * `sub` - the user id,
//! * `role` - one of `user`, `admin` or `super` (`user` if absent),
//! * `exp` - expiry as a unix timestamp.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use chrono::Utc;
use hmac::{Hmac, Mac};
use keyshop_engine::db_types::{Role, UserId};
use ksp_common::Secret;
use log::*;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

type HmacSha256 = Hmac<Sha256>;

/// The verified identity of the caller. Handlers receive it by adding a `JwtClaims` argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    pub user_id: UserId,
    pub role: Role,
}

impl JwtClaims {
    pub fn new<S: Into<UserId>>(user_id: S, role: Role) -> Self {
        Self { user_id: user_id.into(), role }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Super)
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let claims = req.extensions().get::<JwtClaims>().cloned().ok_or_else(|| {
            warn!("🔐️ No claims found for {}. Is the route outside the authenticated scope?", req.path());
            ServerError::AuthenticationError(AuthError::MissingToken)
        });
        ready(claims)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct TokenHeader {
    alg: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TokenClaims {
    sub: String,
    #[serde(default)]
    role: Option<Role>,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct TokenVerifier {
    secret: Secret<String>,
}

impl TokenVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self { secret: config.jwt_secret.clone() }
    }

    /// Extracts and verifies the token in an `Authorization: Bearer <token>` header value.
    pub fn verify_header(&self, header: Option<&str>) -> Result<JwtClaims, AuthError> {
        let header = header.ok_or(AuthError::MissingToken)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::PoorlyFormattedToken("Expected 'Bearer <token>'".into()))?;
        self.verify(token)
    }

    pub fn verify(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let parts = token.split('.').collect::<Vec<_>>();
        let [header, claims, signature] = parts.as_slice() else {
            return Err(AuthError::PoorlyFormattedToken("A token has three parts".into()));
        };
        let header: TokenHeader = decode_segment(header)?;
        if header.alg != "HS256" {
            return Err(AuthError::PoorlyFormattedToken(format!("Unsupported algorithm {}", header.alg)));
        }
        let signature = base64::decode_config(signature, base64::URL_SAFE_NO_PAD)
            .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
        let mut mac = HmacSha256::new_from_slice(self.secret.reveal().as_bytes())
            .map_err(|_| AuthError::InvalidSignature)?;
        mac.update(token[..token.len() - parts[2].len() - 1].as_bytes());
        mac.verify_slice(&signature).map_err(|_| {
            debug!("🔐️ Rejected a bearer token with an invalid signature");
            AuthError::InvalidSignature
        })?;
        let claims: TokenClaims = decode_segment(claims)?;
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        if claims.sub.trim().is_empty() {
            return Err(AuthError::PoorlyFormattedToken("The subject is empty".into()));
        }
        let role = claims.role.unwrap_or(Role::User);
        trace!("🔐️ Verified bearer token for {} ({role})", claims.sub);
        Ok(JwtClaims::new(claims.sub, role))
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AuthError> {
    let bytes = base64::decode_config(segment, base64::URL_SAFE_NO_PAD)
        .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))
}

#[cfg(test)]
mod test {
    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::endpoint_tests::helpers::{issue_token, sign_token, TEST_SECRET};

    fn verifier() -> TokenVerifier {
        TokenVerifier::new(&AuthConfig::new(TEST_SECRET))
    }

    #[test]
    fn valid_tokens_yield_claims() {
        let token = issue_token(JwtClaims::new("alice", Role::Admin), Utc::now() + Duration::hours(1));
        let claims = verifier().verify_header(Some(&format!("Bearer {token}"))).unwrap();
        assert_eq!(claims, JwtClaims::new("alice", Role::Admin));
        assert!(claims.is_admin());
    }

    #[test]
    fn role_defaults_to_user() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = sign_token(&json!({ "sub": "bob", "exp": exp }), TEST_SECRET);
        let claims = verifier().verify(&token).unwrap();
        assert_eq!(claims.role, Role::User);
        assert!(!claims.is_admin());
    }

    #[test]
    fn bad_tokens_are_rejected() {
        let v = verifier();
        assert!(matches!(v.verify_header(None), Err(AuthError::MissingToken)));
        assert!(matches!(v.verify_header(Some("Basic abc")), Err(AuthError::PoorlyFormattedToken(_))));
        assert!(matches!(v.verify("abc.def"), Err(AuthError::PoorlyFormattedToken(_))));

        let expired = issue_token(JwtClaims::new("alice", Role::User), Utc::now() - Duration::minutes(1));
        assert!(matches!(v.verify(&expired), Err(AuthError::Expired)));

        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let forged = sign_token(&json!({ "sub": "alice", "role": "super", "exp": exp }), "some-other-secret-value");
        assert!(matches!(v.verify(&forged), Err(AuthError::InvalidSignature)));

        let mut tampered = issue_token(JwtClaims::new("alice", Role::User), Utc::now() + Duration::hours(1));
        let n = tampered.len();
        tampered.replace_range(n - 6..n - 1, "AAAAA");
        assert!(matches!(v.verify(&tampered), Err(AuthError::InvalidSignature)));
    }
}
