//! Auth service - credential boundary
//!
//! Hashes passwords with argon2id and issues HS256 bearer tokens whose
//! subject is the user id. Ledger services never call into this; the
//! transport layer resolves a token to a user id first.

use std::sync::Arc;

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::domain::result::{Error, Result};
use crate::ports::UserRepository;

pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const INVALID_TOKEN: &str = "Invalid or expired token";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Token handed back by a successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt_secret: &[u8], token_ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            users,
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
            validation,
            token_ttl,
        }
    }

    /// PHC-format argon2id hash with a random salt
    pub fn hash_password(password: &str) -> Result<String> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(Error::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Other(format!("Password hashing failed: {}", e)))
    }

    /// `Ok(false)` on mismatch; `Err` only for a malformed stored hash
    pub fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| Error::Other(format!("Stored password hash is invalid: {}", e)))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(Error::Other(format!("Password verification failed: {}", e))),
        }
    }

    /// Exchange credentials for a token.
    ///
    /// Unknown email and wrong password fail identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AccessToken> {
        let user = match self.users.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("login rejected");
                return Err(Error::unauthorized(INVALID_CREDENTIALS));
            }
        };

        if !Self::verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = user.id, "login rejected");
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        let access_token = self.issue_token(user.id)?;
        tracing::info!(user_id = user.id, "issued access token");
        Ok(AccessToken {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    pub fn issue_token(&self, user_id: i64) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::Other(format!("Token encoding failed: {}", e)))
    }

    /// Resolve a token to the id of an existing user
    pub async fn authenticate(&self, token: &str) -> Result<i64> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| Error::unauthorized(INVALID_TOKEN))?;
        let user_id: i64 = data
            .claims
            .sub
            .parse()
            .map_err(|_| Error::unauthorized(INVALID_TOKEN))?;

        if self.users.find_user_by_id(user_id).await?.is_none() {
            return Err(Error::unauthorized(INVALID_TOKEN));
        }
        Ok(user_id)
    }
}
