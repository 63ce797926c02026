use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::constants::SESSION_SECRET_ENV;
use crate::database::error::Error;
use crate::database::schema::{User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: i32, username: String, role: UserRole) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + Duration::hours(24)).timestamp();

        Self {
            user_id: id,
            username,
            role,
            iat,
            exp,
        }
    }
}

/// The request-scoped caller identity. Handed explicitly into every action
/// that mutates on behalf of a user; never ambient state.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), Error> {
        if !action.authenticate(self) {
            return Err(Error::Forbidden(String::from(
                "You don't have permission to perform this action",
            )));
        }
        Ok(())
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            username: value.username,
            is_admin: value.role == UserRole::Admin,
            role: value.role,
        }
    }
}

fn session_key() -> Hmac<Sha256> {
    let secret = std::env::var(SESSION_SECRET_ENV)
        .unwrap_or_else(|_| String::from("tastebook-dev-secret"));

    Hmac::new_from_slice(secret.as_bytes()).unwrap()
}

pub fn generate_session(user: &User) -> String {
    let claims = JwtSessionData::new(user.id, user.username.to_owned(), user.role.to_owned());

    claims.sign_with_key(&session_key()).unwrap()
}

pub fn verify_session(token: &str) -> Result<JwtSessionData, Error> {
    token
        .verify_with_key(&session_key())
        .map_err(|_| Error::Unauthorized(String::from("Invalid session token")))
        .map(|session: JwtSessionData| {
            let now = Local::now().timestamp();

            if (session.exp - now).is_negative() {
                return Err(Error::Unauthorized(String::from("Session expired")));
            }
            Ok(session)
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: UserRole) -> User {
        User {
            id: 12,
            email: String::from("cook@example.org"),
            username: String::from("cook"),
            first_name: String::from("Kim"),
            last_name: String::from("Cook"),
            password: String::from("$argon2id$hash"),
            role,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_round_trip() {
        let token = generate_session(&user(UserRole::User));
        let session = verify_session(&token).unwrap();
        assert_eq!(session.user_id, 12);
        assert_eq!(session.username, "cook");

        let session = SessionData::from(session);
        assert!(!session.is_admin);
    }

    #[test]
    fn admin_flag_follows_role() {
        let token = generate_session(&user(UserRole::Admin));
        let session = SessionData::from(verify_session(&token).unwrap());
        assert!(session.is_admin);
    }

    #[test]
    fn expired_token_is_rejected() {
        let claims = JwtSessionData {
            user_id: 12,
            username: String::from("cook"),
            role: UserRole::User,
            iat: 0,
            exp: 1,
        };
        let token = claims.sign_with_key(&session_key()).unwrap();
        assert!(verify_session(&token).is_err());
    }

    #[test]
    fn tampered_token_is_rejected() {
        let mut token = generate_session(&user(UserRole::User));
        token.push('x');
        assert!(verify_session(&token).is_err());
    }
}
