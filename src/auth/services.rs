use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use super::{
    dto::{AuthResponse, PublicUser},
    jwt::JwtKeys,
    repo_types::User,
};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Password too short")]
    WeakPassword,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Supplied name if non-blank, otherwise the local part of the email.
pub(crate) fn display_name(email: &str, name: Option<&str>) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(n) => n.to_string(),
        None => email.split('@').next().unwrap_or(email).to_string(),
    }
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Signs in an existing user or registers a new one for an unknown email.
/// `email` must already be normalised.
#[instrument(skip(db, password, name))]
pub async fn authenticate(
    db: &PgPool,
    email: &str,
    password: &str,
    name: Option<&str>,
) -> Result<User, AuthError> {
    if let Some(user) = User::find_by_email(db, email).await? {
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AuthError::InvalidPassword);
        }
        info!(user_id = %user.id, "user logged in");
        return Ok(user);
    }

    if password.len() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    let hash = hash_password(password)?;
    let user = User::create(db, email, &display_name(email, name), &hash).await?;
    info!(user_id = %user.id, "user registered");
    Ok(user)
}

pub fn issue_tokens(keys: &JwtKeys, user: User) -> anyhow::Result<AuthResponse> {
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id, user.is_admin)?,
        refresh_token: keys.sign_refresh(user.id)?,
        token_type: "bearer",
        user: PublicUser {
            id: user.id,
            email: user.email,
            name: user.name,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "not-a-valid-hash").is_err());
    }

    #[test]
    fn email_validation() {
        assert!(is_valid_email("ana@example.com"));
        assert!(!is_valid_email("ana@example"));
        assert!(!is_valid_email("ana example@x.io"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn display_name_falls_back_to_local_part() {
        assert_eq!(display_name("ana@example.com", None), "ana");
        assert_eq!(display_name("ana@example.com", Some("   ")), "ana");
        assert_eq!(display_name("ana@example.com", Some(" Ana B ")), "Ana B");
    }

    #[test]
    fn issued_tokens_carry_admin_flag() {
        let keys = JwtKeys::from_config(&crate::config::JwtConfig {
            secret: "s".into(),
            issuer: "i".into(),
            audience: "a".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        });
        let user = User {
            id: uuid::Uuid::new_v4(),
            email: "root@example.com".into(),
            name: "root".into(),
            password_hash: String::new(),
            is_admin: true,
            created_at: time::OffsetDateTime::now_utc(),
        };
        let resp = issue_tokens(&keys, user).unwrap();
        assert_eq!(resp.token_type, "bearer");
        assert!(keys.verify(&resp.access_token).unwrap().adm);
        assert!(keys.verify_refresh(&resp.refresh_token).is_ok());
    }
}
