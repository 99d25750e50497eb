//! Operator sessions.
//!
//! Login state is an explicit [`Session`] value created here and passed
//! through every mutating service call — there is no process-wide
//! "logged in" flag. The session's username becomes the `actor` column
//! on movement rows and journal events.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            other => Err(anyhow::anyhow!("invalid role: {}", other)),
        }
    }
}

/// One authenticated client session, lifecycle owned by the caller
/// (daemon session map, or the lifetime of a CLI invocation).
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug)]
pub enum AuthError {
    /// Unknown username or wrong password — deliberately indistinct.
    InvalidCredentials,
    Storage(anyhow::Error),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::InvalidCredentials => write!(f, "invalid credentials"),
            AuthError::Storage(e) => write!(f, "storage failure: {e:#}"),
        }
    }
}

impl std::error::Error for AuthError {}

/// Hex SHA-256 of a password. Single standard digest, matching the
/// stored `users.password_sha256` column.
pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify credentials against the users table and mint a session.
pub async fn login(pool: &PgPool, username: &str, password: &str) -> Result<Session, AuthError> {
    let row = sko_db::fetch_user_auth(pool, username)
        .await
        .map_err(AuthError::Storage)?
        .ok_or(AuthError::InvalidCredentials)?;

    if row.password_sha256 != password_digest(password) {
        return Err(AuthError::InvalidCredentials);
    }

    let role = Role::parse(&row.role).map_err(AuthError::Storage)?;

    Ok(Session {
        session_id: Uuid::new_v4(),
        user_id: row.user_id,
        username: row.username,
        role,
        started_at: Utc::now(),
    })
}

/// Create a user with a digested password. Used by `sko db seed-admin`
/// and tests.
pub async fn create_user(
    pool: &PgPool,
    username: &str,
    password: &str,
    full_name: Option<&str>,
    role: Role,
) -> Result<i64> {
    sko_db::insert_user(
        pool,
        &sko_db::NewUser {
            username: username.to_string(),
            password_sha256: password_digest(password),
            full_name: full_name.map(|s| s.to_string()),
            role: role.as_str().to_string(),
        },
    )
    .await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_hex_sha256() {
        // sha256("password123") — fixed vector.
        assert_eq!(
            password_digest("password123"),
            "ef92b778bafe771e89245b89ecbc08a44a4e166c06659911881f383d4473e94f"
        );
    }

    #[test]
    fn role_round_trips() {
        assert_eq!(Role::parse("admin").unwrap(), Role::Admin);
        assert_eq!(Role::parse("staff").unwrap(), Role::Staff);
        assert!(Role::parse("root").is_err());
    }

    #[test]
    fn admin_flag_follows_role() {
        let s = Session {
            session_id: Uuid::new_v4(),
            user_id: 1,
            username: "admin".to_string(),
            role: Role::Admin,
            started_at: Utc::now(),
        };
        assert!(s.is_admin());
    }
}
