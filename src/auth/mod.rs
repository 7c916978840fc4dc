pub mod handlers;
pub mod session;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::config::AuthConfig;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Default avatar assigned at registration and to guests.
pub const DEFAULT_AVATAR: &str = "/dog-avatar.png";

/// bcrypt work factor for stored password hashes.
const BCRYPT_COST: u32 = 10;

const USER_COLUMNS: &str = "id, username, nickname, email, avatar, points, is_guest";

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        nickname: row.get(2)?,
        email: row.get(3)?,
        avatar: row.get(4)?,
        points: row.get(5)?,
        is_guest: row.get(6)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Create a new account. Fails with Conflict if the username is taken.
pub fn register_user(pool: &DbPool, username: &str, password: &str) -> AppResult<User> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::BadRequest("username is required".into()));
    }
    if password.is_empty() {
        return Err(AppError::BadRequest("password is required".into()));
    }

    let hash = bcrypt::hash(password, BCRYPT_COST)?;
    let id = uuid::Uuid::now_v7().to_string();

    let conn = pool.get()?;
    let result = conn.execute(
        "INSERT INTO users (id, username, password_hash, nickname, avatar) VALUES (?1, ?2, ?3, ?2, ?4)",
        params![id, username, hash, DEFAULT_AVATAR],
    );
    match result {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::Conflict("username already taken".into()));
        }
        Err(e) => return Err(e.into()),
    }

    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        row_to_user,
    )
    .map_err(Into::into)
}

/// Verify credentials. Tracks consecutive failures and locks the account
/// for `lockout_minutes` once `max_login_attempts` is reached; the counter
/// and lock reset on a successful login.
pub fn verify_login(
    pool: &DbPool,
    auth: &AuthConfig,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let row: Option<(String, Option<String>, u32, Option<String>)> = tx
        .query_row(
            "SELECT id, password_hash, login_attempts, lock_until FROM users WHERE username = ?1",
            params![username],
            |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            },
        )
        .optional()?;

    let Some((id, hash, attempts, lock_until)) = row else {
        return Err(AppError::Unauthorized);
    };

    if let Some(until) = lock_until.as_deref().and_then(parse_timestamp) {
        if until > Utc::now() {
            return Err(AppError::Locked(
                "account locked, please try again later".into(),
            ));
        }
    }

    // Guests have no password and cannot log in
    let Some(hash) = hash else {
        return Err(AppError::Unauthorized);
    };

    if !bcrypt::verify(password, &hash)? {
        let attempts = attempts + 1;
        let locked = attempts >= auth.max_login_attempts;
        if locked {
            let until = Utc::now() + Duration::minutes(auth.lockout_minutes);
            tx.execute(
                "UPDATE users SET login_attempts = 0, lock_until = ?1 WHERE id = ?2",
                params![until.to_rfc3339(), id],
            )?;
        } else {
            tx.execute(
                "UPDATE users SET login_attempts = ?1 WHERE id = ?2",
                params![attempts, id],
            )?;
        }
        tx.commit()?;

        return Err(if locked {
            AppError::Locked(format!(
                "too many failed logins, account locked for {} minutes",
                auth.lockout_minutes
            ))
        } else {
            AppError::Unauthorized
        });
    }

    tx.execute(
        "UPDATE users SET login_attempts = 0, lock_until = NULL WHERE id = ?1",
        params![id],
    )?;
    let user = tx.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        row_to_user,
    )?;
    tx.commit()?;

    Ok(user)
}

/// Create a guest identity with a pseudo-random `User` + six-digit username.
/// Guests carry no password; a guest is never promoted in place — registering
/// while guest produces a fresh account.
pub fn create_guest(pool: &DbPool) -> AppResult<User> {
    let conn = pool.get()?;

    for _ in 0..10 {
        let username = generate_guest_name();
        let id = uuid::Uuid::now_v7().to_string();
        let result = conn.execute(
            "INSERT INTO users (id, username, avatar, is_guest) VALUES (?1, ?2, ?3, 1)",
            params![id, username, DEFAULT_AVATAR],
        );
        match result {
            Ok(_) => {
                return conn
                    .query_row(
                        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                        params![id],
                        row_to_user,
                    )
                    .map_err(Into::into);
            }
            Err(e) if is_unique_violation(&e) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(
        "could not allocate a guest username".into(),
    ))
}

pub fn load_user(pool: &DbPool, user_id: &str) -> AppResult<User> {
    let conn = pool.get()?;
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        params![user_id],
        row_to_user,
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

fn generate_guest_name() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    format!("User{}", n)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
