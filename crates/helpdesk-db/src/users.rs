use anyhow::Result;
use helpdesk_types::models::Role;
use rusqlite::Connection;

use crate::models::UserRow;
use crate::{Database, OptionalExt};

impl Database {
    pub fn create_user(&self, username: &str, email: &str, password_hash: &str, role: Role) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password_hash, role) VALUES (?1, ?2, ?3, ?4)",
                (username, email, password_hash, role.as_str()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email = ?1", email))
    }

    /// Login lookup: `identifier` may be either the username or the email.
    pub fn get_user_by_login(&self, identifier: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1 OR email = ?1", identifier))
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
    }
}

/// Unique column a rejected user insert collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserConflict {
    Username,
    Email,
}

/// Recognises the UNIQUE violation behind a failed [`Database::create_user`],
/// e.g. when two registrations race past the existence check.
pub fn user_conflict(err: &anyhow::Error) -> Option<UserConflict> {
    match err.downcast_ref::<rusqlite::Error>()? {
        rusqlite::Error::SqliteFailure(e, Some(msg)) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            if msg.contains("users.username") {
                Some(UserConflict::Username)
            } else if msg.contains("users.email") {
                Some(UserConflict::Email)
            } else {
                None
            }
        }
        _ => None,
    }
}

fn query_user(conn: &Connection, predicate: &str, value: impl rusqlite::ToSql) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {} LIMIT 1", UserRow::COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], UserRow::from_row).optional()
}
