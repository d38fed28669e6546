//! Database row types. These map directly to SQLite rows.
//! Enum columns stay as text here and are parsed when converting into the
//! helpdesk-types models, so a corrupt row surfaces as an error instead of a panic.

use anyhow::{Context, Result};
use helpdesk_types::models::{
    AiAssessment, Message, StatusHistoryEntry, Ticket, User, UserRef,
};
use rusqlite::Row;

use crate::parse_timestamp;

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    pub(crate) const COLUMNS: &'static str = "id, username, email, password_hash, role, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            role: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn into_model(self) -> Result<User> {
        Ok(User {
            id: self.id,
            role: self.role.parse().with_context(|| format!("user {}", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            username: self.username,
            email: self.email,
        })
    }
}

/// Resolves a LEFT JOINed user into a public identity, if the join matched.
fn user_ref(id: Option<i64>, username: Option<String>, role: Option<String>) -> Result<Option<UserRef>> {
    match (id, username, role) {
        (Some(id), Some(username), Some(role)) => Ok(Some(UserRef {
            id,
            username,
            role: role.parse()?,
        })),
        _ => Ok(None),
    }
}

pub struct TicketRow {
    pub id: i64,
    pub user_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub response: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub owner_username: Option<String>,
    pub owner_role: Option<String>,
}

impl TicketRow {
    pub(crate) const SELECT: &'static str =
        "SELECT t.id, t.user_id, t.title, t.description, t.status, t.priority, t.response,
                t.created_at, t.updated_at, u.username, u.role
         FROM tickets t
         LEFT JOIN users u ON t.user_id = u.id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            status: row.get(4)?,
            priority: row.get(5)?,
            response: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            owner_username: row.get(9)?,
            owner_role: row.get(10)?,
        })
    }

    /// The ticket plus its owner's public identity.
    pub fn into_model(self) -> Result<(Ticket, Option<UserRef>)> {
        let owner = user_ref(self.user_id, self.owner_username, self.owner_role)?;
        let ticket = Ticket {
            id: self.id,
            user_id: self.user_id,
            status: self.status.parse().with_context(|| format!("ticket {}", self.id))?,
            priority: self.priority.parse().with_context(|| format!("ticket {}", self.id))?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            title: self.title,
            description: self.description,
            response: self.response,
        };
        Ok((ticket, owner))
    }
}

pub struct AssessmentRow {
    pub id: i64,
    pub ticket_id: i64,
    pub summary: String,
    pub priority: String,
    pub suggested_response: Option<String>,
    pub created_at: String,
}

impl AssessmentRow {
    pub(crate) const COLUMNS: &'static str =
        "id, ticket_id, summary, priority, suggested_response, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            summary: row.get(2)?,
            priority: row.get(3)?,
            suggested_response: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn into_model(self) -> Result<AiAssessment> {
        Ok(AiAssessment {
            id: self.id,
            ticket_id: self.ticket_id,
            priority: self.priority.parse()?,
            created_at: parse_timestamp(&self.created_at)?,
            summary: self.summary,
            suggested_response: self.suggested_response,
        })
    }
}

pub struct HistoryRow {
    pub id: i64,
    pub ticket_id: i64,
    pub old_status: String,
    pub new_status: String,
    pub changed_by: i64,
    pub changed_by_username: String,
    pub changed_by_role: String,
    pub notes: String,
    pub changed_at: String,
}

impl HistoryRow {
    pub fn into_model(self) -> Result<StatusHistoryEntry> {
        Ok(StatusHistoryEntry {
            id: self.id,
            ticket_id: self.ticket_id,
            old_status: self.old_status.parse()?,
            new_status: self.new_status.parse()?,
            changed_by: UserRef {
                id: self.changed_by,
                username: self.changed_by_username,
                role: self.changed_by_role.parse()?,
            },
            notes: self.notes,
            changed_at: parse_timestamp(&self.changed_at)?,
        })
    }
}

pub struct MessageRow {
    pub id: i64,
    pub ticket_id: i64,
    pub sender_id: Option<i64>,
    pub sender_username: Option<String>,
    pub sender_role: Option<String>,
    pub message_type: String,
    pub content: String,
    pub is_internal: bool,
    pub created_at: String,
}

impl MessageRow {
    pub(crate) const SELECT: &'static str =
        "SELECT m.id, m.ticket_id, m.sender_id, u.username, u.role, m.message_type, m.content,
                m.is_internal, m.created_at
         FROM messages m
         LEFT JOIN users u ON m.sender_id = u.id";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            ticket_id: row.get(1)?,
            sender_id: row.get(2)?,
            sender_username: row.get(3)?,
            sender_role: row.get(4)?,
            message_type: row.get(5)?,
            content: row.get(6)?,
            is_internal: row.get(7)?,
            created_at: row.get(8)?,
        })
    }

    pub fn into_model(self) -> Result<Message> {
        Ok(Message {
            id: self.id,
            ticket_id: self.ticket_id,
            sender: user_ref(self.sender_id, self.sender_username, self.sender_role)?,
            sender_id: self.sender_id,
            message_type: self.message_type.parse()?,
            content: self.content,
            is_internal: self.is_internal,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
