use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returned when a stored or submitted label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! labelled_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

// -- Enumerations --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Admin,
    System,
}

labelled_enum!(Role, "role", { User => "user", Admin => "admin", System => "system" });

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Ticket status. Any status may follow any other; no transition graph is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    /// Older clients send "in progress" with a space.
    #[serde(alias = "in progress")]
    InProgress,
    Resolved,
    Closed,
}

labelled_enum!(TicketStatus, "status", {
    Open => "open",
    InProgress => "in_progress",
    Resolved => "resolved",
    Closed => "closed",
});

impl TicketStatus {
    /// Audit note recorded when a ticket moves into this status.
    pub fn transition_note(&self) -> &'static str {
        match self {
            Self::Resolved => "Ticket marked as resolved",
            Self::Closed => "Ticket closed",
            Self::InProgress => "Ticket moved to in progress",
            Self::Open => "Status updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

labelled_enum!(Priority, "priority", { Low => "low", Medium => "medium", High => "high" });

/// Framing of a conversation message. Declared by the caller, never derived
/// from the sender's role: system messages have no sender at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Client,
    Admin,
    System,
}

labelled_enum!(MessageType, "message type", { Client => "client", Admin => "admin", System => "system" });

// -- Entities --

/// Account as exposed over the API. The password hash never leaves the db crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Public identity attached to messages, history entries and ticket owners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    /// `None` once the owning account is gone.
    pub user_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub priority: Priority,
    pub response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAssessment {
    pub id: i64,
    pub ticket_id: i64,
    pub summary: String,
    pub priority: Priority,
    pub suggested_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub ticket_id: i64,
    pub old_status: TicketStatus,
    pub new_status: TicketStatus,
    pub changed_by: UserRef,
    pub notes: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub ticket_id: i64,
    pub sender_id: Option<i64>,
    pub sender: Option<UserRef>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// Typed outcome of a triage classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub priority: Priority,
    pub summary: String,
    #[serde(default)]
    pub suggested_response: Option<String>,
}
