use serde::{Deserialize, Serialize};

use crate::models::{AiAssessment, Message, MessageType, Priority, Ticket, TicketStatus, User, UserRef};

pub const TITLE_LEN: (usize, usize) = (3, 200);
pub const DESCRIPTION_LEN: (usize, usize) = (10, 5000);
pub const MESSAGE_LEN: (usize, usize) = (1, 10_000);
pub const USERNAME_LEN: (usize, usize) = (3, 32);
pub const EMAIL_LEN: (usize, usize) = (3, 254);
pub const PASSWORD_MIN: usize = 8;

/// Input rejected at the boundary, before anything touches storage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Trims `value` and checks its length in characters against `(min, max)`.
fn bounded(field: &str, value: &str, (min, max): (usize, usize)) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min {
        return Err(ValidationError(format!("{field} must be at least {min} characters long")));
    }
    if len > max {
        return Err(ValidationError(format!("{field} must not exceed {max} characters")));
    }
    Ok(trimmed.to_string())
}

pub fn positive_id(id: i64, what: &str) -> Result<i64, ValidationError> {
    if id < 1 {
        return Err(ValidationError(format!("{what} must be a positive integer")));
    }
    Ok(id)
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn validated(self) -> Result<Self, ValidationError> {
        let username = bounded("Username", &self.username, USERNAME_LEN)?;
        let email = bounded("Email", &self.email, EMAIL_LEN)?;
        if !email.contains('@') {
            return Err(ValidationError("Email must be a valid address".into()));
        }
        if self.password.chars().count() < PASSWORD_MIN {
            return Err(ValidationError(format!(
                "Password must be at least {PASSWORD_MIN} characters long"
            )));
        }
        Ok(Self { username, email, password: self.password })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    /// Username or email.
    #[serde(alias = "username")]
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub token: String,
}

// -- Tickets --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
}

impl CreateTicketRequest {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: bounded("Title", &self.title, TITLE_LEN)?,
            description: bounded("Description", &self.description, DESCRIPTION_LEN)?,
        })
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateTicketRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub response: Option<String>,
}

impl UpdateTicketRequest {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            title: self.title.map(|t| bounded("Title", &t, TITLE_LEN)).transpose()?,
            description: self
                .description
                .map(|d| bounded("Description", &d, DESCRIPTION_LEN))
                .transpose()?,
            ..self
        })
    }
}

/// A ticket together with whatever relations the endpoint loaded.
#[derive(Debug, Serialize)]
pub struct TicketResponse {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub owner: Option<UserRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<AiAssessment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

#[derive(Debug, Serialize)]
pub struct UpdateTicketResponse {
    pub affected: usize,
    pub ticket: Ticket,
}

#[derive(Debug, Serialize)]
pub struct SuggestionResponse {
    pub suggested_response: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusMessage {
    pub message: String,
}

// -- Messages --

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(alias = "ticketId")]
    pub ticket_id: i64,
    pub content: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(default, alias = "isInternal")]
    pub is_internal: bool,
}

impl SendMessageRequest {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self {
            ticket_id: positive_id(self.ticket_id, "Ticket ID")?,
            content: content(&self.content)?,
            ..self
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: String,
}

impl EditMessageRequest {
    pub fn validated(self) -> Result<Self, ValidationError> {
        Ok(Self { content: content(&self.content)? })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageQuery {
    #[serde(default, alias = "includeInternal")]
    pub include_internal: bool,
}

/// Message bodies keep their whitespace. The minimum applies to the trimmed
/// text, the maximum to what is stored.
fn content(value: &str) -> Result<String, ValidationError> {
    let (min, max) = MESSAGE_LEN;
    if value.trim().chars().count() < min {
        return Err(ValidationError(format!("Content must be at least {min} characters long")));
    }
    if value.chars().count() > max {
        return Err(ValidationError(format!("Content must not exceed {max} characters")));
    }
    Ok(value.to_string())
}
