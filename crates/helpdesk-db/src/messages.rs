use anyhow::Result;
use helpdesk_types::models::MessageType;
use rusqlite::{Connection, params};

use crate::models::MessageRow;
use crate::{Database, OptionalExt, placeholders};

pub(crate) fn insert_message_row(
    conn: &Connection,
    ticket_id: i64,
    sender_id: Option<i64>,
    message_type: MessageType,
    content: &str,
    is_internal: bool,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO messages (ticket_id, sender_id, message_type, content, is_internal)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![ticket_id, sender_id, message_type.as_str(), content, is_internal],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    let mut stmt = conn.prepare(&format!("{} WHERE m.id = ?1", MessageRow::SELECT))?;
    stmt.query_row([id], MessageRow::from_row).optional()
}

impl Database {
    /// Appends a message to a ticket's conversation.
    /// Returns `None` if the ticket does not exist.
    pub fn insert_message(
        &self,
        ticket_id: i64,
        sender_id: Option<i64>,
        message_type: MessageType,
        content: &str,
        is_internal: bool,
    ) -> Result<Option<MessageRow>> {
        self.with_tx(|tx| {
            let exists = tx
                .query_row("SELECT 1 FROM tickets WHERE id = ?1", [ticket_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }

            let id = insert_message_row(tx, ticket_id, sender_id, message_type, content, is_internal)?;
            query_message(tx, id)
        })
    }

    /// Conversation in insertion order. Internal notes are skipped unless
    /// `include_internal` is set.
    pub fn list_messages(&self, ticket_id: i64, include_internal: bool) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE m.ticket_id = ?1 AND (?2 OR m.is_internal = 0)
                 ORDER BY m.created_at ASC, m.id ASC",
                MessageRow::SELECT
            ))?;

            let rows = stmt
                .query_map(params![ticket_id, include_internal], MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Batch-fetch conversations for a set of tickets, grouped by the caller.
    pub fn get_messages_for_tickets(&self, ticket_ids: &[i64], include_internal: bool) -> Result<Vec<MessageRow>> {
        if ticket_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let internal_filter = if include_internal { "" } else { " AND m.is_internal = 0" };
            let sql = format!(
                "{} WHERE m.ticket_id IN ({}){} ORDER BY m.created_at ASC, m.id ASC",
                MessageRow::SELECT,
                placeholders(ticket_ids.len()),
                internal_filter
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ticket_ids), MessageRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Replaces the content in place; prior content is not kept.
    /// Returns `None` if the message does not exist.
    pub fn update_message_content(&self, id: i64, content: &str) -> Result<Option<MessageRow>> {
        self.with_tx(|tx| {
            let changed = tx.execute("UPDATE messages SET content = ?2 WHERE id = ?1", params![id, content])?;
            if changed == 0 {
                return Ok(None);
            }
            query_message(tx, id)
        })
    }

    /// Returns `false` if there was no such message.
    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(conn.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0))
    }
}
