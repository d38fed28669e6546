use anyhow::Result;
use helpdesk_types::api::UpdateTicketRequest;
use helpdesk_types::models::{MessageType, TicketStatus, TriageResult};
use rusqlite::{Connection, params};
use tracing::debug;

use crate::history::append_status_change;
use crate::messages::insert_message_row;
use crate::models::{AssessmentRow, TicketRow};
use crate::{Database, NOW, OptionalExt, placeholders};

impl Database {
    /// Persists a freshly triaged ticket in one transaction: the ticket itself
    /// (status open, priority from triage), its assessment, a client message
    /// mirroring the description and a sender-less acknowledgment.
    pub fn create_ticket(
        &self,
        owner_id: i64,
        title: &str,
        description: &str,
        triage: &TriageResult,
        acknowledgment: impl FnOnce(i64) -> String,
    ) -> Result<TicketRow> {
        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO tickets (user_id, title, description, status, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    owner_id,
                    title,
                    description,
                    TicketStatus::Open.as_str(),
                    triage.priority.as_str()
                ],
            )?;
            let ticket_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO ai_assessments (ticket_id, summary, priority, suggested_response)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    ticket_id,
                    triage.summary,
                    triage.priority.as_str(),
                    triage.suggested_response
                ],
            )?;

            insert_message_row(tx, ticket_id, Some(owner_id), MessageType::Client, description, false)?;
            insert_message_row(
                tx,
                ticket_id,
                None,
                MessageType::Admin,
                &acknowledgment(ticket_id),
                false,
            )?;

            debug!(ticket_id, "ticket rows inserted");
            query_ticket(tx, ticket_id)?
                .ok_or_else(|| anyhow::anyhow!("Ticket {} vanished inside its own transaction", ticket_id))
        })
    }

    /// All tickets when `owner` is `None`, otherwise only that user's.
    pub fn list_tickets(&self, owner: Option<i64>) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let rows = match owner {
                Some(user_id) => {
                    let mut stmt =
                        conn.prepare(&format!("{} WHERE t.user_id = ?1 ORDER BY t.id", TicketRow::SELECT))?;
                    let rows = stmt
                        .query_map([user_id], TicketRow::from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!("{} ORDER BY t.id", TicketRow::SELECT))?;
                    let rows = stmt
                        .query_map([], TicketRow::from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    pub fn get_ticket(&self, id: i64) -> Result<Option<TicketRow>> {
        self.with_conn(|conn| query_ticket(conn, id))
    }

    /// Applies a partial update. When the status changes and the acting user is
    /// known, the transition is appended to the history ledger before the
    /// ticket row is written. Returns `None` if the ticket does not exist.
    pub fn update_ticket(
        &self,
        id: i64,
        changes: &UpdateTicketRequest,
        acting_user: Option<i64>,
    ) -> Result<Option<TicketRow>> {
        self.with_tx(|tx| {
            let current: Option<String> = tx
                .query_row("SELECT status FROM tickets WHERE id = ?1", [id], |row| row.get(0))
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };
            let current: TicketStatus = current.parse()?;

            if let (Some(new_status), Some(user_id)) = (changes.status, acting_user) {
                if new_status != current {
                    append_status_change(tx, id, current, new_status, user_id, new_status.transition_note())?;
                }
            }

            tx.execute(
                &format!(
                    "UPDATE tickets SET
                        title = COALESCE(?2, title),
                        description = COALESCE(?3, description),
                        status = COALESCE(?4, status),
                        priority = COALESCE(?5, priority),
                        response = COALESCE(?6, response),
                        updated_at = {NOW}
                     WHERE id = ?1"
                ),
                params![
                    id,
                    changes.title,
                    changes.description,
                    changes.status.map(|s| s.as_str()),
                    changes.priority.map(|p| p.as_str()),
                    changes.response,
                ],
            )?;

            query_ticket(tx, id)
        })
    }

    /// Removes a ticket and everything it owns in one transaction:
    /// assessment, messages, history entries, then the ticket row.
    /// Returns `false` if there was no such ticket.
    pub fn delete_ticket(&self, id: i64) -> Result<bool> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM ai_assessments WHERE ticket_id = ?1", [id])?;
            tx.execute("DELETE FROM messages WHERE ticket_id = ?1", [id])?;
            tx.execute("DELETE FROM ticket_status_history WHERE ticket_id = ?1", [id])?;
            let removed = tx.execute("DELETE FROM tickets WHERE id = ?1", [id])?;
            Ok(removed > 0)
        })
    }

    pub fn get_assessment(&self, ticket_id: i64) -> Result<Option<AssessmentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM ai_assessments WHERE ticket_id = ?1",
                AssessmentRow::COLUMNS
            ))?;
            stmt.query_row([ticket_id], AssessmentRow::from_row).optional()
        })
    }

    /// Batch-fetch assessments for a set of tickets.
    pub fn get_assessments_for_tickets(&self, ticket_ids: &[i64]) -> Result<Vec<AssessmentRow>> {
        if ticket_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM ai_assessments WHERE ticket_id IN ({})",
                AssessmentRow::COLUMNS,
                placeholders(ticket_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(ticket_ids), AssessmentRow::from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

pub(crate) fn query_ticket(conn: &Connection, id: i64) -> Result<Option<TicketRow>> {
    let mut stmt = conn.prepare(&format!("{} WHERE t.id = ?1", TicketRow::SELECT))?;
    stmt.query_row([id], TicketRow::from_row).optional()
}
