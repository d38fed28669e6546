//! Status history ledger. Append-only: the only writer is
//! [`append_status_change`], called from `Database::update_ticket` inside its
//! transaction. Entries disappear only together with their ticket.

use anyhow::Result;
use helpdesk_types::models::TicketStatus;
use rusqlite::{Connection, params};

use crate::Database;
use crate::models::HistoryRow;

pub(crate) fn append_status_change(
    conn: &Connection,
    ticket_id: i64,
    old_status: TicketStatus,
    new_status: TicketStatus,
    changed_by: i64,
    notes: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO ticket_status_history (ticket_id, old_status, new_status, changed_by, notes)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![ticket_id, old_status.as_str(), new_status.as_str(), changed_by, notes],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Entries for a ticket, newest first, each joined with the acting user.
    pub fn get_history(&self, ticket_id: i64) -> Result<Vec<HistoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT h.id, h.ticket_id, h.old_status, h.new_status, h.changed_by,
                        u.username, u.role, h.notes, h.changed_at
                 FROM ticket_status_history h
                 JOIN users u ON h.changed_by = u.id
                 WHERE h.ticket_id = ?1
                 ORDER BY h.changed_at DESC, h.id DESC",
            )?;

            let rows = stmt
                .query_map([ticket_id], |row| {
                    Ok(HistoryRow {
                        id: row.get(0)?,
                        ticket_id: row.get(1)?,
                        old_status: row.get(2)?,
                        new_status: row.get(3)?,
                        changed_by: row.get(4)?,
                        changed_by_username: row.get(5)?,
                        changed_by_role: row.get(6)?,
                        notes: row.get(7)?,
                        changed_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}
