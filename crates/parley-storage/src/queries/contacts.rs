// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact lookup, creation with atomic code allocation, and touch updates.

use parley_core::types::Channel;
use parley_core::ParleyError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{channel_column, CodeFormat, Contact, NewContact};

const CONTACT_COLUMNS: &str = "id, code, channel, channel_id, name, contact_status, temperature, \
     first_contact_at, last_contact_at, last_agent, last_agent_type, notes, created_at, updated_at";

fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        code: row.get(1)?,
        channel: channel_column(2, row.get(2)?)?,
        channel_id: row.get(3)?,
        name: row.get(4)?,
        contact_status: row.get(5)?,
        temperature: row.get(6)?,
        first_contact_at: row.get(7)?,
        last_contact_at: row.get(8)?,
        last_agent: row.get(9)?,
        last_agent_type: row.get(10)?,
        notes: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

fn select_by_channel_id(
    conn: &rusqlite::Connection,
    channel: &str,
    channel_id: &str,
) -> rusqlite::Result<Option<Contact>> {
    conn.query_row(
        &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE channel = ?1 AND channel_id = ?2"),
        params![channel, channel_id],
        row_to_contact,
    )
    .optional()
}

/// Find a contact by exact (channel, channel id).
pub async fn find_by_channel_id(
    db: &Database,
    channel: Channel,
    channel_id: &str,
) -> Result<Option<Contact>, ParleyError> {
    let channel_id = channel_id.to_string();
    db.connection()
        .call(move |conn| select_by_channel_id(conn, channel.as_str(), &channel_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a contact by id.
pub async fn get_contact(db: &Database, id: i64) -> Result<Option<Contact>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id],
                row_to_contact,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List contacts, optionally restricted to one channel, oldest first.
pub async fn list_contacts(
    db: &Database,
    channel: Option<Channel>,
) -> Result<Vec<Contact>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONTACT_COLUMNS} FROM contacts
                 WHERE (?1 IS NULL OR channel = ?1) ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![channel.map(|c| c.as_str())], row_to_contact)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Create a contact unless (channel, channel id) already exists.
///
/// The code sequence is incremented and the row inserted in one transaction.
/// When a concurrent insert for the same pair wins, the transaction is rolled
/// back (releasing the sequence value) and the existing row is returned.
/// The boolean is `true` when this call created the row.
pub async fn create_contact(
    db: &Database,
    new: &NewContact,
    format: &CodeFormat,
    now: &str,
) -> Result<(Contact, bool), ParleyError> {
    let new = new.clone();
    let format = format.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let channel = new.channel.as_str();

            if let Some(existing) = select_by_channel_id(&tx, channel, &new.channel_id)? {
                return Ok((existing, false));
            }

            let sequence: i64 = tx.query_row(
                "UPDATE code_sequences SET value = value + 1 WHERE name = 'contact' RETURNING value",
                [],
                |row| row.get(0),
            )?;
            let code = format.render(sequence);

            let inserted = tx.execute(
                "INSERT INTO contacts (code, channel, channel_id, name, temperature,
                     first_contact_at, last_contact_at, last_agent, last_agent_type,
                     created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, 'AI', 'Bot', ?6, ?6)
                 ON CONFLICT(channel, channel_id) DO NOTHING",
                params![code, channel, new.channel_id, new.name, new.temperature, now],
            )?;

            let contact = select_by_channel_id(&tx, channel, &new.channel_id)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            if inserted == 0 {
                // Dropping the transaction rolls back the sequence increment.
                return Ok((contact, false));
            }
            tx.commit()?;
            Ok((contact, true))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Refresh `last_contact_at`, replacing the name when one is given.
pub async fn touch_contact(
    db: &Database,
    id: i64,
    name: Option<&str>,
    now: &str,
) -> Result<(), ParleyError> {
    let name = name.map(str::to_string);
    let now = now.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts
                 SET last_contact_at = ?2, updated_at = ?2, name = COALESCE(?3, name)
                 WHERE id = ?1",
                params![id, now, name],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    if changed == 0 {
        return Err(ParleyError::not_found("contact", id));
    }
    Ok(())
}

/// Record who last handled the contact (`"AI"`/`"Bot"` or a human agent).
pub async fn set_last_agent(
    db: &Database,
    id: i64,
    agent: &str,
    agent_type: &str,
    now: &str,
) -> Result<(), ParleyError> {
    let agent = agent.to_string();
    let agent_type = agent_type.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET last_agent = ?2, last_agent_type = ?3, updated_at = ?4
                 WHERE id = ?1",
                params![id, agent, agent_type, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
