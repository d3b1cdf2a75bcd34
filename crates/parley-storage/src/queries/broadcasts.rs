// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Broadcast templates and run history.

use parley_core::types::Channel;
use parley_core::ParleyError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{BroadcastHistory, BroadcastTemplate, BROADCAST_COMPLETED, BROADCAST_PROCESSING};

const ALL_CHANNELS: &str = "All";

fn row_to_template(row: &rusqlite::Row<'_>) -> rusqlite::Result<BroadcastTemplate> {
    let channel: String = row.get(3)?;
    let channel = match channel.as_str() {
        ALL_CHANNELS => None,
        _ => Some(crate::models::channel_column(3, channel)?),
    };
    Ok(BroadcastTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        content: row.get(2)?,
        channel,
        active: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<BroadcastHistory> {
    Ok(BroadcastHistory {
        id: row.get(0)?,
        template_id: row.get(1)?,
        sent_by: row.get(2)?,
        sent_to: row.get(3)?,
        successful: row.get(4)?,
        failed: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        completed_at: row.get(8)?,
    })
}

/// Create an active template. `channel = None` targets every contact.
pub async fn create_template(
    db: &Database,
    name: &str,
    content: &str,
    channel: Option<Channel>,
    now: &str,
) -> Result<BroadcastTemplate, ParleyError> {
    let name = name.to_string();
    let content = content.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO broadcast_templates (name, content, channel, active, created_at)
                 VALUES (?1, ?2, ?3, 1, ?4)",
                params![
                    name,
                    content,
                    channel.map_or(ALL_CHANNELS, |c| c.as_str()),
                    now
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                "SELECT id, name, content, channel, active, created_at
                 FROM broadcast_templates WHERE id = ?1",
                params![id],
                row_to_template,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a template by id.
pub async fn get_template(
    db: &Database,
    id: i64,
) -> Result<Option<BroadcastTemplate>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name, content, channel, active, created_at
                 FROM broadcast_templates WHERE id = ?1",
                params![id],
                row_to_template,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Start a run: status `Processing` with the recipient count.
pub async fn create_history(
    db: &Database,
    template_id: i64,
    sent_by: &str,
    sent_to: i64,
    now: &str,
) -> Result<i64, ParleyError> {
    let sent_by = sent_by.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO broadcast_history (template_id, sent_by, sent_to, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![template_id, sent_by, sent_to, BROADCAST_PROCESSING, now],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record intermediate counters of a running broadcast.
pub async fn record_progress(
    db: &Database,
    id: i64,
    successful: i64,
    failed: i64,
) -> Result<(), ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE broadcast_history SET successful = ?2, failed = ?3 WHERE id = ?1",
                params![id, successful, failed],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Finish a run with its final counters.
pub async fn complete_history(
    db: &Database,
    id: i64,
    successful: i64,
    failed: i64,
    now: &str,
) -> Result<(), ParleyError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE broadcast_history
                 SET successful = ?2, failed = ?3, status = ?4, completed_at = ?5
                 WHERE id = ?1",
                params![id, successful, failed, BROADCAST_COMPLETED, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a run by id.
pub async fn get_history(
    db: &Database,
    id: i64,
) -> Result<Option<BroadcastHistory>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, template_id, sent_by, sent_to, successful, failed, status,
                     created_at, completed_at
                 FROM broadcast_history WHERE id = ?1",
                params![id],
                row_to_history,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
