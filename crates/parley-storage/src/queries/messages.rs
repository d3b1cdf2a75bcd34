// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation leg persistence, workflow updates, and aggregate stats.

use parley_core::types::MessageStatus;
use parley_core::ParleyError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{channel_column, ChatStats, ConversationMessage, NewMessage};

const MESSAGE_COLUMNS: &str = "id, contact_id, contact_name, message, response, channel, status, \
     assigned_to, assigned_agent, labels, tokens_used, created_at, updated_at";

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationMessage> {
    let status: String = row.get(6)?;
    Ok(ConversationMessage {
        id: row.get(0)?,
        contact_id: row.get(1)?,
        contact_name: row.get(2)?,
        message: row.get(3)?,
        response: row.get(4)?,
        channel: channel_column(5, row.get(5)?)?,
        status: MessageStatus::from_str_value(&status),
        assigned_to: row.get(7)?,
        assigned_agent: row.get(8)?,
        labels: row.get(9)?,
        tokens_used: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Append a conversation leg and return its id.
pub async fn insert_message(
    db: &Database,
    msg: &NewMessage,
    now: &str,
) -> Result<i64, ParleyError> {
    let msg = msg.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversation_messages (contact_id, contact_name, message, response,
                     channel, status, assigned_to, assigned_agent, tokens_used, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    msg.contact_id,
                    msg.contact_name,
                    msg.message,
                    msg.response,
                    msg.channel.as_str(),
                    msg.status.as_str(),
                    msg.assigned_to,
                    msg.assigned_agent,
                    msg.tokens_used,
                    now,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a conversation leg by id.
pub async fn get_message(
    db: &Database,
    id: i64,
) -> Result<Option<ConversationMessage>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM conversation_messages WHERE id = ?1"),
                params![id],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All legs of a contact, newest first.
pub async fn list_for_contact(
    db: &Database,
    contact_id: i64,
) -> Result<Vec<ConversationMessage>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM conversation_messages
                 WHERE contact_id = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![contact_id], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All legs with the given workflow status, newest first.
pub async fn list_by_status(
    db: &Database,
    status: MessageStatus,
) -> Result<Vec<ConversationMessage>, ParleyError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM conversation_messages
                 WHERE status = ?1 ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map(params![status.as_str()], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set status and ownership. Returns `false` when the id does not exist.
pub async fn update_assignment(
    db: &Database,
    id: i64,
    status: MessageStatus,
    assigned_to: &str,
    assigned_agent: &str,
    now: &str,
) -> Result<bool, ParleyError> {
    let assigned_to = assigned_to.to_string();
    let assigned_agent = assigned_agent.to_string();
    let now = now.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversation_messages
                 SET status = ?2, assigned_to = ?3, assigned_agent = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![id, status.as_str(), assigned_to, assigned_agent, now],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed > 0)
}

/// Set only the status. Returns `false` when the id does not exist.
pub async fn set_status(
    db: &Database,
    id: i64,
    status: MessageStatus,
    now: &str,
) -> Result<bool, ParleyError> {
    let now = now.to_string();
    let changed = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversation_messages SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), now],
            )
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(changed > 0)
}

/// Add `label` to the comma-separated label list unless already present.
///
/// Returns the resulting list, or `None` when the id does not exist.
pub async fn add_label(
    db: &Database,
    id: i64,
    label: &str,
    now: &str,
) -> Result<Option<String>, ParleyError> {
    let label = label.trim().to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<String> = tx
                .query_row(
                    "SELECT labels FROM conversation_messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(None);
            };

            let merged = merge_label(&current, &label);
            if merged != current {
                tx.execute(
                    "UPDATE conversation_messages SET labels = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, merged, now],
                )?;
                tx.commit()?;
            }
            Ok(Some(merged))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn merge_label(current: &str, label: &str) -> String {
    let mut labels: Vec<&str> = current
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if !label.is_empty() && !labels.contains(&label) {
        labels.push(label);
    }
    labels.join(",")
}

/// Counters by workflow status and by channel, plus total tokens.
pub async fn chat_stats(db: &Database) -> Result<ChatStats, ParleyError> {
    db.connection()
        .call(|conn| {
            conn.query_row(
                "SELECT
                     COALESCE(SUM(status = 'Unassigned'), 0),
                     COALESCE(SUM(status = 'Assigned'), 0),
                     COALESCE(SUM(status = 'Resolved'), 0),
                     COALESCE(SUM(channel = 'WhatsApp'), 0),
                     COALESCE(SUM(channel = 'Instagram'), 0),
                     COALESCE(SUM(channel = 'Telegram'), 0),
                     COALESCE(SUM(tokens_used), 0)
                 FROM conversation_messages",
                [],
                |row| {
                    let unassigned: i64 = row.get(0)?;
                    let assigned: i64 = row.get(1)?;
                    let resolved: i64 = row.get(2)?;
                    Ok(ChatStats {
                        unassigned,
                        assigned,
                        resolved,
                        total: unassigned + assigned + resolved,
                        whatsapp: row.get(3)?,
                        instagram: row.get(4)?,
                        telegram: row.get(5)?,
                        total_tokens: row.get(6)?,
                    })
                },
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CodeFormat, NewContact};
    use crate::queries::contacts::create_contact;
    use parley_core::types::Channel;
    use tempfile::tempdir;

    const T0: &str = "2026-01-01T00:00:00.000Z";

    async fn setup_db_with_contact() -> (Database, i64, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        let (contact, _) = create_contact(
            &db,
            &NewContact {
                channel: Channel::WhatsApp,
                channel_id: "15550001".into(),
                name: "Ana".into(),
                temperature: "Warm".into(),
            },
            &CodeFormat::default(),
            T0,
        )
        .await
        .unwrap();
        (db, contact.id, dir)
    }

    fn inbound(contact_id: i64, text: &str) -> NewMessage {
        NewMessage {
            contact_id,
            contact_name: "Ana".into(),
            message: text.into(),
            response: None,
            channel: Channel::WhatsApp,
            status: MessageStatus::Unassigned,
            assigned_to: None,
            assigned_agent: None,
            tokens_used: 0,
        }
    }

    #[tokio::test]
    async fn insert_and_list_newest_first() {
        let (db, contact_id, _dir) = setup_db_with_contact().await;
        let first = insert_message(&db, &inbound(contact_id, "hi"), T0).await.unwrap();
        let second = insert_message(&db, &inbound(contact_id, "again"), T0).await.unwrap();

        let legs = list_for_contact(&db, contact_id).await.unwrap();
        assert_eq!(legs.len(), 2);
        assert_eq!(legs[0].id, second);
        assert_eq!(legs[1].id, first);
        assert_eq!(legs[1].status, MessageStatus::Unassigned);
        assert_eq!(legs[1].response, None);
    }

    #[tokio::test]
    async fn insert_requires_existing_contact() {
        let (db, _contact_id, _dir) = setup_db_with_contact().await;
        assert!(insert_message(&db, &inbound(999, "orphan"), T0).await.is_err());
    }

    #[tokio::test]
    async fn assignment_and_status_updates() {
        let (db, contact_id, _dir) = setup_db_with_contact().await;
        let id = insert_message(&db, &inbound(contact_id, "help"), T0).await.unwrap();

        assert!(update_assignment(&db, id, MessageStatus::Assigned, "Human", "Maria", T0)
            .await
            .unwrap());
        let leg = get_message(&db, id).await.unwrap().unwrap();
        assert_eq!(leg.status, MessageStatus::Assigned);
        assert_eq!(leg.assigned_agent.as_deref(), Some("Maria"));

        assert!(set_status(&db, id, MessageStatus::Resolved, T0).await.unwrap());
        assert!(!set_status(&db, 404, MessageStatus::Resolved, T0).await.unwrap());
        assert_eq!(
            list_by_status(&db, MessageStatus::Resolved).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn labels_are_deduplicated() {
        let (db, contact_id, _dir) = setup_db_with_contact().await;
        let id = insert_message(&db, &inbound(contact_id, "x"), T0).await.unwrap();

        assert_eq!(add_label(&db, id, "7", T0).await.unwrap().as_deref(), Some("7"));
        assert_eq!(add_label(&db, id, " 9 ", T0).await.unwrap().as_deref(), Some("7,9"));
        assert_eq!(add_label(&db, id, "7", T0).await.unwrap().as_deref(), Some("7,9"));
        assert_eq!(add_label(&db, 404, "7", T0).await.unwrap(), None);
    }

    #[test]
    fn merge_label_trims_existing_entries() {
        assert_eq!(merge_label(" 1 , 2", "2"), "1,2");
        assert_eq!(merge_label("", "3"), "3");
        assert_eq!(merge_label("4", ""), "4");
    }

    #[tokio::test]
    async fn stats_count_status_channel_and_tokens() {
        let (db, contact_id, _dir) = setup_db_with_contact().await;
        insert_message(&db, &inbound(contact_id, "a"), T0).await.unwrap();
        let mut answered = inbound(contact_id, "a");
        answered.response = Some("b".into());
        answered.status = MessageStatus::Answered;
        answered.tokens_used = 42;
        insert_message(&db, &answered, T0).await.unwrap();
        let resolved = insert_message(&db, &inbound(contact_id, "c"), T0).await.unwrap();
        set_status(&db, resolved, MessageStatus::Resolved, T0).await.unwrap();

        let stats = chat_stats(&db).await.unwrap();
        assert_eq!(stats.unassigned, 1);
        assert_eq!(stats.assigned, 0);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.whatsapp, 3);
        assert_eq!(stats.instagram, 0);
        assert_eq!(stats.total_tokens, 42);
    }

    #[tokio::test]
    async fn stats_on_empty_log_are_zero() {
        let (db, _contact_id, _dir) = setup_db_with_contact().await;
        assert_eq!(chat_stats(&db).await.unwrap(), ChatStats::default());
    }
}
