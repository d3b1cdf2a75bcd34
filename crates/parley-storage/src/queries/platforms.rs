// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connected platform rows (persisted sender credentials).

use parley_core::types::Channel;
use parley_core::ParleyError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::{channel_column, PlatformRow, PlatformUpsert};

const PLATFORM_COLUMNS: &str =
    "id, platform, platform_id, token, phone_number_id, webhook_url, active, created_at, updated_at";

fn row_to_platform(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlatformRow> {
    Ok(PlatformRow {
        id: row.get(0)?,
        platform: channel_column(1, row.get(1)?)?,
        platform_id: row.get(2)?,
        token: row.get(3)?,
        phone_number_id: row.get(4)?,
        webhook_url: row.get(5)?,
        active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Create or replace the row for `channel`.
pub async fn upsert_platform(
    db: &Database,
    channel: Channel,
    fields: &PlatformUpsert,
    now: &str,
) -> Result<PlatformRow, ParleyError> {
    let fields = fields.clone();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO connected_platforms
                     (platform, platform_id, token, phone_number_id, webhook_url, active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(platform) DO UPDATE SET
                     platform_id = excluded.platform_id,
                     token = excluded.token,
                     phone_number_id = excluded.phone_number_id,
                     webhook_url = excluded.webhook_url,
                     active = excluded.active,
                     updated_at = excluded.updated_at",
                params![
                    channel.as_str(),
                    fields.platform_id,
                    fields.token,
                    fields.phone_number_id,
                    fields.webhook_url,
                    fields.active,
                    now,
                ],
            )?;
            conn.query_row(
                &format!("SELECT {PLATFORM_COLUMNS} FROM connected_platforms WHERE platform = ?1"),
                params![channel.as_str()],
                row_to_platform,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The row for `channel`, if one was ever configured.
pub async fn get_platform(
    db: &Database,
    channel: Channel,
) -> Result<Option<PlatformRow>, ParleyError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {PLATFORM_COLUMNS} FROM connected_platforms WHERE platform = ?1"),
                params![channel.as_str()],
                row_to_platform,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All configured platforms.
pub async fn list_platforms(db: &Database) -> Result<Vec<PlatformRow>, ParleyError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLATFORM_COLUMNS} FROM connected_platforms ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_platform)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let (db, _dir) = setup().await;
        let first = upsert_platform(
            &db,
            Channel::WhatsApp,
            &PlatformUpsert {
                token: Some("t1".into()),
                phone_number_id: Some("100".into()),
                active: true,
                ..Default::default()
            },
            "2026-01-01T00:00:00.000Z",
        )
        .await
        .unwrap();

        let second = upsert_platform(
            &db,
            Channel::WhatsApp,
            &PlatformUpsert {
                token: Some("t2".into()),
                phone_number_id: Some("200".into()),
                active: false,
                ..Default::default()
            },
            "2026-01-02T00:00:00.000Z",
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.token.as_deref(), Some("t2"));
        assert!(!second.active);
        assert_eq!(second.created_at, "2026-01-01T00:00:00.000Z");
        assert_eq!(list_platforms(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn get_missing_platform_is_none() {
        let (db, _dir) = setup().await;
        assert!(get_platform(&db, Channel::Telegram).await.unwrap().is_none());
    }
}
