// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Maps a (channel, external id) pair to a durable contact.

use parley_config::model::ContactsConfig;
use parley_core::{Channel, ParleyError};
use parley_storage::queries::contacts;
use parley_storage::{now_timestamp, CodeFormat, Contact, Database, NewContact};
use tracing::{info, warn};

pub struct ContactResolver {
    db: Database,
    format: CodeFormat,
    default_temperature: String,
}

impl ContactResolver {
    pub fn new(db: Database, config: &ContactsConfig) -> Self {
        Self {
            db,
            format: CodeFormat {
                prefix: config.code_prefix.clone(),
                width: config.code_width,
            },
            default_temperature: config.default_temperature.clone(),
        }
    }

    /// Returns the contact for `(channel, channel_id)`, creating it on first
    /// contact.
    ///
    /// For an existing contact `last_contact_at` is refreshed and a non-empty,
    /// changed `display_name` replaces the stored name. A failure of that
    /// update is logged and the contact as loaded is returned.
    pub async fn resolve(
        &self,
        channel: Channel,
        channel_id: &str,
        display_name: &str,
    ) -> Result<Contact, ParleyError> {
        let now = now_timestamp();
        let new = NewContact {
            channel,
            channel_id: channel_id.to_string(),
            name: display_name.to_string(),
            temperature: self.default_temperature.clone(),
        };
        let (mut contact, created) =
            contacts::create_contact(&self.db, &new, &self.format, &now).await?;

        if created {
            info!(contact_id = contact.id, code = %contact.code, channel = %channel, "contact created");
            return Ok(contact);
        }

        let rename = (!display_name.is_empty() && display_name != contact.name)
            .then_some(display_name);
        match contacts::touch_contact(&self.db, contact.id, rename, &now).await {
            Ok(()) => {
                contact.last_contact_at.clone_from(&now);
                contact.updated_at = now;
                if let Some(name) = rename {
                    contact.name = name.to_string();
                }
            }
            Err(e) => {
                warn!(contact_id = contact.id, error = %e, "failed to refresh contact");
            }
        }
        Ok(contact)
    }
}
