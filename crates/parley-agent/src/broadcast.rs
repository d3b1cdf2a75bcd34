// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template broadcasts to contacts, sent sequentially in a background task.

use std::time::Duration;

use parley_core::{ParleyError, SendOutcome};
use parley_storage::queries::{broadcasts, contacts};
use parley_storage::{now_timestamp, Contact, Database};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::senders::SenderSet;

/// Final counters of a broadcast run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastSummary {
    pub history_id: i64,
    pub successful: i64,
    pub failed: i64,
}

pub struct Broadcaster {
    db: Database,
    senders: SenderSet,
    delay: Duration,
}

/// Fill `{name}` and `{code}` for one contact.
pub fn personalize(template: &str, contact: &Contact) -> String {
    template
        .replace("{name}", &contact.name)
        .replace("{code}", &contact.code)
}

impl Broadcaster {
    pub fn new(db: Database, senders: SenderSet, delay: Duration) -> Self {
        Self { db, senders, delay }
    }

    /// Start a broadcast of `template_id`.
    ///
    /// Recipients are all contacts, or those of the template's channel. The
    /// history row is created before this returns; the sends run in the
    /// returned task. A skipped send (unconfigured platform) counts as
    /// failed.
    pub async fn send_broadcast(
        &self,
        template_id: i64,
        sent_by: &str,
    ) -> Result<(i64, JoinHandle<BroadcastSummary>), ParleyError> {
        let template = broadcasts::get_template(&self.db, template_id)
            .await?
            .ok_or_else(|| ParleyError::not_found("broadcast template", template_id))?;
        if !template.active {
            return Err(ParleyError::InvalidPayload(format!(
                "broadcast template {template_id} is inactive"
            )));
        }

        let recipients = contacts::list_contacts(&self.db, template.channel).await?;
        let history_id = broadcasts::create_history(
            &self.db,
            template_id,
            sent_by,
            recipients.len() as i64,
            &now_timestamp(),
        )
        .await?;
        info!(history_id, template_id, recipients = recipients.len(), "broadcast started");

        let db = self.db.clone();
        let senders = self.senders.clone();
        let delay = self.delay;
        let content = template.content;
        let handle = tokio::spawn(async move {
            let mut successful = 0;
            let mut failed = 0;
            for (i, contact) in recipients.iter().enumerate() {
                if i > 0 && !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let text = personalize(&content, contact);
                match senders.send(contact.channel, &contact.channel_id, &text).await {
                    Ok(SendOutcome::Delivered) => successful += 1,
                    Ok(SendOutcome::Skipped(reason)) => {
                        debug!(contact_id = contact.id, reason = %reason, "broadcast send skipped");
                        failed += 1;
                    }
                    Err(e) => {
                        warn!(contact_id = contact.id, error = %e, "broadcast send failed");
                        failed += 1;
                    }
                }
                if let Err(e) = broadcasts::record_progress(&db, history_id, successful, failed).await
                {
                    warn!(history_id, error = %e, "failed to record broadcast progress");
                }
            }

            if let Err(e) =
                broadcasts::complete_history(&db, history_id, successful, failed, &now_timestamp())
                    .await
            {
                warn!(history_id, error = %e, "failed to complete broadcast history");
            }
            info!(history_id, successful, failed, "broadcast completed");
            BroadcastSummary {
                history_id,
                successful,
                failed,
            }
        });

        Ok((history_id, handle))
    }
}
