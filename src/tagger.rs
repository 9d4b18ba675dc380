//! Applies the tag to every matched machine.
//!
//! Each device goes `Pending -> Success | Failure` with exactly one write
//! request. Writes are issued one at a time; a failure is recorded with the
//! full error text and the loop moves on to the next device.

use serde::Serialize;

use crate::client::ApiClient;
use crate::machines::add_machine_tag;
use crate::matcher::MatchedDevice;

/// Outcome of the single tag write for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum TagOutcome {
    /// The tags endpoint accepted the write.
    Success,
    /// The write was rejected or never completed; holds the error text.
    Failure(String),
}

/// A device together with what happened when it was tagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagResult {
    /// The device that was tagged.
    pub device: MatchedDevice,
    /// What the tags endpoint answered.
    pub outcome: TagOutcome,
}

impl TagResult {
    /// `true` when the write succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome == TagOutcome::Success
    }
}

/// Tags each device in order and returns one result per device.
pub async fn tag_devices(client: &ApiClient, devices: &[MatchedDevice], tag: &str) -> Vec<TagResult> {
    let mut results = Vec::with_capacity(devices.len());

    for device in devices {
        let outcome = match add_machine_tag(client, &device.platform_id, tag).await {
            Ok(()) => {
                tracing::info!(device = %device.display_name, machine_id = %device.platform_id, tag, "tagged");
                TagOutcome::Success
            }
            Err(e) => {
                tracing::error!(device = %device.display_name, machine_id = %device.platform_id, error = %e, "tagging failed");
                TagOutcome::Failure(e.to_string())
            }
        };
        results.push(TagResult {
            device: device.clone(),
            outcome,
        });
    }

    results
}
