//! Defender for Endpoint machine inventory and tagging.
//!
//! - [`list_machines`] — every machine in the tenant, following
//!   `@odata.nextLink` until the last page.
//! - [`fetch_inventory`] — the same list reduced to the (name, id) pairs
//!   used for matching.
//! - [`add_machine_tag`] — append one tag to one machine.
//!
//! ## Permissions
//!
//! `Machine.Read.All` for listing, `Machine.ReadWrite.All` for tagging.

use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, encode_segment};
use crate::paging::collect_pages;

// ── Response types ─────────────────────────────────────────────────────

/// A machine as returned by the Defender API. Only the fields matching
/// needs are modelled; the rest are ignored.
///
/// Reference: <https://learn.microsoft.com/en-us/defender-endpoint/api/machine>
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Defender machine ID (SHA-1 of the machine identity).
    pub id: String,

    /// Device name as reported by the sensor. Not always fully qualified.
    #[serde(default)]
    pub computer_dns_name: Option<String>,
}

/// A machine reduced to what the matcher needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryDevice {
    /// `computerDnsName`, compared against the group member's name.
    pub dns_name: String,
    /// Defender machine ID.
    pub platform_id: String,
}

// ── Request types ──────────────────────────────────────────────────────

/// Tag operation understood by the tags endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagAction {
    /// Append the tag, leaving existing tags in place.
    Add,
}

/// Request body for `POST /api/machines/{id}/tags`. PascalCase keys.
#[derive(Debug, Serialize)]
pub struct MachineTagRequest<'a> {
    /// The tag text.
    #[serde(rename = "Value")]
    pub value: &'a str,
    /// Always [`TagAction::Add`] here.
    #[serde(rename = "Action")]
    pub action: TagAction,
}

// ── Endpoint functions ─────────────────────────────────────────────────

/// Retrieves every machine visible to the application.
///
/// # Errors
///
/// Any page failure is returned as-is and all earlier pages are dropped.
pub async fn list_machines(client: &ApiClient) -> crate::error::Result<Vec<Machine>> {
    collect_pages(client, "api/machines").await
}

/// Fetches the full inventory as `InventoryDevice`s, in fetched order.
///
/// Machines with no `computerDnsName` are left out. Duplicate names are
/// kept; the matcher decides which one wins.
pub async fn fetch_inventory(client: &ApiClient) -> crate::error::Result<Vec<InventoryDevice>> {
    let machines = list_machines(client).await?;
    let total = machines.len();

    let inventory: Vec<InventoryDevice> = machines
        .into_iter()
        .filter_map(|m| {
            m.computer_dns_name.map(|dns_name| InventoryDevice {
                dns_name,
                platform_id: m.id,
            })
        })
        .collect();

    tracing::info!(machines = total, named = inventory.len(), "fetched machine inventory");
    Ok(inventory)
}

/// Adds `tag` to a machine.
///
/// Any 2xx status counts as success, whatever the body holds (the API
/// normally echoes the updated machine, but a 204 or a partial object is
/// accepted too).
///
/// # Errors
///
/// - `GroupTagError::Api` — e.g. 404 for an unknown machine ID, 403 for a
///   missing `Machine.ReadWrite.All` grant.
/// - `GroupTagError::Auth` / `Network` — token or transport failure.
pub async fn add_machine_tag(
    client: &ApiClient,
    machine_id: &str,
    tag: &str,
) -> crate::error::Result<()> {
    let body = MachineTagRequest {
        value: tag,
        action: TagAction::Add,
    };
    let path = format!("api/machines/{}/tags", encode_segment(machine_id));
    client.post_accepted(&path, &body).await
}
