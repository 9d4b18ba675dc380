//! Group membership lookup against Microsoft Graph.
//!
//! - [`get_group`] — confirm the group exists and is readable.
//! - [`list_group_members`] — every direct member, across all pages.
//! - [`get_device`] — full device object for one member.
//! - [`resolve_group_devices`] — the three above combined: the group's
//!   device members with their display names.
//!
//! Members of other types (users, nested groups, service principals) are
//! dropped without being reported.
//!
//! ## Permissions
//!
//! `GroupMember.Read.All` and `Device.Read.All` (application).

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::{ApiClient, encode_segment};
use crate::error::{GroupTagError, Result};
use crate::paging::collect_pages;

/// `@odata.type` discriminator Graph uses for device members.
pub const DEVICE_ODATA_TYPE: &str = "#microsoft.graph.device";

/// A directory group.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Group object ID.
    pub id: String,
    /// Name shown in the portal; logged only.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A group member as returned by `/groups/{id}/members`. Only the fields
/// needed to pick out devices are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryObject {
    /// Object ID in the directory.
    pub id: String,

    /// Concrete type, e.g. `#microsoft.graph.device` or `#microsoft.graph.user`.
    #[serde(rename = "@odata.type", default)]
    pub odata_type: Option<String>,
}

impl DirectoryObject {
    /// `true` when the member is a device object.
    pub fn is_device(&self) -> bool {
        self.odata_type.as_deref() == Some(DEVICE_ODATA_TYPE)
    }
}

/// A directory device object.
///
/// Reference: <https://learn.microsoft.com/en-us/graph/api/resources/device>
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Directory object ID.
    pub id: String,

    /// Device name; this is what gets compared against Defender's
    /// `computerDnsName`.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A device member of the requested group, ready for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupMember {
    /// Device display name.
    pub display_name: String,
    /// Directory object ID; identifies the member when names repeat.
    pub directory_id: String,
}

/// Looks up a group by object ID.
///
/// # Errors
///
/// - `GroupTagError::GroupNotFound` — 404, or 403 because the application
///   cannot see the group.
/// - `GroupTagError::Api` / `Auth` / `Network` for anything else.
pub async fn get_group(client: &ApiClient, group_id: &str) -> Result<Group> {
    let path = format!("groups/{}", encode_segment(group_id));
    client.get(&path).await.map_err(|e| match e {
        GroupTagError::Api { status, body }
            if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN =>
        {
            GroupTagError::GroupNotFound {
                group_id: group_id.to_string(),
                detail: format!("{status}: {body}"),
            }
        }
        other => other,
    })
}

/// Lists every direct member of a group, following `@odata.nextLink`.
pub async fn list_group_members(
    client: &ApiClient,
    group_id: &str,
) -> Result<Vec<DirectoryObject>> {
    let path = format!("groups/{}/members", encode_segment(group_id));
    collect_pages(client, &path).await
}

/// Retrieves a device by directory object ID.
pub async fn get_device(client: &ApiClient, object_id: &str) -> Result<Device> {
    client
        .get(&format!("devices/{}", encode_segment(object_id)))
        .await
}

/// Returns the device members of `group_id` with their display names, in
/// the order Graph listed them.
///
/// Devices without a display name are skipped with a warning since they
/// can never match an inventory record.
pub async fn resolve_group_devices(client: &ApiClient, group_id: &str) -> Result<Vec<GroupMember>> {
    let group = get_group(client, group_id).await?;
    tracing::info!(
        group_id,
        group_name = group.display_name.as_deref().unwrap_or(""),
        "resolved group"
    );

    let members = list_group_members(client, group_id).await?;
    let total = members.len();

    let mut devices = Vec::new();
    for member in members.iter().filter(|m| m.is_device()) {
        let device = get_device(client, &member.id).await?;
        match device.display_name {
            Some(name) => devices.push(GroupMember {
                display_name: name,
                directory_id: device.id,
            }),
            None => tracing::warn!(object_id = %member.id, "device has no display name, skipping"),
        }
    }

    tracing::info!(members = total, devices = devices.len(), "listed group members");
    Ok(devices)
}
