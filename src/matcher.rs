//! Joins directory group members to Defender inventory records by name.
//!
//! The comparison is exact and case-sensitive: `GroupMember::display_name`
//! must equal `InventoryDevice::dns_name` byte for byte. No case folding or
//! domain-suffix stripping is applied, so `web01` will not match
//! `web01.contoso.com`.
//!
//! When several inventory records share a name, the one fetched first is
//! used and the rest are ignored.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::directory::GroupMember;
use crate::machines::InventoryDevice;

/// A group member that has a Defender machine with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedDevice {
    /// The shared name, as listed in the directory.
    pub display_name: String,
    /// Directory object ID of the group member.
    pub directory_id: String,
    /// Defender machine ID the tag is written to.
    pub platform_id: String,
}

/// Result of joining a group against the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    /// Matched members in group order.
    pub matched: Vec<MatchedDevice>,
    /// Names of members with no inventory record, in group order.
    pub unmatched: Vec<String>,
}

/// Matches each member to the first inventory record with an identical name.
///
/// A member whose `directory_id` was already seen is skipped, so no member
/// can appear twice in the output.
pub fn match_devices(members: &[GroupMember], inventory: &[InventoryDevice]) -> MatchReport {
    let mut by_name: HashMap<&str, &InventoryDevice> = HashMap::with_capacity(inventory.len());
    for device in inventory {
        by_name.entry(device.dns_name.as_str()).or_insert(device);
    }

    let mut seen = HashSet::new();
    let mut report = MatchReport::default();

    for member in members {
        if !seen.insert(member.directory_id.as_str()) {
            continue;
        }
        match by_name.get(member.display_name.as_str()) {
            Some(device) => report.matched.push(MatchedDevice {
                display_name: member.display_name.clone(),
                directory_id: member.directory_id.clone(),
                platform_id: device.platform_id.clone(),
            }),
            None => {
                tracing::warn!(device = %member.display_name, "no Defender machine with this name");
                report.unmatched.push(member.display_name.clone());
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> GroupMember {
        GroupMember {
            display_name: name.to_string(),
            directory_id: format!("dir-{name}"),
        }
    }

    fn machine(name: &str, id: &str) -> InventoryDevice {
        InventoryDevice {
            dns_name: name.to_string(),
            platform_id: id.to_string(),
        }
    }

    #[test]
    fn matches_present_names_and_reports_missing() {
        let members = vec![member("web01"), member("web02")];
        let inventory = vec![machine("web01", "id-A"), machine("web03", "id-B")];

        let report = match_devices(&members, &inventory);

        assert_eq!(
            report.matched,
            vec![MatchedDevice {
                display_name: "web01".to_string(),
                directory_id: "dir-web01".to_string(),
                platform_id: "id-A".to_string(),
            }]
        );
        assert_eq!(report.unmatched, vec!["web02"]);
    }

    #[test]
    fn duplicate_inventory_names_resolve_to_first_fetched() {
        let members = vec![member("db01")];
        let inventory = vec![
            machine("db01", "first"),
            machine("db01", "second"),
            machine("db01", "third"),
        ];

        for _ in 0..5 {
            let report = match_devices(&members, &inventory);
            assert_eq!(report.matched.len(), 1);
            assert_eq!(report.matched[0].platform_id, "first");
        }
    }

    #[test]
    fn repeated_member_is_matched_once() {
        let members = vec![member("web01"), member("web01")];
        let inventory = vec![machine("web01", "id-A")];

        let report = match_devices(&members, &inventory);
        assert_eq!(report.matched.len(), 1);
        assert!(report.unmatched.is_empty());
    }

    #[test]
    fn comparison_is_case_sensitive_and_literal() {
        let members = vec![member("WEB01"), member("web02")];
        let inventory = vec![machine("web01", "id-A"), machine("web02.contoso.com", "id-B")];

        let report = match_devices(&members, &inventory);
        assert!(report.matched.is_empty());
        assert_eq!(report.unmatched, vec!["WEB01", "web02"]);
    }

    #[test]
    fn empty_inputs_produce_empty_report() {
        assert_eq!(match_devices(&[], &[]), MatchReport::default());
        let report = match_devices(&[member("a")], &[]);
        assert_eq!(report.unmatched, vec!["a"]);
    }
}
