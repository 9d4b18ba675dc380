//! Run summary and the advanced-hunting filter for the applied tag.

use std::fmt::Write as _;

use serde::Serialize;

use crate::matcher::MatchedDevice;
use crate::tagger::{TagOutcome, TagResult};

/// Advanced-hunting expression that finds devices carrying `tag` from any
/// of the three tag sources. Pasted verbatim into the portal, so the field
/// names and operator casing must not change.
pub fn tag_filter(tag: &str) -> String {
    format!(
        "DeviceDynamicTags contains \"{tag}\" or RegistryDeviceTag contains \"{tag}\" or DeviceManualTags contains \"{tag}\""
    )
}

/// Everything a run produced, for printing or JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Group object ID the run was started with.
    pub group_id: String,
    /// Tag being applied.
    pub tag: String,
    /// Members with a Defender machine of the same name.
    pub matched: Vec<MatchedDevice>,
    /// Names of members with no Defender machine.
    pub unmatched: Vec<String>,
    /// Empty unless the tagger ran.
    pub results: Vec<TagResult>,
    /// Output of [`tag_filter`] for `tag`.
    pub filter: String,
}

impl RunSummary {
    /// Starts an empty summary for one group and tag.
    pub fn new(group_id: &str, tag: &str) -> Self {
        RunSummary {
            group_id: group_id.to_string(),
            tag: tag.to_string(),
            matched: Vec::new(),
            unmatched: Vec::new(),
            results: Vec::new(),
            filter: tag_filter(tag),
        }
    }

    /// Number of devices whose tag write succeeded.
    pub fn tagged(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of devices whose tag write failed.
    pub fn failed(&self) -> usize {
        self.results.len() - self.tagged()
    }

    /// Human-readable report: counts, unmatched names, per-device
    /// failures, then the filter line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Group:     {}", self.group_id);
        let _ = writeln!(out, "Tag:       {}", self.tag);
        let _ = writeln!(out, "Matched:   {}", self.matched.len());
        let _ = writeln!(out, "Unmatched: {}", self.unmatched.len());
        let _ = writeln!(out, "Tagged:    {}", self.tagged());
        let _ = writeln!(out, "Failed:    {}", self.failed());

        if !self.unmatched.is_empty() {
            let _ = writeln!(out, "\nNot found in Defender:");
            for name in &self.unmatched {
                let _ = writeln!(out, "  {name}");
            }
        }

        let failures: Vec<_> = self
            .results
            .iter()
            .filter_map(|r| match &r.outcome {
                TagOutcome::Failure(err) => Some((&r.device.display_name, err)),
                TagOutcome::Success => None,
            })
            .collect();
        if !failures.is_empty() {
            let _ = writeln!(out, "\nFailed to tag:");
            for (name, err) in failures {
                let _ = writeln!(out, "  {name}: {err}");
            }
        }

        let _ = writeln!(out, "\nAdvanced hunting filter:");
        let _ = writeln!(out, "{}", self.filter);
        out
    }
}
