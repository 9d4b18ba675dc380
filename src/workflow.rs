//! End-to-end run: resolve group, fetch inventory, match, confirm, tag.
//!
//! Stages run strictly in order with one request in flight at a time.
//! Early exits (no device members, no matches, dry run, declined prompt)
//! are successful runs that never reach the tagger.

use serde::Serialize;

use crate::confirm::Confirm;
use crate::directory::resolve_group_devices;
use crate::error::{GroupTagError, Result};
use crate::machines::fetch_inventory;
use crate::matcher::match_devices;
use crate::report::RunSummary;
use crate::session::Session;
use crate::tagger::tag_devices;

/// What to do in this run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Object ID of the directory group.
    pub group_id: String,
    /// Tag to add to each matched machine.
    pub tag: String,
    /// Stop after matching; never prompt or write.
    pub dry_run: bool,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The group has no device members.
    NoGroupDevices,
    /// None of the group's devices exist in Defender.
    NoMatches,
    /// `--dry-run` was given.
    DryRun,
    /// The operator did not confirm.
    Declined,
    /// The tagger ran (individual devices may still have failed).
    Tagged,
}

/// Result of a run that did not hit a fatal error.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Where the run stopped.
    pub status: RunStatus,
    /// Matches, per-device outcomes and the hunting filter.
    pub summary: RunSummary,
}

impl RunReport {
    fn new(status: RunStatus, summary: RunSummary) -> Self {
        RunReport { status, summary }
    }
}

/// Runs every stage against an open session. Does not release it.
pub async fn run(
    session: &Session,
    options: &RunOptions,
    confirm: &mut dyn Confirm,
) -> Result<RunReport> {
    let mut summary = RunSummary::new(&options.group_id, &options.tag);

    let members = resolve_group_devices(session.directory(), &options.group_id).await?;
    if members.is_empty() {
        tracing::info!(group_id = %options.group_id, "group has no device members");
        return Ok(RunReport::new(RunStatus::NoGroupDevices, summary));
    }

    let inventory = fetch_inventory(session.defender()).await?;
    let matches = match_devices(&members, &inventory);
    tracing::info!(
        matched = matches.matched.len(),
        unmatched = matches.unmatched.len(),
        "matched group devices to Defender machines"
    );
    summary.matched = matches.matched;
    summary.unmatched = matches.unmatched;

    if summary.matched.is_empty() {
        return Ok(RunReport::new(RunStatus::NoMatches, summary));
    }
    if options.dry_run {
        return Ok(RunReport::new(RunStatus::DryRun, summary));
    }

    let prompt = format!(
        "Add tag '{}' to {} device(s) in Defender for Endpoint?",
        options.tag,
        summary.matched.len()
    );
    if !confirm.confirm(&prompt).map_err(GroupTagError::Prompt)? {
        tracing::info!("operator declined, nothing tagged");
        return Ok(RunReport::new(RunStatus::Declined, summary));
    }

    summary.results = tag_devices(session.defender(), &summary.matched, &options.tag).await;
    Ok(RunReport::new(RunStatus::Tagged, summary))
}

/// Runs the workflow and releases the session afterwards, whether the run
/// succeeded or failed.
pub async fn execute(
    session: Session,
    options: &RunOptions,
    confirm: &mut dyn Confirm,
) -> Result<RunReport> {
    let result = run(&session, options, confirm).await;
    session.close().await;
    result
}

/// Process exit status for a finished run: 0 for any completed run,
/// including early exits, 1 for a fatal error.
pub fn exit_status(result: &Result<RunReport>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
