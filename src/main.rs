//! CLI entry point for mde-group-tag.
//!
//! Authenticates to Microsoft Graph and Defender for Endpoint with one app
//! registration, then tags every Defender machine whose name matches a
//! device member of the given Entra ID group.
//!
//! Exit codes:
//! - 0: completed, including runs that had nothing to tag or were declined
//! - 1: runtime error (auth failure, group not found, inventory failure, etc.)
//! - 2: argument validation error (clap handles this automatically)

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use mde_group_tag::config::{CredentialArgs, FileConfig, Settings};
use mde_group_tag::confirm::{AssumeYes, Confirm, LineConfirm};
use mde_group_tag::session::Session;
use mde_group_tag::workflow::{RunOptions, RunReport, RunStatus, execute, exit_status};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Object ID of the Entra ID group whose device members are tagged.
    #[arg(long = "group", value_name = "GROUP_ID")]
    group_id: String,

    /// Tag to add to every matched Defender machine.
    #[arg(long)]
    tag: String,

    /// Entra ID tenant ID.
    #[arg(long, env = "MDE_TENANT_ID")]
    tenant_id: Option<String>,

    /// Application (client) ID of the app registration.
    #[arg(long, env = "MDE_CLIENT_ID")]
    client_id: Option<String>,

    /// Client secret. Prefer MDE_CLIENT_SECRET so the secret stays out of
    /// process listings and shell history.
    #[arg(long, env = "MDE_CLIENT_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// TOML file with tenant, client and endpoint overrides.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tag without asking for confirmation.
    #[arg(long, short = 'y')]
    yes: bool,

    /// Resolve and match only; never prompt or tag.
    #[arg(long, conflicts_with = "yes")]
    dry_run: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn settings(&self) -> mde_group_tag::error::Result<Settings> {
        let file = match &self.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        let args = CredentialArgs {
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.secret.clone(),
        };
        Settings::resolve(args, file)
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            group_id: self.group_id.clone(),
            tag: self.tag.clone(),
            dry_run: self.dry_run,
        }
    }
}

fn print_report(report: &RunReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("Error: failed to serialize summary: {e}"),
        }
        return;
    }

    match report.status {
        RunStatus::NoGroupDevices => println!("The group has no device members. Nothing to tag."),
        RunStatus::NoMatches => println!("No group device was found in Defender. Nothing to tag."),
        RunStatus::DryRun => println!("Dry run: no tags were applied."),
        RunStatus::Declined => println!("Cancelled: no tags were applied."),
        RunStatus::Tagged => {}
    }
    print!("{}", report.summary.render());
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let session = match Session::connect(&settings).await {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(LineConfirm::stdio())
    };

    let result = execute(session, &cli.options(), confirm.as_mut()).await;
    match &result {
        Ok(report) => print_report(report, cli.json),
        Err(e) => eprintln!("Error: {e}"),
    }

    ExitCode::from(exit_status(&result))
}
