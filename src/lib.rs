//! Tag Microsoft Defender for Endpoint machines that belong to a Microsoft
//! Entra ID device group.
//!
//! A run reads a group's device members from Microsoft Graph, pages through
//! the Defender machine inventory, joins the two by exact device name, and
//! after operator confirmation adds a tag to every matched machine.
//!
//! # Modules
//!
//! - [`auth`] — OAuth2 client credentials token provider with expiry tracking.
//! - [`client`] — Authenticated HTTP wrapper with one-shot 401 refresh.
//! - [`config`] — Settings from flags, environment and an optional TOML file.
//! - [`confirm`] — Operator confirmation gate.
//! - [`directory`] — Group and device lookups against Microsoft Graph.
//! - [`error`] — Typed error hierarchy (`GroupTagError`).
//! - [`machines`] — Defender machine inventory and the tag endpoint.
//! - [`matcher`] — Name-based join of group members to machines.
//! - [`paging`] — `@odata.nextLink` pagination.
//! - [`report`] — Run summary and advanced-hunting filter.
//! - [`session`] — The per-run pair of authenticated clients.
//! - [`tagger`] — Sequential tag writes with per-device outcomes.
//! - [`workflow`] — The run itself.
//!
//! # Quick Start
//!
//! ```ignore
//! use mde_group_tag::config::{CredentialArgs, FileConfig, Settings};
//! use mde_group_tag::confirm::LineConfirm;
//! use mde_group_tag::session::Session;
//! use mde_group_tag::workflow::{RunOptions, execute};
//!
//! let settings = Settings::resolve(args, FileConfig::default())?;
//! let session = Session::connect(&settings).await?;
//! let options = RunOptions { group_id, tag, dry_run: false };
//! let report = execute(session, &options, &mut LineConfirm::stdio()).await?;
//! println!("{}", report.summary.render());
//! ```

#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod confirm;
pub mod directory;
pub mod error;
pub mod machines;
pub mod matcher;
pub mod paging;
pub mod report;
pub mod session;
pub mod tagger;
pub mod workflow;
