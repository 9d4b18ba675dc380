//! End-to-end tests for the group-to-tag workflow using wiremock.
//!
//! One mock server stands in for both APIs: Graph lives under `/graph/`,
//! Defender under `/api/`. Each test checks which calls were (and were not)
//! made through wiremock's `expect` verification, which runs when the
//! server is dropped.

use std::io::{self, Cursor};

use mde_group_tag::auth::TokenProvider;
use mde_group_tag::client::ApiClient;
use mde_group_tag::confirm::{AssumeYes, Confirm, LineConfirm};
use mde_group_tag::error::GroupTagError;
use mde_group_tag::report::tag_filter;
use mde_group_tag::session::Session;
use mde_group_tag::tagger::TagOutcome;
use mde_group_tag::workflow::{RunOptions, RunStatus, execute, exit_status, run};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GROUP: &str = "grp-finance";
const TAG: &str = "Finance";

fn session(server: &MockServer) -> Session {
    let client = |base: String| ApiClient::new(TokenProvider::with_token("mock-token"), &base).unwrap();
    Session::new(
        client(format!("{}/graph/", server.uri())),
        client(format!("{}/", server.uri())),
    )
}

fn options() -> RunOptions {
    RunOptions {
        group_id: GROUP.to_string(),
        tag: TAG.to_string(),
        dry_run: false,
    }
}

/// Fails the test if the workflow asks for confirmation.
struct NeverAsked;

impl Confirm for NeverAsked {
    fn confirm(&mut self, prompt: &str) -> io::Result<bool> {
        panic!("unexpected confirmation prompt: {prompt}");
    }
}

fn answering(answer: &'static str) -> LineConfirm<Cursor<&'static [u8]>, io::Sink> {
    LineConfirm::new(Cursor::new(answer.as_bytes()), io::sink())
}

/// Mounts a group whose device members have the given names. Object IDs
/// are `obj-<name>`.
async fn mount_group_devices(server: &MockServer, names: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("graph/groups/{GROUP}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": GROUP,
            "displayName": "Finance devices"
        })))
        .mount(server)
        .await;

    let members: Vec<_> = names
        .iter()
        .map(|n| serde_json::json!({"@odata.type": "#microsoft.graph.device", "id": format!("obj-{n}")}))
        .chain(std::iter::once(
            serde_json::json!({"@odata.type": "#microsoft.graph.user", "id": "user-1"}),
        ))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("graph/groups/{GROUP}/members")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": members})))
        .mount(server)
        .await;

    for name in names {
        Mock::given(method("GET"))
            .and(path(format!("graph/devices/obj-{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": format!("obj-{name}"),
                "displayName": name
            })))
            .mount(server)
            .await;
    }
}

/// Mounts a single-page Defender inventory of (dns name, machine id) pairs.
async fn mount_inventory(server: &MockServer, machines: &[(&str, &str)]) {
    let value: Vec<_> = machines
        .iter()
        .map(|(name, id)| serde_json::json!({"id": id, "computerDnsName": name}))
        .collect();
    Mock::given(method("GET"))
        .and(path("api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": value})))
        .mount(server)
        .await;
}

async fn mount_tag(server: &MockServer, machine_id: &str, status: u16, times: u64) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": machine_id,
            "machineTags": [TAG]
        }))
    } else {
        ResponseTemplate::new(status).set_body_json(serde_json::json!({
            "error": {"code": "ResourceNotFound", "message": format!("Machine {machine_id} was not found")}
        }))
    };
    Mock::given(method("POST"))
        .and(path(format!("api/machines/{machine_id}/tags")))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

// ── Tagging ────────────────────────────────────────────────────────────

#[tokio::test]
async fn confirmed_run_tags_matches_and_isolates_failures() {
    let server = MockServer::start().await;
    mount_group_devices(&server, &["web01", "web02", "web09"]).await;
    mount_inventory(&server, &[("web01", "id-A"), ("web02", "id-B"), ("web03", "id-C")]).await;
    mount_tag(&server, "id-A", 200, 1).await;
    mount_tag(&server, "id-B", 404, 1).await;
    mount_tag(&server, "id-C", 200, 0).await;

    let result = execute(session(&server), &options(), &mut answering("y\n")).await;
    assert_eq!(exit_status(&result), 0);

    let report = result.unwrap();
    assert_eq!(report.status, RunStatus::Tagged);

    let summary = &report.summary;
    assert_eq!(summary.matched.len(), 2);
    assert_eq!(summary.unmatched, vec!["web09"]);
    assert_eq!(summary.tagged(), 1);
    assert_eq!(summary.failed(), 1);

    assert_eq!(summary.results[0].device.display_name, "web01");
    assert_eq!(summary.results[0].outcome, TagOutcome::Success);
    assert_eq!(summary.results[1].device.display_name, "web02");
    match &summary.results[1].outcome {
        TagOutcome::Failure(detail) => assert!(detail.contains("Machine id-B was not found")),
        TagOutcome::Success => panic!("second device should have failed"),
    }

    assert_eq!(summary.filter, tag_filter(TAG));
}

#[tokio::test]
async fn duplicate_inventory_names_tag_first_machine_only() {
    let server = MockServer::start().await;
    mount_group_devices(&server, &["db01"]).await;
    mount_inventory(&server, &[("db01", "id-first"), ("db01", "id-second")]).await;
    mount_tag(&server, "id-first", 200, 1).await;
    mount_tag(&server, "id-second", 200, 0).await;

    let report = run(&session(&server), &options(), &mut AssumeYes)
        .await
        .unwrap();
    assert_eq!(report.summary.matched[0].platform_id, "id-first");
    assert_eq!(report.summary.tagged(), 1);
}

// ── Benign early exits ─────────────────────────────────────────────────

#[tokio::test]
async fn declined_confirmation_tags_nothing() {
    for answer in ["n\n", "yes\n", "\n", ""] {
        let server = MockServer::start().await;
        mount_group_devices(&server, &["web01"]).await;
        mount_inventory(&server, &[("web01", "id-A")]).await;
        mount_tag(&server, "id-A", 200, 0).await;

        let result = execute(session(&server), &options(), &mut answering(answer)).await;
        assert_eq!(exit_status(&result), 0);

        let report = result.unwrap();
        assert_eq!(report.status, RunStatus::Declined, "answer {answer:?}");
        assert_eq!(report.summary.matched.len(), 1);
        assert!(report.summary.results.is_empty());
    }
}

#[tokio::test]
async fn no_matches_exits_cleanly_without_prompt() {
    let server = MockServer::start().await;
    mount_group_devices(&server, &["web01", "web02"]).await;
    mount_inventory(&server, &[("WEB01", "id-A"), ("web02.contoso.com", "id-B")]).await;
    mount_tag(&server, "id-A", 200, 0).await;
    mount_tag(&server, "id-B", 200, 0).await;

    let result = execute(session(&server), &options(), &mut NeverAsked).await;
    assert_eq!(exit_status(&result), 0);

    let report = result.unwrap();
    assert_eq!(report.status, RunStatus::NoMatches);
    assert_eq!(report.summary.unmatched, vec!["web01", "web02"]);
}

#[tokio::test]
async fn group_without_devices_skips_inventory() {
    let server = MockServer::start().await;
    mount_group_devices(&server, &[]).await;

    Mock::given(method("GET"))
        .and(path("api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})))
        .expect(0)
        .mount(&server)
        .await;

    let report = execute(session(&server), &options(), &mut NeverAsked)
        .await
        .unwrap();
    assert_eq!(report.status, RunStatus::NoGroupDevices);
}

#[tokio::test]
async fn dry_run_matches_without_prompt_or_writes() {
    let server = MockServer::start().await;
    mount_group_devices(&server, &["web01"]).await;
    mount_inventory(&server, &[("web01", "id-A")]).await;
    mount_tag(&server, "id-A", 200, 0).await;

    let options = RunOptions {
        dry_run: true,
        ..options()
    };
    let report = execute(session(&server), &options, &mut NeverAsked)
        .await
        .unwrap();
    assert_eq!(report.status, RunStatus::DryRun);
    assert_eq!(report.summary.matched[0].platform_id, "id-A");
}

// ── Fatal errors ───────────────────────────────────────────────────────

#[tokio::test]
async fn missing_group_is_fatal_before_inventory() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("graph/groups/{GROUP}")))
        .respond_with(ResponseTemplate::new(404).set_body_string("Request_ResourceNotFound"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("api/machines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": []})))
        .expect(0)
        .mount(&server)
        .await;

    let result = execute(session(&server), &options(), &mut NeverAsked).await;
    assert_eq!(exit_status(&result), 1);
    assert!(matches!(result, Err(GroupTagError::GroupNotFound { .. })));
}

#[tokio::test]
async fn inventory_failure_is_fatal_and_tags_nothing() {
    let server = MockServer::start().await;
    mount_group_devices(&server, &["web01"]).await;

    Mock::given(method("GET"))
        .and(path("api/machines"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Missing Machine.Read.All"))
        .mount(&server)
        .await;
    mount_tag(&server, "id-A", 200, 0).await;

    let result = execute(session(&server), &options(), &mut NeverAsked).await;
    assert_eq!(exit_status(&result), 1);

    let err = result.unwrap_err();
    assert_eq!(err.status(), Some(reqwest::StatusCode::FORBIDDEN));
    assert!(err.to_string().contains("Missing Machine.Read.All"));
}
