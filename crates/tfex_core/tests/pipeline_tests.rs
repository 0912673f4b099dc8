//! Integration tests for the extraction pipeline.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mockall::mock;
use serde_json::json;
use tempfile::tempdir;
use tfex_core::{
    Account, AccountKind, Capabilities, CoreError, ExtractConfig, ExtractionCatalog, Pipeline,
    Requirement, Routine, ScopeMode, Source, Warning,
};
use tfex_runner::{ExecutionResult, MockResponse, MockRunner, QueryRequest, QueryRunner, RunConfig, RunnerResult};
use walkdir::WalkDir;

mock! {
    pub Gcloud {}

    #[async_trait]
    impl QueryRunner for Gcloud {
        async fn is_available(&self) -> RunnerResult<bool>;
        async fn version(&self) -> RunnerResult<String>;
        async fn execute(&self, request: &QueryRequest, run_config: &RunConfig) -> RunnerResult<ExecutionResult>;
    }
}

fn output(stdout: &str) -> ExecutionResult {
    ExecutionResult {
        exit_code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
        started_at: Utc::now(),
        finished_at: Utc::now(),
        duration_ms: 1,
    }
}

fn project() -> Account {
    Account::Project("acme".to_string())
}

/// Upstream state of a small project with compute and pubsub enabled.
fn acme_runner() -> MockRunner {
    MockRunner::new()
        .on_json(
            "services list --enabled",
            json!([
                {"config": {"name": "compute.googleapis.com"}},
                {"config": {"name": "pubsub.googleapis.com"}}
            ]),
        )
        .on_json(
            "compute networks list",
            json!([
                {"name": "prod-vpc", "autoCreateSubnetworks": false, "peerings": [{"name": "to-shared", "network": "projects/shared/global/networks/hub"}]},
                {"description": "no name"}
            ]),
        )
        .on_json(
            "compute firewall-rules list",
            json!([{
                "name": "allow-web",
                "network": "projects/acme/global/networks/prod-vpc",
                "direction": "INGRESS",
                "allowed": [
                    {"IPProtocol": "tcp", "ports": ["22"]},
                    {"IPProtocol": "tcp", "ports": ["443"]}
                ]
            }]),
        )
        .on_json("compute routes list", json!([{"name": "default-route-r1", "destRange": "0.0.0.0/0", "network": "prod-vpc"}]))
        .on_json("pubsub topics list", json!([{"name": "projects/acme/topics/orders"}]))
        .on_json(
            "iam service-accounts list",
            json!([
                {"email": "deployer@acme.iam.gserviceaccount.com", "displayName": "Deployer"},
                {"email": "123-compute@developer.gserviceaccount.com"}
            ]),
        )
}

/// Test the any-of gating scenario on a two-routine catalog.
#[tokio::test]
async fn test_gating_scenario() {
    let catalog = ExtractionCatalog::new(vec![
        Routine {
            id: "networks",
            description: "needs compute or storage",
            account: AccountKind::Project,
            requires: Requirement::AnyOf(&["compute", "storage"]),
            source: Source::List { args: &["compute", "networks", "list"], scope: ScopeMode::Global },
        },
        Routine {
            id: "buckets",
            description: "needs storage",
            account: AccountKind::Project,
            requires: Requirement::AnyOf(&["storage"]),
            source: Source::List { args: &["storage", "buckets", "list"], scope: ScopeMode::Global },
        },
    ])
    .unwrap();
    let runner = MockRunner::new()
        .on_json("services list", json!([{"config": {"name": "compute.googleapis.com"}}]))
        .on_json("compute networks list", json!([{"name": "default"}]))
        .on("storage buckets list", MockResponse::failure(1, "ERROR: should never be called"));

    let pipeline = Pipeline::new(Arc::new(runner.clone()), ExtractConfig::default()).with_catalog(catalog);
    let ctx = pipeline.extract(&project()).await.unwrap();

    assert_eq!(ctx.capabilities, Capabilities::from_iter(["compute"]));
    assert_eq!(ctx.model.count("networks"), 1);
    assert!(!ctx.model.contains("buckets"));
    assert_eq!(ctx.gated_out, vec!["buckets".to_string()]);
    assert!(ctx.warnings.is_empty());
    assert!(!runner.was_queried("storage"));
}

/// Test a full project run against scripted upstream responses.
#[tokio::test]
async fn test_project_run_writes_expected_files() {
    let dir = tempdir().unwrap();
    let runner = acme_runner();
    let pipeline = Pipeline::new(Arc::new(runner.clone()), ExtractConfig::default());

    let summary = pipeline.run(&project(), Some(dir.path())).await.unwrap();

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "firewall.tf",
            "iam.tf",
            "networks.tf",
            "peering.tf",
            "provider.tf",
            "pubsub.tf",
            "resources.json",
            "variables.tf"
        ]
    );

    let firewall = fs::read_to_string(dir.path().join("firewall.tf")).unwrap();
    let first = firewall.find("[\"22\"]").unwrap();
    let second = firewall.find("[\"443\"]").unwrap();
    assert!(first < second);
    assert_eq!(firewall.matches("allow {").count(), 2);
    assert!(!firewall.contains("deny"));

    // One network lacks a name: reported, its sibling still written.
    assert!(summary.warnings.contains(&Warning::MalformedDescriptor {
        kind: "networks".to_string(),
        index: 1,
        field: "name".to_string(),
    }));
    let networks = fs::read_to_string(dir.path().join("networks.tf")).unwrap();
    assert!(networks.contains("resource \"google_compute_network\" \"prod_vpc\""));

    assert_eq!(summary.counts.get("networks"), Some(&2));
    assert_eq!(summary.skipped, 2);
    assert!(summary.gated_out.contains(&"gke_clusters".to_string()));
    assert!(!runner.was_queried("container"));
    assert!(runner.get_calls().iter().all(|c| c.project.as_deref() == Some("acme")));
}

/// Test that the same upstream state yields byte-identical output.
#[tokio::test]
async fn test_runs_are_idempotent() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let pipeline = Pipeline::new(Arc::new(acme_runner()), ExtractConfig::default());

    pipeline.run(&project(), Some(first.path())).await.unwrap();
    pipeline.run(&project(), Some(second.path())).await.unwrap();

    let files: Vec<_> = WalkDir::new(first.path())
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .collect();
    assert!(!files.is_empty());
    for entry in files {
        let relative = entry.path().strip_prefix(first.path()).unwrap();
        let a = fs::read(entry.path()).unwrap();
        let b = fs::read(second.path().join(relative)).unwrap();
        assert_eq!(a, b, "{} differs", relative.display());
    }
}

/// Test that a forced routine runs without its capability and is listed.
#[tokio::test]
async fn test_forced_routine_runs() {
    let runner = acme_runner().on_json("storage buckets list", json!([{"name": "logs"}]));
    let config = ExtractConfig::default().with_force("buckets");
    let pipeline = Pipeline::new(Arc::new(runner.clone()), config);

    let ctx = pipeline.extract(&project()).await.unwrap();

    assert_eq!(ctx.forced, vec!["buckets".to_string()]);
    assert_eq!(ctx.model.count("buckets"), 1);
    assert!(runner.was_queried("storage buckets list"));
    assert!(!ctx.gated_out.contains(&"buckets".to_string()));
}

/// Test that regional routines iterate the configured regions.
#[tokio::test]
async fn test_configured_regions_are_iterated() {
    let runner = acme_runner()
        .on_json("compute networks subnets list --regions=us-east1", json!([{"name": "a", "ipCidrRange": "10.0.0.0/24", "network": "prod-vpc"}]))
        .on("compute networks subnets list --regions=us-west1", MockResponse::failure(1, "ERROR: (gcloud) connection reset"));
    let config = ExtractConfig::default().with_regions(["us-east1", "us-west1"]);
    let pipeline = Pipeline::new(Arc::new(runner.clone()), config);

    let ctx = pipeline.extract(&project()).await.unwrap();

    assert_eq!(ctx.model.count("subnets"), 1);
    assert!(ctx.warnings.iter().any(|w| matches!(
        w,
        Warning::QueryFailure { kind, scope, .. } if kind == "subnets" && scope == "region us-west1"
    )));
    assert!(runner.was_queried("compute routers list --regions=us-west1"));
}

/// Test that one account's detection failure does not stop the batch.
#[tokio::test]
async fn test_batch_isolates_accounts() {
    let root = tempdir().unwrap();
    let runner = MockRunner::new()
        .on_json("organizations describe 42", json!({"displayName": "example.com"}))
        .on("organizations describe 7", MockResponse::permission_denied("resourcemanager.organizations.get"));
    let pipeline = Pipeline::new(Arc::new(runner), ExtractConfig::default());
    let accounts = vec![
        Account::Organization("7".to_string()),
        Account::Organization("42".to_string()),
    ];

    let report = pipeline.run_batch(&accounts, Some(root.path())).await;

    assert_eq!(report.outcomes.len(), 2);
    assert!(!report.all_succeeded());
    let (failed, err) = report.failed().next().unwrap();
    assert_eq!(failed, &accounts[0]);
    assert!(err.is_detection());

    let ok: Vec<_> = report.succeeded().collect();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].display_name.as_deref(), Some("example.com"));
    assert!(root.path().join("org-42").join("organization.tf").exists());
    assert!(!root.path().join("org-7").exists());
}

/// Test that an unusable destination is a fatal write error.
#[tokio::test]
async fn test_unwritable_destination_is_fatal() {
    let dir = tempdir().unwrap();
    let blocked = dir.path().join("blocked");
    fs::write(&blocked, "not a directory").unwrap();
    let pipeline = Pipeline::new(Arc::new(acme_runner()), ExtractConfig::default());

    let err = pipeline.run(&project(), Some(&blocked)).await.unwrap_err();
    assert!(matches!(err, CoreError::Write(_)));
}

/// Test that one unwritable file is recorded and the other files are still written.
#[tokio::test]
async fn test_single_file_failure_is_contained() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("firewall.tf")).unwrap();
    let pipeline = Pipeline::new(Arc::new(acme_runner()), ExtractConfig::default());

    let summary = pipeline.run(&project(), Some(dir.path())).await.unwrap();

    let write_failures: Vec<&Warning> = summary
        .warnings
        .iter()
        .filter(|w| matches!(w, Warning::WriteFailure { .. }))
        .collect();
    assert_eq!(write_failures.len(), 1);
    assert!(matches!(write_failures[0], Warning::WriteFailure { file, .. } if file == "firewall.tf"));

    assert!(dir.path().join("firewall.tf").is_dir());
    for name in ["provider.tf", "variables.tf", "networks.tf", "pubsub.tf", "iam.tf", "resources.json"] {
        assert!(dir.path().join(name).is_file(), "{} missing", name);
    }
    assert!(!summary.files.contains(&dir.path().join("firewall.tf")));

    // No temporary files are left behind by the failed write.
    let entries = fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, summary.files.len() + 1);
}

/// Test the organization flow with strict call expectations.
#[tokio::test]
async fn test_organization_calls() {
    let mut gcloud = MockGcloud::new();
    gcloud
        .expect_execute()
        .withf(|req, _| req.args.starts_with(&["organizations".to_string(), "describe".to_string()]))
        .times(1)
        .returning(|_, _| Ok(output(r#"{"name": "organizations/42", "displayName": "example.com"}"#)));
    gcloud
        .expect_execute()
        .withf(|req, _| req.args.get(1).map(String::as_str) == Some("get-iam-policy"))
        .times(1)
        .returning(|_, _| {
            Ok(output(
                r#"{"bindings": [{"role": "roles/billing.admin", "members": ["group:finance@example.com"]}]}"#,
            ))
        });
    gcloud
        .expect_execute()
        .withf(|req, _| {
            assert!(req.project.is_none(), "organization calls carry no project");
            req.args[0] != "organizations"
        })
        .returning(|_, _| Ok(output("[]")));

    let dir = tempdir().unwrap();
    let pipeline = Pipeline::new(Arc::new(gcloud), ExtractConfig::default());
    let summary = pipeline
        .run(&Account::Organization("42".to_string()), Some(dir.path()))
        .await
        .unwrap();

    assert_eq!(summary.counts.get("org_iam_bindings"), Some(&1));
    assert_eq!(summary.counts.get("folders"), Some(&0));
    assert!(summary.counts.get("networks").is_none());
    assert!(summary.gated_out.is_empty());
    assert_file_contains(&dir.path().join("org_iam.tf"), "roles/billing.admin");
    assert_file_contains(&dir.path().join("organization.tf"), "# example.com");
    assert_file_contains(&dir.path().join("variables.tf"), "GCP organization ID (example.com)");
}

fn assert_file_contains(path: &Path, needle: &str) {
    let text = fs::read_to_string(path).unwrap();
    assert!(text.contains(needle), "{} lacks {}", path.display(), needle);
}
