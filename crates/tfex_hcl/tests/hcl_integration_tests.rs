//! Integration tests for HCL generation.

use std::fs;

use serde_json::json;
use tempfile::tempdir;
use tfex_hcl::{ConvertContext, IntermediateModel, OutputAssembler, ProviderSettings, DUMP_FILE, REDACTED};
use walkdir::WalkDir;

fn project_model() -> IntermediateModel {
    let mut model = IntermediateModel::new();
    model.extend(
        "networks",
        vec![json!({"name": "default", "autoCreateSubnetworks": true, "routingConfig": {"routingMode": "REGIONAL"}})],
    );
    model.extend(
        "firewalls",
        vec![json!({
            "name": "allow-ssh",
            "network": "https://www.googleapis.com/compute/v1/projects/acme/global/networks/default",
            "allowed": [{"IPProtocol": "tcp", "ports": ["22"]}],
            "sourceRanges": ["0.0.0.0/0"]
        })],
    );
    model.extend(
        "vpn_tunnels",
        vec![json!({
            "name": "to-onprem",
            "region": "https://www.googleapis.com/compute/v1/projects/acme/regions/us-east1",
            "peerIp": "198.51.100.4",
            "sharedSecret": "correct-horse-battery-staple",
            "sharedSecretHash": "Zm9vYmFy"
        })],
    );
    model.extend("routes", vec![json!({"name": "default-route-1a2b", "destRange": "0.0.0.0/0", "network": "default"})]);
    model
}

/// Test the rendered text of a single firewall rule.
#[test]
fn test_firewall_rendering() {
    let assembler = OutputAssembler::default();
    let assembly = assembler.assemble(&project_model(), &ConvertContext::project("acme"));
    let unit = assembly.unit("firewall.tf").unwrap();

    let expected = concat!(
        "# Firewall Rules\n",
        "\n",
        "resource \"google_compute_firewall\" \"allow_ssh\" {\n",
        "  name          = \"allow-ssh\"\n",
        "  project       = \"acme\"\n",
        "  network       = google_compute_network.default.id\n",
        "  source_ranges = [\"0.0.0.0/0\"]\n",
        "\n",
        "  allow {\n",
        "    protocol = \"tcp\"\n",
        "    ports    = [\"22\"]\n",
        "  }\n",
        "}\n",
    );
    assert_eq!(unit.render(), expected);
    assert!(!unit.render().contains("deny"));
}

/// Test that platform-managed routes never produce a file.
#[test]
fn test_default_routes_not_written() {
    let assembly = OutputAssembler::default().assemble(&project_model(), &ConvertContext::project("acme"));
    assert!(assembly.unit("routes.tf").is_none());
    assert_eq!(assembly.skipped, 1);
}

/// Test that secrets never reach disk, in HCL or in the dump.
#[test]
fn test_secrets_redacted_everywhere() {
    let dir = tempdir().unwrap();
    let assembler = OutputAssembler::default();
    let model = project_model();
    let assembly = assembler.assemble(&model, &ConvertContext::project("acme"));

    for unit in &assembly.units {
        assembler.write(unit, dir.path()).unwrap();
    }
    assembler.write_dump(&model, dir.path()).unwrap();

    for entry in WalkDir::new(dir.path()).into_iter().filter_map(Result::ok) {
        if entry.file_type().is_file() {
            let text = fs::read_to_string(entry.path()).unwrap();
            assert!(!text.contains("correct-horse-battery-staple"), "{:?}", entry.path());
            assert!(!text.contains("Zm9vYmFy"), "{:?}", entry.path());
        }
    }

    let vpn = fs::read_to_string(dir.path().join("vpn.tf")).unwrap();
    assert!(vpn.contains(&format!("shared_secret = \"{}\"", REDACTED)));
}

/// Test that secret-like label keys are redacted in every written file.
#[test]
fn test_sensitive_label_values_redacted() {
    let dir = tempdir().unwrap();
    let assembler = OutputAssembler::default();
    let mut model = IntermediateModel::new();
    model.extend(
        "buckets",
        vec![json!({
            "name": "acme-data",
            "location": "US",
            "labels": {"team": "data", "db_password": "hunter2", "api_token": "tok123"}
        })],
    );
    let assembly = assembler.assemble(&model, &ConvertContext::project("acme"));

    for unit in &assembly.units {
        assembler.write(unit, dir.path()).unwrap();
    }
    assembler.write_dump(&model, dir.path()).unwrap();

    for entry in WalkDir::new(dir.path()).into_iter().filter_map(Result::ok) {
        if entry.file_type().is_file() {
            let text = fs::read_to_string(entry.path()).unwrap();
            assert!(!text.contains("hunter2"), "{:?}", entry.path());
            assert!(!text.contains("tok123"), "{:?}", entry.path());
        }
    }

    let storage = fs::read_to_string(dir.path().join("storage.tf")).unwrap();
    assert!(storage.contains(&format!("db_password = \"{}\"", REDACTED)));
    assert!(storage.contains("team"));
}

/// Test that two runs over the same model produce byte-identical files.
#[test]
fn test_output_is_idempotent() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let assembler = OutputAssembler::new(ProviderSettings::default().with_region("us-east1"));
    let model = project_model();

    for dir in [first.path(), second.path()] {
        let assembly = assembler.assemble(&model, &ConvertContext::project("acme"));
        for unit in &assembly.units {
            assembler.write(unit, dir).unwrap();
        }
        assembler.write_dump(&model, dir).unwrap();
    }

    let mut names: Vec<_> = fs::read_dir(first.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    names.sort();
    assert!(names.iter().any(|n| n == DUMP_FILE));
    for name in names {
        let a = fs::read(first.path().join(&name)).unwrap();
        let b = fs::read(second.path().join(&name)).unwrap();
        assert_eq!(a, b, "{:?} differs", name);
    }
}

/// Test the dump keeps every kind, sorted by key.
#[test]
fn test_dump_sorted_by_kind() {
    let dir = tempdir().unwrap();
    let path = OutputAssembler::default().write_dump(&project_model(), dir.path()).unwrap();
    let text = fs::read_to_string(path).unwrap();

    let firewalls = text.find("\"firewalls\"").unwrap();
    let networks = text.find("\"networks\"").unwrap();
    let routes = text.find("\"routes\"").unwrap();
    let tunnels = text.find("\"vpn_tunnels\"").unwrap();
    assert!(firewalls < networks && networks < routes && routes < tunnels);
    assert!(text.ends_with("}\n"));
}

/// Test organization accounts get the organization unit and org-level files.
#[test]
fn test_organization_units() {
    let mut model = IntermediateModel::new();
    model.extend(
        "folders",
        vec![json!({"name": "folders/11", "displayName": "Engineering", "parent": "organizations/42"})],
    );
    model.extend(
        "org_iam_bindings",
        vec![json!({"role": "roles/resourcemanager.organizationAdmin", "members": ["group:admins@example.com"]})],
    );
    model.extend("billing_accounts", vec![json!({"name": "billingAccounts/0000-1111"})]);

    let assembly = OutputAssembler::default().assemble(&model, &ConvertContext::organization("42"));
    let names: Vec<_> = assembly.units.iter().map(|u| u.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["provider.tf", "variables.tf", "organization.tf", "folders.tf", "org_iam.tf"]
    );

    let iam = assembly.unit("org_iam.tf").unwrap().render();
    assert!(iam.contains("resource \"google_organization_iam_binding\" \"resourcemanager_organizationadmin\""));
    assert!(iam.contains("org_id  = \"42\""));
}
