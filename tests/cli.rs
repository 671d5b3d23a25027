use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn tracker(data: &Path) -> Command {
    let mut cmd = Command::cargo_bin("contribution-tracker").unwrap();
    cmd.env_remove("CONTRIB_TRACKER_CONFIG")
        .env_remove("CONTRIB_TRACKER_PROJECT")
        .env("CONTRIB_TRACKER_DATA", data);
    cmd
}

fn seeded() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("contributors.json");

    tracker(&data)
        .args(["add-contributor", "John Doe", "johndoe", "--email", "john@example.com"])
        .assert()
        .success();
    tracker(&data).args(["add-contributor", "Jane Smith", "janesmith"]).assert().success();

    for (repo, kind, pr) in [
        ("awesome-project", "bug-fix", "123"),
        ("awesome-project", "feature", "124"),
        ("docs-site", "documentation", "0"),
        ("awesome-project", "bug-fix", "125"),
    ] {
        tracker(&data)
            .args(["add-contribution", "johndoe", repo, kind, "Some work", "--pr", pr])
            .assert()
            .success();
    }
    tracker(&data)
        .args(["add-contribution", "janesmith", "docs-site", "documentation", "Typos"])
        .assert()
        .success();

    (dir, data)
}

#[test]
fn test_add_and_list_persists_json() {
    let (_dir, data) = seeded();

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&data).unwrap()).unwrap();
    assert_eq!(raw["project_name"], "Hacktoberfest 2025");
    assert_eq!(raw["contributors"]["johndoe"]["contributions"].as_array().unwrap().len(), 4);
    assert_eq!(raw["contributors"]["johndoe"]["contributions"][0]["type"], "bug-fix");

    tracker(&data)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"github_username\": \"janesmith\""));
}

#[test]
fn test_add_contribution_for_unknown_contributor_fails() {
    let (_dir, data) = seeded();

    tracker(&data)
        .args(["add-contribution", "ghost", "repo", "bug-fix"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Contributor not found: ghost"));
}

#[test]
fn test_blank_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("contributors.json");

    tracker(&data)
        .args(["add-contributor", " ", "someone"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation error"));
}

#[test]
fn test_leaderboard_csv() {
    let (_dir, data) = seeded();

    let output = tracker(&data)
        .args(["leaderboard", "--format", "csv"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();
    let mut lines = text.lines();

    assert!(lines.next().unwrap().starts_with("name,github_username,email,contribution_count"));
    assert!(lines.next().unwrap().starts_with("John Doe,johndoe,john@example.com,4,2,"));
    assert!(lines.next().unwrap().starts_with("Jane Smith,janesmith,,1,1,"));
}

#[test]
fn test_stats_and_completion() {
    let (_dir, data) = seeded();

    tracker(&data)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_contributions\": 5"))
        .stdout(predicate::str::contains("\"completed_hacktoberfest\": 1"));

    tracker(&data)
        .arg("completed")
        .assert()
        .success()
        .stdout(predicate::str::contains("johndoe").and(predicate::str::contains("janesmith").not()));
}

#[test]
fn test_search_and_filter() {
    let (_dir, data) = seeded();

    tracker(&data)
        .args(["search", "jane", "--field", "name"])
        .assert()
        .success()
        .stdout(predicate::str::contains("janesmith").and(predicate::str::contains("johndoe").not()));

    tracker(&data)
        .args(["filter", "--min-contributions", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("johndoe").and(predicate::str::contains("janesmith").not()));

    tracker(&data)
        .args(["filter-contributions", "--has-pr", "true"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"pr_number\": 125"))
        .stdout(predicate::str::contains("\"pr_number\": 0").not());
}

#[test]
fn test_repository_commands() {
    let (_dir, data) = seeded();

    tracker(&data)
        .args(["repo-stats", "awesome-project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_contributions\": 3"));

    tracker(&data)
        .args(["repo-stats", "missing-repo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Repository not found: missing-repo"));

    tracker(&data)
        .args(["health", "docs-site"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\""));

    tracker(&data)
        .args(["trending", "--days", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("awesome-project"));

    tracker(&data)
        .args(["compare", "docs-site", "awesome-project"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"rankings\""));
}

#[test]
fn test_export_then_import_into_fresh_project() {
    let (dir, data) = seeded();
    let out = dir.path().join("export");

    tracker(&data).args(["export", "all"]).arg(&out).assert().success();
    assert!(out.join("contributors.csv").exists());
    assert!(out.join("contributions.csv").exists());
    assert!(out.join("metrics.csv").exists());

    let fresh = dir.path().join("fresh.json");
    tracker(&fresh)
        .arg("import")
        .arg(out.join("contributors.csv"))
        .arg("--contributions")
        .arg(out.join("contributions.csv"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imported\": 7"));

    tracker(&fresh)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_contributions\": 5"));
}

#[test]
fn test_import_reports_bad_rows_and_unknown_schema() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("contributors.json");
    let people = dir.path().join("people.csv");
    fs::write(&people, "name,github_username,email\nAda,ada,\n,broken,\nGrace,grace,\n").unwrap();

    tracker(&data)
        .arg("import")
        .arg(&people)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imported\": 2"))
        .stdout(predicate::str::contains("\"line\": 3"));

    let junk = dir.path().join("junk.csv");
    fs::write(&junk, "foo,bar\n1,2\n").unwrap();
    tracker(&data)
        .arg("import")
        .arg(&junk)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown CSV schema"));
}

#[test]
fn test_template_output() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("contributors.json");

    tracker(&data)
        .args(["template", "contributions"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "github_username,repo_name,type,description,pr_number,date",
        ));
}

#[test]
fn test_scoring_policy_file() {
    let (dir, data) = seeded();
    let config = dir.path().join("policy.json");
    fs::write(&config, r#"{"health": {"healthy": 0, "good": 0, "moderate": 0}}"#).unwrap();

    tracker(&data)
        .args(["health", "docs-site"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"healthy\""));

    fs::write(&config, "not json").unwrap();
    tracker(&data)
        .arg("stats")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load scoring policy"));
}

#[test]
fn test_unwritable_data_file_fails_mutations() {
    let dir = tempfile::tempdir().unwrap();

    tracker(dir.path())
        .args(["add-contributor", "Ada", "ada"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to add contributor"));

    let people = dir.path().join("people.csv");
    fs::write(&people, "name,github_username\nAda,ada\n").unwrap();
    tracker(dir.path())
        .arg("import")
        .arg(&people)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to import"));
}

#[test]
fn test_trending_with_huge_window() {
    let (_dir, data) = seeded();

    tracker(&data)
        .args(["trending", "--days", "4000000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("awesome-project"));
}
