mod support;

use std::path::Path;
use std::process::{Command, Output};

use support::*;

const ENV_KEYS: &[&str] = &[
    "FORKWATCH_USERNAMES",
    "FORKWATCH_ROOTS",
    "FORKWATCH_INTERVAL",
    "FORKWATCH_DEPTH",
    "FORKWATCH_NO_FETCH",
    "FORKWATCH_COLOR",
    "FORKWATCH_LOG",
];

fn forkwatch(config_dir: &Path, args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_forkwatch"));
    for k in ENV_KEYS {
        cmd.env_remove(k);
    }
    cmd.env("FORKWATCH_CONFIG", config_dir.join("config.yml"))
        .env("NO_COLOR", "1")
        .args(args);
    for (k, v) in env {
        cmd.env(k, v);
    }
    cmd.output().expect("run forkwatch")
}

fn stderr(o: &Output) -> String {
    String::from_utf8_lossy(&o.stderr).to_string()
}

fn fork_tree(root: &Path) {
    let a = root.join("alpha");
    init_repo_with_default_user(&a);
    commit_file(&a, "README.md", "a\n", "alpha init");
    git(&a, &["remote", "add", "origin", "https://host/alice/alpha.git"]);

    let b = root.join("beta");
    init_repo_with_default_user(&b);
    commit_file(&b, "README.md", "b\n", "beta init");
    git(&b, &["remote", "add", "origin", "https://host/bob/beta.git"]);
    std::fs::write(b.join("README.md"), "changed\n").unwrap();
}

#[test]
fn test_scan_json_reports_forks_in_order() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let root = td.path().join("src");
    fork_tree(&root);
    let root_s = root.to_string_lossy().to_string();

    let out = forkwatch(
        td.path(),
        &["scan", "--json", "--root", &root_s, "--no-fetch", "--all"],
        &[],
    );
    assert!(out.status.success(), "stderr:\n{}", stderr(&out));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json on stdout");
    let repos = v["repositories"].as_array().expect("array");
    let names: Vec<&str> = repos.iter().filter_map(|r| r["name"].as_str()).collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert_eq!(repos[1]["dirty"], true);
    assert!(repos[0]["ahead"].is_null(), "no reference ref: counts unknown");
    assert_eq!(v["summary"]["scanned"], 2);
    assert_eq!(v["summary"]["dirty"], 1);

    let out = forkwatch(
        td.path(),
        &["scan", "--json", "--root", &root_s, "--no-fetch", "--dirty-only", "--all"],
        &[],
    );
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    assert_eq!(v["repositories"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(v["summary"]["scanned"], 2);
}

#[test]
fn test_scan_table_and_empty_result() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let root = td.path().join("src");
    fork_tree(&root);
    let root_s = root.to_string_lossy().to_string();

    let out = forkwatch(
        td.path(),
        &["scan", "--root", &root_s, "--no-fetch"],
        &[("FORKWATCH_USERNAMES", "alice")],
    );
    assert!(out.status.success(), "stderr:\n{}", stderr(&out));
    let table = String::from_utf8_lossy(&out.stdout);
    assert!(table.starts_with("| Repository"), "{table}");
    assert!(table.contains("alpha"));
    assert!(!table.contains("beta"));
    assert!(table.contains("1 fork(s) out of 2 repositories scanned"), "{table}");

    let out = forkwatch(
        td.path(),
        &["scan", "--root", &root_s, "--no-fetch", "--user", "nobody"],
        &[],
    );
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert!(stderr(&out).contains("no repositories matched"), "{}", stderr(&out));
}

#[test]
fn test_config_subcommand_and_config_errors() {
    let td = tempfile::tempdir().expect("tmpdir");

    let out = forkwatch(td.path(), &["config"], &[("FORKWATCH_DEPTH", "7")]);
    assert!(out.status.success(), "stderr:\n{}", stderr(&out));
    let yaml = String::from_utf8_lossy(&out.stdout);
    assert!(yaml.contains("depth: 7"), "{yaml}");
    assert!(yaml.contains("fetch: true"), "{yaml}");

    std::fs::write(td.path().join("config.yml"), "depth: [broken\n").unwrap();
    let out = forkwatch(td.path(), &["config"], &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("invalid config"), "{}", stderr(&out));
}

#[test]
fn test_watch_once_exit_codes() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");

    let file = td.path().join("plain.txt");
    std::fs::write(&file, "x").unwrap();
    let out = forkwatch(
        td.path(),
        &["watch", "--once", "--no-desktop", "--repo", &file.to_string_lossy()],
        &[],
    );
    assert_eq!(out.status.code(), Some(2), "stderr:\n{}", stderr(&out));
    assert!(stderr(&out).contains("not a directory"));

    let upstream = bare_upstream(td.path());
    let fork = td.path().join("widget");
    clone_fork(&upstream, &fork, "https://example.com/alice/widget.git");
    let out = forkwatch(
        td.path(),
        &["watch", "--once", "--no-desktop", "--repo", &fork.to_string_lossy()],
        &[],
    );
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr(&out));

    let lonely = td.path().join("lonely");
    init_repo_with_default_user(&lonely);
    let out = forkwatch(
        td.path(),
        &[
            "watch",
            "--once",
            "--no-desktop",
            "--repo",
            &fork.to_string_lossy(),
            "--repo",
            &lonely.to_string_lossy(),
        ],
        &[],
    );
    assert_eq!(out.status.code(), Some(1));
    assert!(
        stderr(&out).contains("1 of 2 targets could not be checked"),
        "{}",
        stderr(&out)
    );
}

#[test]
fn test_watch_warns_when_fetching_is_disabled() {
    if !have_git() {
        eprintln!("skipping: git not found in PATH");
        return;
    }
    let td = tempfile::tempdir().expect("tmpdir");
    let upstream = bare_upstream(td.path());
    let fork = td.path().join("widget");
    clone_fork(&upstream, &fork, "https://example.com/alice/widget.git");
    let fork_s = fork.to_string_lossy().to_string();

    let out = forkwatch(
        td.path(),
        &["watch", "--once", "--no-desktop", "--repo", &fork_s],
        &[("FORKWATCH_NO_FETCH", "1")],
    );
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr(&out));
    assert!(stderr(&out).contains("fetching is disabled"), "{}", stderr(&out));

    let out = forkwatch(
        td.path(),
        &["watch", "--once", "--no-desktop", "--repo", &fork_s],
        &[],
    );
    assert!(!stderr(&out).contains("fetching is disabled"), "{}", stderr(&out));

    // A declared upstream is fetched directly, so it cannot be checked without fetching.
    std::fs::write(
        td.path().join("config.yml"),
        format!(
            "watch:\n  - path: {}\n    upstream: {}\n",
            fork_s,
            upstream.to_string_lossy()
        ),
    )
    .unwrap();
    let out = forkwatch(td.path(), &["watch", "--once", "--no-desktop"], &[]);
    assert_eq!(out.status.code(), Some(0), "stderr:\n{}", stderr(&out));
    let out = forkwatch(
        td.path(),
        &["watch", "--once", "--no-desktop"],
        &[("FORKWATCH_NO_FETCH", "1")],
    );
    assert_eq!(out.status.code(), Some(1), "stderr:\n{}", stderr(&out));
    assert!(
        stderr(&out).contains("1 of 1 targets could not be checked"),
        "{}",
        stderr(&out)
    );
}
