//! Integration tests for the undo workflow against real git repositories.
//!
//! Every test creates a throwaway repository, commits an "old" revision,
//! overwrites the working copy with a "new" revision, and runs the workflow.
//! Tests return early when `git` is not installed.

use std::fs;
use std::path::Path;
use std::process::Command;

use shulkr::cli::{run_undo, UndoOptions};
use shulkr::config::{Config, OnError};
use shulkr::error::ShulkrError;
use shulkr::git::{BlobSource, ChangeStatus, GitRepo, Revision};
use shulkr::undo::undo_renames;

const OLD_COUNTER: &str = r#"class Counter {
    int total(int[] values) {
        int sum = 0;
        for (int value : values) {
            sum += value;
        }
        return sum;
    }
}
"#;

const NEW_COUNTER: &str = r#"class Counter {
    int total(int[] var1) {
        int var2 = 0;
        for (int var3 : var1) {
            var2 += var3;
        }
        return var2;
    }
}
"#;

const BROKEN: &str = "class Broken { void run() {\n";

/// `class Deep` whose single method returns a sum of `terms` reads of `name`.
fn deep_sum(name: &str, terms: usize) -> String {
    let sum = vec![name; terms].join(" + ");
    format!(
        "class Deep {{\n    int run(int {}) {{\n        return {};\n    }}\n}}\n",
        name, sum
    )
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Create a repository, commit `files`, and return it.
fn setup_repo(files: &[(&str, &str)]) -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("failed to create temp dir");
    git(temp.path(), &["init", "-q"]);
    git(temp.path(), &["config", "user.name", "Test User"]);
    git(temp.path(), &["config", "user.email", "test@example.com"]);
    git(temp.path(), &["config", "commit.gpgsign", "false"]);
    for (path, text) in files {
        write_file(temp.path(), path, text);
    }
    git(temp.path(), &["add", "."]);
    git(temp.path(), &["commit", "-q", "-m", "old version"]);
    temp
}

fn write_file(root: &Path, path: &str, text: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).expect("failed to create dirs");
    }
    fs::write(full, text).expect("failed to write file");
}

fn read_file(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).expect("failed to read file")
}

// ============================================================================
// Git collaborator
// ============================================================================

mod git_repo {
    use super::*;

    #[test]
    fn test_fetch_reads_both_revisions() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("src/Counter.java", OLD_COUNTER)]);
        write_file(temp.path(), "src/Counter.java", NEW_COUNTER);

        let repo = GitRepo::open(temp.path()).unwrap();
        let head = Revision::Commit("HEAD".to_string());
        assert_eq!(repo.fetch(&head, "src/Counter.java").unwrap(), OLD_COUNTER);
        assert_eq!(
            repo.fetch(&Revision::WorkingTree, "src/Counter.java").unwrap(),
            NEW_COUNTER
        );
    }

    #[test]
    fn test_changed_files_lists_modified_and_deleted() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("A.java", OLD_COUNTER), ("B.java", "class B {}\n")]);
        write_file(temp.path(), "A.java", NEW_COUNTER);
        fs::remove_file(temp.path().join("B.java")).unwrap();

        let repo = GitRepo::open(temp.path()).unwrap();
        let mut files = repo.changed_files("HEAD").unwrap();
        files.sort_by(|a, b| a.new_path.cmp(&b.new_path));
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].new_path, "A.java");
        assert_eq!(files[0].status, ChangeStatus::Modified);
        assert_eq!(files[1].new_path, "B.java");
        assert_eq!(files[1].status, ChangeStatus::Deleted);
    }

    #[test]
    fn test_fresh_repository_has_no_commits() {
        if !git_available() {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        git(temp.path(), &["init", "-q"]);
        let repo = GitRepo::open(temp.path()).unwrap();
        assert!(!repo.has_commits());
    }

    #[test]
    fn test_open_outside_repository_fails() {
        if !git_available() {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        let err = GitRepo::open(&temp.path().join("missing")).unwrap_err();
        assert!(matches!(err, ShulkrError::FileNotFound { .. }));
    }
}

// ============================================================================
// Workflow
// ============================================================================

mod workflow {
    use super::*;

    #[test]
    fn test_undo_restores_old_names() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("src/Counter.java", OLD_COUNTER)]);
        write_file(temp.path(), "src/Counter.java", NEW_COUNTER);

        let repo = GitRepo::open(temp.path()).unwrap();
        let report = undo_renames(&repo, &Config::default(), false).unwrap();
        assert_eq!(report.updated.len(), 1);
        assert_eq!(report.updated[0].path, "src/Counter.java");
        assert_eq!(report.updated[0].renames, 3);
        assert_eq!(read_file(temp.path(), "src/Counter.java"), OLD_COUNTER);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("Counter.java", OLD_COUNTER)]);
        write_file(temp.path(), "Counter.java", NEW_COUNTER);

        let repo = GitRepo::open(temp.path()).unwrap();
        let report = undo_renames(&repo, &Config::default(), true).unwrap();
        assert!(report.dry_run);
        assert_eq!(report.updated.len(), 1);
        assert_eq!(read_file(temp.path(), "Counter.java"), NEW_COUNTER);
    }

    #[test]
    fn test_real_changes_are_kept() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("Counter.java", OLD_COUNTER)]);
        let edited = NEW_COUNTER.replace("return var2;", "return var2 * 2;");
        write_file(temp.path(), "Counter.java", &edited);

        let repo = GitRepo::open(temp.path()).unwrap();
        undo_renames(&repo, &Config::default(), false).unwrap();
        assert_eq!(
            read_file(temp.path(), "Counter.java"),
            OLD_COUNTER.replace("return sum;", "return sum * 2;")
        );
    }

    #[test]
    fn test_unrenamed_and_foreign_files_are_untouched() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[
            ("Same.java", "class Same { int f(int a) { return a; } }\n"),
            ("notes.txt", "int var1;\n"),
        ]);
        write_file(
            temp.path(),
            "Same.java",
            "class Same { int f(int a) { return a + 1; } }\n",
        );
        write_file(temp.path(), "notes.txt", "int var2;\n");

        let repo = GitRepo::open(temp.path()).unwrap();
        let report = undo_renames(&repo, &Config::default(), false).unwrap();
        assert!(report.updated.is_empty());
        assert_eq!(report.unchanged, vec!["Same.java".to_string()]);
        assert_eq!(read_file(temp.path(), "notes.txt"), "int var2;\n");
    }

    #[test]
    fn test_abort_stops_on_unparseable_file() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("Broken.java", "class Broken {}\n")]);
        write_file(temp.path(), "Broken.java", BROKEN);

        let repo = GitRepo::open(temp.path()).unwrap();
        let err = undo_renames(&repo, &Config::default(), false).unwrap_err();
        match err {
            ShulkrError::Analysis { file, .. } => {
                assert_eq!(file, "Broken.java -> Broken.java");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_skip_records_failure_and_continues() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[
            ("Broken.java", "class Broken {}\n"),
            ("Counter.java", OLD_COUNTER),
        ]);
        write_file(temp.path(), "Broken.java", BROKEN);
        write_file(temp.path(), "Counter.java", NEW_COUNTER);

        let mut config = Config::default();
        config.undo.on_error = OnError::Skip;
        let repo = GitRepo::open(temp.path()).unwrap();
        let report = undo_renames(&repo, &config, false).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "Broken.java");
        assert_eq!(report.failed[0].error.code, 3);
        assert_eq!(report.updated.len(), 1);
        assert_eq!(read_file(temp.path(), "Counter.java"), OLD_COUNTER);
        assert_eq!(read_file(temp.path(), "Broken.java"), BROKEN);
    }

    #[test]
    fn test_skip_survives_deeply_nested_expression() {
        if !git_available() {
            return;
        }
        let old = deep_sum("a", 10_000);
        let new = deep_sum("b", 10_000);
        let temp = setup_repo(&[("Deep.java", old.as_str()), ("Counter.java", OLD_COUNTER)]);
        write_file(temp.path(), "Deep.java", &new);
        write_file(temp.path(), "Counter.java", NEW_COUNTER);

        let mut config = Config::default();
        config.undo.on_error = OnError::Skip;
        let repo = GitRepo::open(temp.path()).unwrap();
        let report = undo_renames(&repo, &config, false).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "Deep.java");
        assert_eq!(report.failed[0].error.code, 3);
        assert_eq!(read_file(temp.path(), "Deep.java"), new);
        assert_eq!(read_file(temp.path(), "Counter.java"), OLD_COUNTER);
    }

    #[test]
    fn test_disabled_config_skips_run() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("Counter.java", OLD_COUNTER)]);
        write_file(temp.path(), "Counter.java", NEW_COUNTER);

        let config = Config {
            undo_renamed_vars: false,
            ..Config::default()
        };
        let repo = GitRepo::open(temp.path()).unwrap();
        let report = undo_renames(&repo, &config, false).unwrap();
        assert!(report.skipped.is_some());
        assert_eq!(read_file(temp.path(), "Counter.java"), NEW_COUNTER);
    }

    #[test]
    fn test_empty_repository_is_skipped() {
        if !git_available() {
            return;
        }
        let temp = tempfile::tempdir().unwrap();
        git(temp.path(), &["init", "-q"]);
        write_file(temp.path(), "Counter.java", NEW_COUNTER);

        let response = run_undo(temp.path(), UndoOptions::default()).unwrap();
        assert_eq!(response.skipped.as_deref(), Some("repository has no commits"));
    }

    #[test]
    fn test_options_override_config_file() {
        if !git_available() {
            return;
        }
        let temp = setup_repo(&[("Counter.java", OLD_COUNTER)]);
        write_file(temp.path(), "Counter.java", NEW_COUNTER);
        fs::write(
            temp.path().join(".shulkr"),
            "[undo]\nbase_ref = \"does-not-exist\"\n",
        )
        .unwrap();

        let err = run_undo(temp.path(), UndoOptions::default()).unwrap_err();
        assert!(matches!(err, ShulkrError::Git { .. }));

        let options = UndoOptions {
            dry_run: true,
            base_ref: Some("HEAD".to_string()),
            on_error: None,
        };
        let response = run_undo(temp.path(), options).unwrap();
        assert_eq!(response.base_ref, "HEAD");
        assert_eq!(response.updated.len(), 1);
    }
}

// ============================================================================
// Binary
// ============================================================================

mod binary {
    use super::*;

    fn shulkr() -> Command {
        Command::new(env!("CARGO_BIN_EXE_shulkr"))
    }

    #[test]
    fn test_analyze_prints_json_mapping() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), "old.java", OLD_COUNTER);
        write_file(temp.path(), "new.java", NEW_COUNTER);

        let output = shulkr()
            .args(["analyze", "old.java", "new.java", "--file-name", "Counter.java"])
            .current_dir(temp.path())
            .output()
            .unwrap();
        assert!(output.status.success());
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["file"], "Counter.java");
        assert_eq!(json["renames_detected"], true);
        assert_eq!(json["mapping"]["Counter/total(int[])"]["sum"], "var2");
    }

    #[test]
    fn test_analyze_rewrite_prints_source() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), "old.java", OLD_COUNTER);
        write_file(temp.path(), "new.java", NEW_COUNTER);

        let output = shulkr()
            .args(["analyze", "old.java", "new.java", "--rewrite"])
            .current_dir(temp.path())
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(String::from_utf8(output.stdout).unwrap(), OLD_COUNTER);
    }

    #[test]
    fn test_errors_are_json_with_exit_code() {
        let temp = tempfile::tempdir().unwrap();
        write_file(temp.path(), "old.java", "class A {}\n");
        write_file(temp.path(), "new.java", BROKEN);

        let output = shulkr()
            .args(["analyze", "old.java", "new.java"])
            .current_dir(temp.path())
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(3));
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["details"]["kind"], "parse_failure");
    }

    #[test]
    fn test_config_init_writes_file() {
        let temp = tempfile::tempdir().unwrap();
        let output = shulkr()
            .args(["config", "init", "--repo"])
            .arg(temp.path())
            .output()
            .unwrap();
        assert!(output.status.success());
        let config = Config::load_from_repo(temp.path()).unwrap();
        assert_eq!(config, Config::default());
    }
}
