//! Git collaborator: reads file revisions and lists changed files.
//!
//! All access goes through the `git` CLI run with `-C <root>`, so the tool
//! works on any repository git itself can read.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use shulkr_core::error::ShulkrError;
use shulkr_core::patch::ContentHash;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// Revisions and Blob Sources
// ============================================================================

/// Where a file's content is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revision {
    /// A committed revision (`HEAD`, a branch, a tag, a hash).
    Commit(String),
    /// The file as it currently sits on disk.
    WorkingTree,
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Revision::Commit(rev) => write!(f, "{}", rev),
            Revision::WorkingTree => write!(f, "working tree"),
        }
    }
}

/// Source of file text at a given revision.
pub trait BlobSource {
    /// Read `path` (relative to the repository root) at `revision`.
    fn fetch(&self, revision: &Revision, path: &str) -> Result<String, ShulkrError>;
}

// ============================================================================
// Changed Files
// ============================================================================

/// How a file differs between the base revision and the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Copied,
    Deleted,
    Modified,
    Renamed,
    TypeChanged,
    Other,
}

impl ChangeStatus {
    fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('A') => ChangeStatus::Added,
            Some('C') => ChangeStatus::Copied,
            Some('D') => ChangeStatus::Deleted,
            Some('M') => ChangeStatus::Modified,
            Some('R') => ChangeStatus::Renamed,
            Some('T') => ChangeStatus::TypeChanged,
            _ => ChangeStatus::Other,
        }
    }
}

/// One entry of `git diff --name-status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub status: ChangeStatus,
    /// Path at the base revision.
    pub old_path: String,
    /// Path in the working tree.
    pub new_path: String,
}

impl ChangedFile {
    /// `old_path -> new_path`, used to identify the file in diagnostics.
    pub fn label(&self) -> String {
        format!("{} -> {}", self.old_path, self.new_path)
    }
}

/// Parse the NUL-separated output of `git diff --name-status -z`.
///
/// Renames and copies carry two paths; every other status carries one.
pub fn parse_name_status(output: &str) -> Vec<ChangedFile> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut files = Vec::new();
    while let Some(code) = fields.next() {
        let status = ChangeStatus::from_code(code);
        let Some(first) = fields.next() else {
            break;
        };
        let second = match status {
            ChangeStatus::Renamed | ChangeStatus::Copied => fields.next(),
            _ => None,
        };
        files.push(ChangedFile {
            status,
            old_path: first.to_string(),
            new_path: second.unwrap_or(first).to_string(),
        });
    }
    files
}

// ============================================================================
// Git Errors
// ============================================================================

/// Failure of a single git invocation.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    #[error("git {command} produced non-UTF-8 output")]
    InvalidUtf8 { command: String },
}

impl From<GitError> for ShulkrError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Spawn { command, source } => ShulkrError::Git {
                command,
                stderr: source.to_string(),
            },
            GitError::Failed { command, stderr } => ShulkrError::Git { command, stderr },
            GitError::InvalidUtf8 { command } => ShulkrError::Git {
                command,
                stderr: "output is not valid UTF-8".to_string(),
            },
        }
    }
}

// ============================================================================
// Git Repository
// ============================================================================

/// A git working copy driven through the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    /// Open the repository containing `path`, rooted at its top level.
    pub fn open(path: &Path) -> Result<Self, ShulkrError> {
        if !path.exists() {
            return Err(ShulkrError::file_not_found(path.display().to_string()));
        }
        let output = run_git(path, &["rev-parse", "--show-toplevel"])?;
        let root = stdout_string("rev-parse", output)?.trim().to_string();
        debug!(root = %root, "opened repository");
        Ok(GitRepo {
            root: PathBuf::from(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn git(&self, args: &[&str]) -> Result<Output, GitError> {
        run_git(&self.root, args)
    }

    /// Whether `HEAD` resolves to a commit.
    pub fn has_commits(&self) -> bool {
        self.git(&["rev-parse", "--verify", "--quiet", "HEAD"]).is_ok()
    }

    /// Files that differ between `base_ref` and the working tree.
    pub fn changed_files(&self, base_ref: &str) -> Result<Vec<ChangedFile>, ShulkrError> {
        let output = self.git(&["diff", "--name-status", "-z", base_ref, "--"])?;
        let text = stdout_string("diff", output)?;
        Ok(parse_name_status(&text))
    }

    /// Hash of the working copy of `path`.
    pub fn working_hash(&self, path: &str) -> Result<ContentHash, ShulkrError> {
        let bytes = fs::read(self.root.join(path)).map_err(|e| read_error(path, e))?;
        Ok(ContentHash::compute(&bytes))
    }

    /// Replace the working copy of `path` with `contents`, provided it still
    /// hashes to `expected`.
    pub fn write_file(
        &self,
        path: &str,
        expected: &ContentHash,
        contents: &str,
    ) -> Result<(), ShulkrError> {
        let actual = self.working_hash(path)?;
        if actual != *expected {
            return Err(ShulkrError::ApplyError {
                message: format!(
                    "{} changed on disk during analysis (expected {}, found {})",
                    path, expected, actual
                ),
                file: Some(path.to_string()),
            });
        }
        fs::write(self.root.join(path), contents).map_err(|e| ShulkrError::ApplyError {
            message: format!("failed to write {}: {}", path, e),
            file: Some(path.to_string()),
        })
    }
}

impl BlobSource for GitRepo {
    fn fetch(&self, revision: &Revision, path: &str) -> Result<String, ShulkrError> {
        match revision {
            Revision::Commit(rev) => {
                let object = format!("{}:{}", rev, path);
                let output = self.git(&["show", &object])?;
                Ok(stdout_string("show", output)?)
            }
            Revision::WorkingTree => {
                fs::read_to_string(self.root.join(path)).map_err(|e| read_error(path, e))
            }
        }
    }
}

fn run_git(dir: &Path, args: &[&str]) -> Result<Output, GitError> {
    let command = args.first().copied().unwrap_or_default().to_string();
    let output = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .map_err(|source| GitError::Spawn {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(GitError::Failed { command, stderr });
    }
    Ok(output)
}

fn stdout_string(command: &str, output: Output) -> Result<String, GitError> {
    String::from_utf8(output.stdout).map_err(|_| GitError::InvalidUtf8 {
        command: command.to_string(),
    })
}

fn read_error(path: &str, err: io::Error) -> ShulkrError {
    if err.kind() == io::ErrorKind::NotFound {
        ShulkrError::file_not_found(path)
    } else {
        ShulkrError::from(err)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod name_status {
        use super::*;

        #[test]
        fn parses_single_path_entries() {
            let files = parse_name_status("M\0src/A.java\0D\0src/B.java\0A\0src/C.java\0");
            assert_eq!(files.len(), 3);
            assert_eq!(files[0].status, ChangeStatus::Modified);
            assert_eq!(files[0].old_path, "src/A.java");
            assert_eq!(files[0].new_path, "src/A.java");
            assert_eq!(files[1].status, ChangeStatus::Deleted);
            assert_eq!(files[2].status, ChangeStatus::Added);
        }

        #[test]
        fn parses_renames_with_score() {
            let files = parse_name_status("R087\0old/A.java\0new/A.java\0M\0B.java\0");
            assert_eq!(files.len(), 2);
            assert_eq!(files[0].status, ChangeStatus::Renamed);
            assert_eq!(files[0].old_path, "old/A.java");
            assert_eq!(files[0].new_path, "new/A.java");
            assert_eq!(files[0].label(), "old/A.java -> new/A.java");
            assert_eq!(files[1].status, ChangeStatus::Modified);
        }

        #[test]
        fn empty_output_has_no_entries() {
            assert!(parse_name_status("").is_empty());
        }

        #[test]
        fn paths_with_spaces_survive() {
            let files = parse_name_status("M\0dir with space/A B.java\0");
            assert_eq!(files[0].new_path, "dir with space/A B.java");
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn git_failure_converts_to_git_error() {
            let err: ShulkrError = GitError::Failed {
                command: "show".to_string(),
                stderr: "fatal: bad revision".to_string(),
            }
            .into();
            assert_eq!(err.to_string(), "git show failed: fatal: bad revision");
        }

        #[test]
        fn revision_display() {
            assert_eq!(Revision::Commit("HEAD~1".to_string()).to_string(), "HEAD~1");
            assert_eq!(Revision::WorkingTree.to_string(), "working tree");
        }
    }
}
