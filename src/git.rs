//! Thin wrappers around the system `git` binary.
//!
//! Every function runs one `git -C <repo> ...` command. Failures to spawn
//! and non-zero exits both become `Error::GitCommand` with the command line,
//! the repository and git's stderr.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use crate::error::{Error, Result};

/// Author and committer recorded on a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
    /// Git internal date format: `{unix seconds} {+hhmm}`.
    pub date: String,
}

fn git_error(repo: &Path, args: &[&str], stderr: impl Into<String>) -> Error {
    Error::GitCommand {
        command: format!("git {}", args.join(" ")),
        repo: repo.display().to_string(),
        stderr: stderr.into(),
    }
}

fn output(repo: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
    Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .envs(envs.iter().copied())
        .output()
        .map_err(|e| git_error(repo, args, e.to_string()))
}

/// Runs a command that must succeed and returns its stdout.
fn run(repo: &Path, args: &[&str]) -> Result<String> {
    run_with_env(repo, args, &[])
}

fn run_with_env(repo: &Path, args: &[&str], envs: &[(&str, &str)]) -> Result<String> {
    let out = output(repo, args, envs)?;
    if !out.status.success() {
        return Err(git_error(
            repo,
            args,
            String::from_utf8_lossy(&out.stderr).trim(),
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Runs a query whose non-zero exit means "no".
fn query(repo: &Path, args: &[&str]) -> Result<Option<String>> {
    let out = output(repo, args, &[])?;
    if out.status.success() {
        Ok(Some(String::from_utf8_lossy(&out.stdout).trim().to_string()))
    } else {
        Ok(None)
    }
}

/// Initializes `repo` (creating it if needed) unless it already is a repository.
pub fn init(repo: &Path) -> Result<()> {
    fs::create_dir_all(repo)?;
    if repo.join(".git").exists() {
        return Ok(());
    }
    run(repo, &["init", "-q"])?;
    Ok(())
}

/// The commit HEAD points at, or `None` on an unborn branch.
pub fn head_commit(repo: &Path) -> Result<Option<String>> {
    query(repo, &["rev-parse", "--verify", "-q", "HEAD"])
}

pub fn current_branch(repo: &Path) -> Result<Option<String>> {
    query(repo, &["symbolic-ref", "--short", "-q", "HEAD"])
}

pub fn branch_exists(repo: &Path, branch: &str) -> Result<bool> {
    let reference = format!("refs/heads/{branch}");
    Ok(query(repo, &["show-ref", "--verify", "--quiet", &reference])?.is_some())
}

/// Points HEAD at `branch` without touching the working tree.
///
/// The index follows the branch tip when it exists; for an unborn branch
/// the next commit becomes a root commit.
pub fn switch_branch(repo: &Path, branch: &str) -> Result<()> {
    let reference = format!("refs/heads/{branch}");
    run(repo, &["symbolic-ref", "HEAD", &reference])?;
    if head_commit(repo)?.is_some() {
        run(repo, &["reset", "-q"])?;
    }
    Ok(())
}

/// Creates `branch` at `commit`.
pub fn create_branch(repo: &Path, branch: &str, commit: &str) -> Result<()> {
    run(repo, &["branch", branch, commit])?;
    Ok(())
}

/// Hash of the first commit on any ref whose full message equals `message`.
pub fn find_commit_by_message(repo: &Path, message: &str) -> Result<Option<String>> {
    if !has_any_branch(repo)? {
        return Ok(None);
    }
    let log = run(repo, &["log", "--all", "--format=%H%x00%B%x1e"])?;
    let wanted = message.trim_end();
    Ok(log
        .split('\u{1e}')
        .filter_map(|entry| entry.trim_start_matches('\n').split_once('\0'))
        .find(|(_, body)| body.trim_end() == wanted)
        .map(|(hash, _)| hash.to_string()))
}

fn has_any_branch(repo: &Path) -> Result<bool> {
    let refs = run(repo, &["for-each-ref", "--format=%(refname)", "refs/heads"])?;
    Ok(!refs.trim().is_empty())
}

/// Full message of the commit HEAD points at.
pub fn tip_message(repo: &Path) -> Result<Option<String>> {
    if head_commit(repo)?.is_none() {
        return Ok(None);
    }
    let message = run(repo, &["log", "-1", "--format=%B", "HEAD"])?;
    Ok(Some(message.trim_end().to_string()))
}

pub fn stage_all(repo: &Path) -> Result<()> {
    run(repo, &["add", "-A"])?;
    Ok(())
}

/// Commits the index, including an in-progress merge recorded in `MERGE_HEAD`.
pub fn commit(repo: &Path, message: &str, identity: &CommitIdentity) -> Result<()> {
    let envs = [
        ("GIT_AUTHOR_NAME", identity.name.as_str()),
        ("GIT_AUTHOR_EMAIL", identity.email.as_str()),
        ("GIT_AUTHOR_DATE", identity.date.as_str()),
        ("GIT_COMMITTER_NAME", identity.name.as_str()),
        ("GIT_COMMITTER_EMAIL", identity.email.as_str()),
        ("GIT_COMMITTER_DATE", identity.date.as_str()),
    ];
    run_with_env(
        repo,
        &[
            "commit",
            "-q",
            "--allow-empty",
            "--no-gpg-sign",
            "--no-verify",
            "-m",
            message,
        ],
        &envs,
    )?;
    Ok(())
}

/// Records additional parents for the next commit; an empty list clears them.
pub fn write_merge_heads(repo: &Path, commits: &[String]) -> Result<()> {
    let merge_head = repo.join(".git").join("MERGE_HEAD");
    if commits.is_empty() {
        if merge_head.exists() {
            fs::remove_file(merge_head)?;
        }
        return Ok(());
    }
    let mut content = commits.join("\n");
    content.push('\n');
    fs::write(&merge_head, content)?;
    Ok(())
}
