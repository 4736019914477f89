//! Test helper functions and utilities
//!
//! Git helpers build throwaway repositories with the `git` binary. Tests that
//! need them call [`git_available`] first and return early when it is missing.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Whether a `git` binary is on the PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run git in `dir`, panicking with its stderr on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "depsync")
        .env("GIT_AUTHOR_EMAIL", "depsync@example.com")
        .env("GIT_COMMITTER_NAME", "depsync")
        .env("GIT_COMMITTER_EMAIL", "depsync@example.com")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Create `<host_dir>/<name>.git` with a `master` branch and a `v1` tag, each
/// carrying its own `depsync.package.json`.
pub fn create_package_repo(
    host_dir: &Path,
    name: &str,
    v1_deps: &[&str],
    master_deps: &[&str],
) -> PathBuf {
    let repo = host_dir.join(format!("{}.git", name));
    std::fs::create_dir_all(&repo).expect("Failed to create repo dir");
    git(&repo, &["init", "-q"]);
    git(&repo, &["symbolic-ref", "HEAD", "refs/heads/master"]);

    write_package_info(&repo, v1_deps);
    std::fs::write(repo.join("README.md"), format!("# {} v1\n", name)).unwrap();
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-q", "-m", "v1"]);
    git(&repo, &["tag", "v1"]);

    write_package_info(&repo, master_deps);
    std::fs::write(repo.join("README.md"), format!("# {} master\n", name)).unwrap();
    git(&repo, &["add", "-A"]);
    git(&repo, &["commit", "-q", "-m", "master"]);
    repo
}

/// Give a clone a local identity so stash and commit work without global config
pub fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "depsync"]);
    git(dir, &["config", "user.email", "depsync@example.com"]);
}

fn write_package_info(repo: &Path, dependencies: &[&str]) {
    let info = serde_json::json!({ "dependencies": dependencies });
    std::fs::write(
        repo.join("depsync.package.json"),
        serde_json::to_string_pretty(&info).unwrap(),
    )
    .unwrap();
}

/// `file://` url of a local directory
pub fn file_url(path: &Path) -> String {
    url::Url::from_directory_path(path)
        .expect("Path must be absolute")
        .to_string()
        .trim_end_matches('/')
        .to_string()
}
