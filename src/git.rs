//! Driver for the system `git` command.
//!
//! Every function here runs git as a subprocess and interprets its output.
//! Using the system git means the bridge automatically honours:
//! - SSH keys from ~/.ssh/
//! - Git credential helpers
//! - Any authentication configured in ~/.gitconfig
//! - The git-lfs filters installed on the host
//!
//! Additional `-c key=value` overrides come from [`Config`]. Prompts are
//! disabled so that a missing credential fails instead of blocking.

use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::config::Config;
use crate::error::{Error, Result, Stage};
use crate::locator::LfsPolicy;
use crate::repository::CheckoutRequest;
use crate::revision::CommitId;

/// One ref advertised by a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// Full refname, e.g. `refs/heads/main`, or `HEAD`.
    pub name: String,
    /// The commit the ref points at, peeled for annotated tags.
    pub commit: CommitId,
}

/// The refs a remote advertises, in the order it listed them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRefs {
    entries: Vec<RemoteRef>,
}

impl RemoteRefs {
    pub fn from_entries(entries: Vec<(String, CommitId)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, commit)| RemoteRef { name, commit })
                .collect(),
        }
    }

    /// Parse `git ls-remote` output (`<oid>\t<refname>` per line).
    ///
    /// A peeled line (`refs/tags/v1^{}`) replaces the tag object id of the
    /// preceding `refs/tags/v1` line with the commit it points at.
    pub fn from_ls_remote(stdout: &str) -> Self {
        let mut refs = Self::default();
        for line in stdout.lines() {
            let Some((oid, name)) = line.split_once('\t') else {
                continue;
            };
            let Some(commit) = CommitId::parse(oid) else {
                continue;
            };

            if let Some(tag) = name.strip_suffix("^{}") {
                match refs.entries.iter_mut().find(|r| r.name == tag) {
                    Some(existing) => existing.commit = commit,
                    None => refs.entries.push(RemoteRef {
                        name: tag.to_string(),
                        commit,
                    }),
                }
            } else if !refs.entries.iter().any(|r| r.name == name) {
                refs.entries.push(RemoteRef {
                    name: name.to_string(),
                    commit,
                });
            }
        }
        refs
    }

    pub fn get(&self, refname: &str) -> Option<&RemoteRef> {
        self.entries.iter().find(|r| r.name == refname)
    }

    /// The remote's default branch tip.
    pub fn head(&self) -> Option<&RemoteRef> {
        self.get("HEAD")
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteRef> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build a git command with the configured overrides applied.
fn git_command(config: &Config, cwd: Option<&Path>) -> Command {
    let mut cmd = Command::new(&config.git_binary);
    cmd.args(config.git_config_args());
    if let Some(cwd) = cwd {
        cmd.arg("-C").arg(cwd);
    }
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// Run git and return its output, whatever the exit status.
fn run<I, S>(
    config: &Config,
    cwd: Option<&Path>,
    args: I,
    envs: &[(&str, &str)],
    stage: Stage,
) -> Result<Output>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = git_command(config, cwd);
    cmd.args(args);
    for (key, value) in envs {
        cmd.env(key, value);
    }
    debug!("running {:?}", cmd);

    cmd.output().map_err(|e| Error::GitCommand {
        stage,
        command: format!("{:?}", cmd.get_args().collect::<Vec<_>>()),
        stderr: format!(
            "could not run {}: {}",
            config.git_binary.display(),
            e
        ),
    })
}

/// Run git and return stdout, turning a non-zero exit into `GitCommand`.
fn run_checked(config: &Config, cwd: Option<&Path>, args: &[&str], stage: Stage) -> Result<String> {
    let output = run(config, cwd, args, &[], stage)?;
    if !output.status.success() {
        return Err(Error::GitCommand {
            stage,
            command: args.first().copied().unwrap_or_default().to_string(),
            stderr: stderr_of(&output),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// Whether a fetch failure means the remote does not have what was asked for
/// (as opposed to the remote not being reachable at all).
fn is_missing_ref(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("couldn't find remote ref")
        || stderr.contains("not our ref")
        || stderr.contains("unadvertised object")
        || stderr.contains("no such remote ref")
        || stderr.contains("unknown revision")
}

fn is_lfs_failure(stderr: &str) -> bool {
    let stderr = stderr.to_lowercase();
    stderr.contains("lfs")
        || stderr.contains("smudge")
        || stderr.contains("error downloading object")
}

/// Map a failed `git checkout` to the error it stands for under `lfs`.
fn checkout_failure(remote: &str, lfs: LfsPolicy, stderr: String) -> Error {
    if lfs != LfsPolicy::Off && is_lfs_failure(&stderr) {
        Error::LfsFetch {
            remote: remote.to_string(),
            message: stderr,
        }
    } else {
        Error::GitCommand {
            stage: Stage::Materialize,
            command: "checkout".to_string(),
            stderr,
        }
    }
}

/// Escape the gitignore glob metacharacters of a literal path, for use in
/// sparse-checkout and `git lfs` include patterns.
fn escape_glob(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for c in path.chars() {
        if matches!(c, '\\' | '*' | '?' | '[' | ']' | '!') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Enumerate the refs of a remote with `git ls-remote`.
pub fn ls_remote(config: &Config, remote: &str) -> Result<RemoteRefs> {
    let output = run(config, None, ["ls-remote", remote], &[], Stage::Resolve)?;
    if !output.status.success() {
        return Err(Error::RemoteUnreachable {
            stage: Stage::Resolve,
            remote: remote.to_string(),
            message: stderr_of(&output),
        });
    }
    Ok(RemoteRefs::from_ls_remote(&String::from_utf8_lossy(
        &output.stdout,
    )))
}

/// Expand an abbreviated commit id by fetching all branches and tags into a
/// scratch bare repository and asking git to disambiguate.
pub fn expand_abbreviated_commit(
    config: &Config,
    remote: &str,
    prefix: &str,
) -> Result<Option<CommitId>> {
    let scratch = tempfile::Builder::new().prefix("scm-bridge-refs-").tempdir()?;
    run_checked(
        config,
        None,
        &["init", "-q", "--bare", &scratch.path().display().to_string()],
        Stage::Resolve,
    )?;

    let output = run(
        config,
        Some(scratch.path()),
        [
            "fetch",
            "-q",
            "--no-tags",
            remote,
            "+refs/heads/*:refs/heads/*",
            "+refs/tags/*:refs/tags/*",
        ],
        &[],
        Stage::Resolve,
    )?;
    if !output.status.success() {
        return Err(Error::RemoteUnreachable {
            stage: Stage::Resolve,
            remote: remote.to_string(),
            message: stderr_of(&output),
        });
    }

    let output = run(
        config,
        Some(scratch.path()),
        [
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("{}^{{commit}}", prefix),
        ],
        &[],
        Stage::Resolve,
    )?;
    if !output.status.success() {
        return Ok(None);
    }
    Ok(CommitId::parse(&String::from_utf8_lossy(&output.stdout)))
}

/// Materialize `request` into `dir` and return the resulting HEAD.
///
/// 1. `git init` + `remote add origin`
/// 2. sparse checkout of `/<subdir>/` when a subdir is requested
/// 3. fetch of the refname (or bare commit id), shallow when eligible
/// 4. detached checkout of what was fetched, with the LFS policy applied
/// 5. `git lfs pull` when LFS is forced on
pub fn checkout(config: &Config, request: &CheckoutRequest, dir: &Path) -> Result<CommitId> {
    let remote = request.remote.as_str();
    let dir_arg = dir.display().to_string();

    run_checked(config, None, &["init", "-q", &dir_arg], Stage::Materialize)?;
    run_checked(
        config,
        Some(dir),
        &["remote", "add", "origin", remote],
        Stage::Materialize,
    )?;

    if let Some(subdir) = &request.subdir {
        enable_sparse_checkout(config, dir, subdir)?;
    }

    let commit = request.revision.commit().to_string();
    let target = request.revision.refname().unwrap_or(&commit);
    let mut fetch_args = vec!["fetch".to_string(), "-q".to_string(), "--no-tags".to_string()];
    if let Some(depth) = request.revision.fetch_depth() {
        fetch_args.push(format!("--depth={}", depth));
    }
    fetch_args.push("origin".to_string());
    fetch_args.push(target.to_string());

    let output = run(config, Some(dir), &fetch_args, &[], Stage::Materialize)?;
    if !output.status.success() {
        let stderr = stderr_of(&output);
        return Err(if is_missing_ref(&stderr) {
            Error::RefNotFound {
                remote: remote.to_string(),
                refspec: target.to_string(),
                reason: stderr,
            }
        } else {
            Error::RemoteUnreachable {
                stage: Stage::Materialize,
                remote: remote.to_string(),
                message: stderr,
            }
        });
    }

    let mut checkout_args = vec!["-c", "advice.detachedHead=false"];
    let mut envs = Vec::new();
    match request.lfs {
        LfsPolicy::Auto => {}
        LfsPolicy::On => envs.push(("GIT_LFS_SKIP_SMUDGE", "1")),
        LfsPolicy::Off => {
            envs.push(("GIT_LFS_SKIP_SMUDGE", "1"));
            checkout_args.extend(["-c", "filter.lfs.required=false"]);
        }
    }
    checkout_args.extend(["checkout", "-q", "--detach", "FETCH_HEAD"]);

    let output = run(config, Some(dir), &checkout_args, &envs, Stage::Materialize)?;
    if !output.status.success() {
        return Err(checkout_failure(remote, request.lfs, stderr_of(&output)));
    }

    if request.lfs == LfsPolicy::On {
        lfs_pull(config, dir, remote, request.subdir.as_deref())?;
    }

    let head = run_checked(config, Some(dir), &["rev-parse", "HEAD"], Stage::Materialize)?;
    CommitId::parse(&head).ok_or_else(|| Error::GitCommand {
        stage: Stage::Materialize,
        command: "rev-parse".to_string(),
        stderr: format!("unexpected HEAD '{}'", head.trim()),
    })
}

/// Restrict the working tree to one directory with a non-cone sparse
/// checkout. Cone mode would also keep the files at the repository root.
fn enable_sparse_checkout(config: &Config, dir: &Path, subdir: &str) -> Result<()> {
    run_checked(
        config,
        Some(dir),
        &["config", "core.sparseCheckout", "true"],
        Stage::Materialize,
    )?;
    run_checked(
        config,
        Some(dir),
        &["config", "core.sparseCheckoutCone", "false"],
        Stage::Materialize,
    )?;

    let info_dir = dir.join(".git").join("info");
    fs::create_dir_all(&info_dir)?;
    let pattern = format!("/{}/\n", escape_glob(subdir));
    fs::write(info_dir.join("sparse-checkout"), pattern)?;
    Ok(())
}

fn lfs_pull(config: &Config, dir: &Path, remote: &str, subdir: Option<&str>) -> Result<()> {
    let mut args = vec!["lfs".to_string(), "pull".to_string()];
    if let Some(subdir) = subdir {
        args.push("--include".to_string());
        args.push(format!("{}/**", escape_glob(subdir)));
    }

    let output = run(config, Some(dir), &args, &[], Stage::Materialize)?;
    if !output.status.success() {
        return Err(Error::LfsFetch {
            remote: remote.to_string(),
            message: stderr_of(&output),
        });
    }
    Ok(())
}

/// A single `git ls-tree` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: String,
    pub kind: String,
    pub oid: String,
    pub path: String,
}

impl TreeEntry {
    pub fn is_gitlink(&self) -> bool {
        self.mode == "160000" && self.kind == "commit"
    }
}

/// Parse NUL-terminated `git ls-tree -z` output.
pub fn parse_ls_tree(stdout: &str) -> Vec<TreeEntry> {
    stdout
        .split('\0')
        .filter_map(|record| {
            let (meta, path) = record.split_once('\t')?;
            let mut fields = meta.split_whitespace();
            Some(TreeEntry {
                mode: fields.next()?.to_string(),
                kind: fields.next()?.to_string(),
                oid: fields.next()?.to_string(),
                path: path.to_string(),
            })
        })
        .collect()
}

/// Read the commit recorded for the gitlink at `path` in HEAD.
pub fn read_gitlink(config: &Config, dir: &Path, path: &str) -> Result<Option<CommitId>> {
    let stdout = run_checked(
        config,
        Some(dir),
        &["ls-tree", "-z", "HEAD", "--", path],
        Stage::Traverse,
    )?;

    Ok(parse_ls_tree(&stdout)
        .into_iter()
        .find(|entry| entry.path == path && entry.is_gitlink())
        .and_then(|entry| CommitId::parse(&entry.oid)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAIN: &str = "1111111111111111111111111111111111111111";
    const TAG_OBJECT: &str = "2222222222222222222222222222222222222222";
    const TAG_COMMIT: &str = "3333333333333333333333333333333333333333";

    #[test]
    fn test_remote_refs_from_ls_remote() {
        let stdout = format!(
            "{MAIN}\tHEAD\n{MAIN}\trefs/heads/main\n{TAG_OBJECT}\trefs/tags/v1.0\n{TAG_COMMIT}\trefs/tags/v1.0^{{}}\n"
        );
        let refs = RemoteRefs::from_ls_remote(&stdout);

        assert_eq!(refs.head().unwrap().commit.as_str(), MAIN);
        assert_eq!(refs.get("refs/heads/main").unwrap().commit.as_str(), MAIN);
        // peeled commit replaces the tag object
        assert_eq!(refs.get("refs/tags/v1.0").unwrap().commit.as_str(), TAG_COMMIT);
        assert_eq!(refs.iter().count(), 3);
    }

    #[test]
    fn test_remote_refs_skips_garbage_lines() {
        let stdout = format!("warning: redirecting\n{MAIN}\trefs/heads/main\nnot-a-sha\trefs/heads/x\n");
        let refs = RemoteRefs::from_ls_remote(&stdout);
        assert_eq!(refs.iter().count(), 1);
        assert!(refs.get("refs/heads/x").is_none());
    }

    #[test]
    fn test_remote_refs_empty() {
        let refs = RemoteRefs::from_ls_remote("");
        assert!(refs.is_empty());
        assert!(refs.head().is_none());
    }

    #[test]
    fn test_parse_ls_tree() {
        let stdout = format!(
            "160000 commit {MAIN}\taaa_base\0100644 blob {TAG_OBJECT}\tREADME.md\0"
        );
        let entries = parse_ls_tree(&stdout);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_gitlink());
        assert_eq!(entries[0].path, "aaa_base");
        assert_eq!(entries[0].oid, MAIN);
        assert!(!entries[1].is_gitlink());
    }

    #[test]
    fn test_parse_ls_tree_path_with_spaces() {
        let stdout = format!("160000 commit {MAIN}\tpkgs/my module\0");
        let entries = parse_ls_tree(&stdout);
        assert_eq!(entries[0].path, "pkgs/my module");
    }

    #[test]
    fn test_is_missing_ref() {
        assert!(is_missing_ref("fatal: couldn't find remote ref refs/heads/gone"));
        assert!(is_missing_ref(
            "error: Server does not allow request for unadvertised object abc"
        ));
        assert!(!is_missing_ref(
            "fatal: '/srv/missing' does not appear to be a git repository"
        ));
    }

    #[test]
    fn test_is_lfs_failure() {
        assert!(is_lfs_failure(
            "Error downloading object: big.bin (abc): Smudge error"
        ));
        assert!(is_lfs_failure(
            "error: external filter 'git-lfs filter-process' failed"
        ));
        assert!(is_lfs_failure("smudge filter lfs failed"));
        assert!(!is_lfs_failure("error: pathspec 'x' did not match"));
    }

    #[test]
    fn test_checkout_failure_maps_lfs_errors() {
        let stderr = "Error downloading object: big.bin (abc): Smudge error".to_string();
        let error = checkout_failure("/srv/assets", LfsPolicy::On, stderr.clone());
        assert!(matches!(error, Error::LfsFetch { .. }), "{:?}", error);
        let error = checkout_failure("/srv/assets", LfsPolicy::Auto, stderr.clone());
        assert!(matches!(error, Error::LfsFetch { .. }), "{:?}", error);

        // with LFS off the filter never runs, so the failure is git's own
        let error = checkout_failure("/srv/assets", LfsPolicy::Off, stderr);
        assert!(matches!(error, Error::GitCommand { .. }), "{:?}", error);
        let error = checkout_failure(
            "/srv/assets",
            LfsPolicy::On,
            "error: pathspec 'x' did not match".to_string(),
        );
        assert!(matches!(error, Error::GitCommand { .. }), "{:?}", error);
    }

    #[test]
    fn test_escape_glob() {
        assert_eq!(escape_glob("pkgs/ring0"), "pkgs/ring0");
        assert_eq!(escape_glob("pkg[1]"), "pkg\\[1\\]");
        assert_eq!(escape_glob("a*b?c!d\\e"), "a\\*b\\?c\\!d\\\\e");
    }

    #[test]
    fn test_ls_remote_missing_binary_is_git_command_error() {
        let config = Config::default().with_git_binary("/nonexistent/git-binary");
        let error = ls_remote(&config, "/srv/repo").unwrap_err();
        assert!(matches!(error, Error::GitCommand { .. }));
        assert!(error.to_string().contains("/nonexistent/git-binary"));
    }
}
