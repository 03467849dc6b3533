use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{build::CheckoutBuilder, Repository as Git2Repository, RepositoryState, StatusOptions};

use crate::error::{Error, Result};
use crate::sync::{CommitId, SyncOps, VersionControl};

use super::branch::BranchInfo;
use super::commit::CommitInfo;

pub struct Repository {
    repo: Git2Repository,
    path: PathBuf,
}

impl Repository {
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let repo = Git2Repository::discover(dir).map_err(|e| not_a_repository(dir, e))?;
        Ok(Self::wrap(repo))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repository::open(path).map_err(|e| not_a_repository(path, e))?;
        Ok(Self::wrap(repo))
    }

    fn wrap(repo: Git2Repository) -> Self {
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        Self { repo, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn head_name(&self) -> Result<Option<String>> {
        let head = self.repo.head()?;
        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            // Detached HEAD
            Ok(None)
        }
    }

    /// True when tracked files match HEAD. Untracked files are ignored.
    pub fn is_clean(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(statuses.is_empty())
    }

    fn find_local(&self, name: &str) -> Result<git2::Branch<'_>> {
        self.repo
            .find_branch(name, git2::BranchType::Local)
            .map_err(|e| match e.code() {
                git2::ErrorCode::NotFound => Error::BranchNotFound(name.to_string()),
                _ => Error::Git(e),
            })
    }

    fn is_checked_out(&self, branch: &str) -> bool {
        matches!(self.head_name(), Ok(Some(head)) if head == branch)
    }

    /// Checked-out branch with no uncommitted changes; required before
    /// anything that rewrites the worktree.
    fn require_checked_out_and_clean(&self, branch: &str) -> Result<()> {
        if !self.is_checked_out(branch) {
            return Err(Error::NotCheckedOut(branch.to_string()));
        }
        if !self.is_clean()? {
            return Err(Error::DirtyWorktree);
        }
        Ok(())
    }

    // Branch operations
    pub fn branches(&self) -> Result<Vec<BranchInfo>> {
        let mut branches = Vec::new();

        for branch_result in self.repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = branch_result?;
            let name = branch.name()?.unwrap_or("").to_string();
            let is_head = branch.is_head();

            let commit = branch.get().peel_to_commit()?;
            let last_commit = CommitInfo::from_commit(&commit);

            let (upstream, ahead, behind) = match branch.upstream() {
                Ok(upstream) => {
                    let upstream_name = upstream.name()?.map(|s| s.to_string());
                    let upstream_oid = upstream.get().peel_to_commit()?.id();
                    let (ahead, behind) = self
                        .repo
                        .graph_ahead_behind(commit.id(), upstream_oid)
                        .unwrap_or((0, 0));
                    (upstream_name, ahead, behind)
                }
                Err(_) => (None, 0, 0),
            };

            branches.push(BranchInfo {
                name,
                is_head,
                last_commit,
                upstream,
                ahead,
                behind,
            });
        }

        Ok(branches)
    }

    pub fn create_branch(&self, name: &str, target: Option<&str>) -> Result<CommitId> {
        let commit = match target {
            Some(rev) => self.repo.revparse_single(rev)?.peel_to_commit()?,
            None => self.repo.head()?.peel_to_commit()?,
        };

        self.repo.branch(name, &commit, false)?;
        tracing::info!(branch = name, at = %commit.id(), "created branch");
        Ok(CommitId::from(commit.id()))
    }

    pub fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        let mut branch = self.find_local(name)?;

        if branch.is_head() {
            return Err(Error::Git(git2::Error::from_str("Cannot delete current branch")));
        }

        if !force {
            let branch_oid = branch.get().peel_to_commit()?.id();
            let head_oid = self.repo.head()?.peel_to_commit()?.id();
            if !self.is_merged_into(branch_oid, head_oid) {
                return Err(Error::Git(git2::Error::from_str(&format!(
                    "Branch '{}' is not fully merged. Use --force to delete it anyway.",
                    name
                ))));
            }
        }

        branch.delete()?;
        tracing::info!(branch = name, force, "deleted branch");
        Ok(())
    }

    fn is_merged_into(&self, branch: git2::Oid, base: git2::Oid) -> bool {
        self.repo
            .merge_base(branch, base)
            .map(|merge_base| merge_base == branch)
            .unwrap_or(false)
    }

    /// Local branches, other than `base` itself, whose tip is reachable from `base`.
    pub fn merged_branches(&self, base: &str) -> Result<Vec<String>> {
        let base_oid = self.find_local(base)?.get().peel_to_commit()?.id();
        let mut merged = Vec::new();

        for branch_result in self.repo.branches(Some(git2::BranchType::Local))? {
            let (branch, _) = branch_result?;
            let Some(name) = branch.name()?.map(|s| s.to_string()) else {
                continue;
            };
            if name == base {
                continue;
            }
            let oid = branch.get().peel_to_commit()?.id();
            if self.is_merged_into(oid, base_oid) {
                merged.push(name);
            }
        }

        merged.sort();
        Ok(merged)
    }

    /// Makes sure a local `branch` exists, creating a tracking branch from
    /// `<remote>/<branch>` when only the remote has it. Returns whether a
    /// branch was created.
    pub fn ensure_local_branch(&self, branch: &str, remote: &str) -> Result<bool> {
        match self.find_local(branch) {
            Ok(_) => return Ok(false),
            Err(Error::BranchNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let remote_name = format!("{}/{}", remote, branch);
        let remote_branch = match self.repo.find_branch(&remote_name, git2::BranchType::Remote) {
            Ok(b) => b,
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                return Err(Error::BranchNotFound(branch.to_string()));
            }
            Err(e) => return Err(Error::Git(e)),
        };

        let commit = remote_branch.get().peel_to_commit()?;
        let mut local = self.repo.branch(branch, &commit, false)?;
        local.set_upstream(Some(&remote_name))?;
        tracing::info!(branch, upstream = %remote_name, "created tracking branch");
        Ok(true)
    }

    // Remote operations
    /// Fetches through the `git` binary so the user's credential helpers apply.
    pub fn fetch(&self, remote_name: &str) -> Result<()> {
        self.repo.find_remote(remote_name)?;
        tracing::info!(remote = remote_name, "fetching");

        self.run_git(&["fetch", "--prune", remote_name])
            .map(|_| ())
            .map_err(|e| match e {
                Error::GitCommand { message, .. } => Error::RemoteUnreachable {
                    remote: remote_name.to_string(),
                    message,
                },
                other => other,
            })
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        tracing::debug!(args = ?args, "running git");
        let output = Command::new("git")
            .current_dir(&self.path)
            .args(args)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(args = ?args, %stderr, "git failed");
            return Err(Error::GitCommand {
                command: args.join(" "),
                message: stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Remote name and remote ref of `branch`'s upstream, e.g.
    /// `("origin", "refs/heads/main")`.
    fn upstream_target(&self, branch: &str) -> Result<(String, String)> {
        let refname = format!("refs/heads/{}", branch);
        let remote = self.repo.branch_upstream_remote(&refname)?;
        let remote = remote
            .as_str()
            .ok_or_else(|| git2::Error::from_str("upstream remote is not valid UTF-8"))?;
        let merge = self
            .repo
            .config()?
            .get_string(&format!("branch.{}.merge", branch))?;
        Ok((remote.to_string(), merge))
    }

    fn is_rebasing(&self) -> bool {
        matches!(
            self.repo.state(),
            RepositoryState::Rebase | RepositoryState::RebaseInteractive | RepositoryState::RebaseMerge
        )
    }

    fn commit_merge(&self, branch: &str, upstream: &git2::Commit) -> Result<()> {
        let mut index = self.repo.index()?;
        let oid = index.write_tree()?;
        let tree = self.repo.find_tree(oid)?;

        let head = self.repo.head()?.peel_to_commit()?;
        let signature = self.repo.signature()?;
        let upstream_label = self
            .upstream_name(branch)?
            .unwrap_or_else(|| upstream.id().to_string());
        let message = format!(
            "Merge remote-tracking branch '{}' into {}",
            upstream_label, branch
        );

        self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&head, upstream],
        )?;

        self.repo.cleanup_state()?;
        Ok(())
    }
}

impl VersionControl for Repository {
    fn local_commit(&self, branch: &str) -> Result<CommitId> {
        let commit = self.find_local(branch)?.get().peel_to_commit()?;
        Ok(CommitId::from(commit.id()))
    }

    /// `Ok(None)` only when no upstream is configured. A configured
    /// upstream whose tracking ref no longer exists is `UpstreamGone`.
    fn upstream_commit(&self, branch: &str) -> Result<Option<CommitId>> {
        self.find_local(branch)?;

        let refname = format!("refs/heads/{}", branch);
        let tracking = match self.repo.branch_upstream_name(&refname) {
            Ok(name) => name
                .as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| git2::Error::from_str("upstream ref is not valid UTF-8"))?,
            Err(e) if e.code() == git2::ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(Error::Git(e)),
        };

        match self.repo.find_reference(&tracking) {
            Ok(reference) => Ok(Some(CommitId::from(reference.peel_to_commit()?.id()))),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Err(Error::UpstreamGone {
                branch: branch.to_string(),
                upstream: short_refname(&tracking).to_string(),
            }),
            Err(e) => Err(Error::Git(e)),
        }
    }

    fn merge_base(&self, local: &CommitId, upstream: &CommitId) -> Result<Option<CommitId>> {
        let local = git2::Oid::from_str(local.as_str())?;
        let upstream = git2::Oid::from_str(upstream.as_str())?;
        match self.repo.merge_base(local, upstream) {
            Ok(oid) => Ok(Some(CommitId::from(oid))),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
            Err(e) => Err(Error::Git(e)),
        }
    }

    fn upstream_name(&self, branch: &str) -> Result<Option<String>> {
        let local = self.find_local(branch)?;
        let name = match local.upstream() {
            Ok(upstream) => upstream.name()?.map(|s| s.to_string()),
            Err(_) => None,
        };
        Ok(name)
    }

    fn ahead_behind(&self, local: &CommitId, upstream: &CommitId) -> Result<(usize, usize)> {
        let local = git2::Oid::from_str(local.as_str())?;
        let upstream = git2::Oid::from_str(upstream.as_str())?;
        Ok(self.repo.graph_ahead_behind(local, upstream)?)
    }
}

impl SyncOps for Repository {
    fn push_set_upstream(&self, branch: &str, remote: &str) -> Result<()> {
        self.run_git(&["push", "--set-upstream", remote, branch])?;
        tracing::info!(branch, remote, "pushed with upstream");
        Ok(())
    }

    fn push(&self, branch: &str) -> Result<()> {
        let (remote, merge) = self.upstream_target(branch)?;
        let refspec = format!("refs/heads/{}:{}", branch, merge);
        self.run_git(&["push", &remote, &refspec])?;
        tracing::info!(branch, %remote, "pushed");
        Ok(())
    }

    fn force_push(&self, branch: &str) -> Result<()> {
        let (remote, merge) = self.upstream_target(branch)?;
        let refspec = format!("refs/heads/{}:{}", branch, merge);
        self.run_git(&["push", "--force-with-lease", &remote, &refspec])?;
        tracing::warn!(branch, %remote, "force-pushed");
        Ok(())
    }

    fn fast_forward(&self, branch: &str, target: &CommitId) -> Result<()> {
        let target_oid = git2::Oid::from_str(target.as_str())?;
        let mut reference = self.find_local(branch)?.into_reference();
        let current = reference.peel_to_commit()?.id();

        if current == target_oid {
            return Ok(());
        }
        if !self.repo.graph_descendant_of(target_oid, current)? {
            return Err(Error::Git(git2::Error::from_str(&format!(
                "'{}' cannot be fast-forwarded to {}",
                branch,
                target.short()
            ))));
        }

        // Update the worktree first so a refused checkout leaves the ref alone.
        if self.is_checked_out(branch) {
            let target_commit = self.repo.find_object(target_oid, None)?;
            self.repo
                .checkout_tree(&target_commit, Some(CheckoutBuilder::new().safe()))?;
        }

        reference.set_target(target_oid, "branchsync: fast-forward")?;
        tracing::info!(branch, to = %target.short(), "fast-forwarded");
        Ok(())
    }

    fn merge_upstream(&self, branch: &str, upstream: &CommitId) -> Result<MergeResult> {
        self.require_checked_out_and_clean(branch)?;

        let upstream_oid = git2::Oid::from_str(upstream.as_str())?;
        let annotated = self.repo.find_annotated_commit(upstream_oid)?;
        let (analysis, _) = self.repo.merge_analysis(&[&annotated])?;

        if analysis.contains(git2::MergeAnalysis::ANALYSIS_UP_TO_DATE) {
            return Ok(MergeResult::UpToDate);
        }

        if analysis.contains(git2::MergeAnalysis::ANALYSIS_FASTFORWARD) {
            self.fast_forward(branch, upstream)?;
            return Ok(MergeResult::FastForward);
        }

        self.repo.merge(&[&annotated], None, None)?;

        if self.repo.index()?.has_conflicts() {
            tracing::warn!(branch, "merge stopped with conflicts");
            Ok(MergeResult::Conflict)
        } else {
            let upstream_commit = self.repo.find_commit(upstream_oid)?;
            self.commit_merge(branch, &upstream_commit)?;
            tracing::info!(branch, "merged upstream");
            Ok(MergeResult::Merged)
        }
    }

    fn rebase_onto_upstream(&self, branch: &str) -> Result<RebaseResult> {
        self.require_checked_out_and_clean(branch)?;
        match self.run_git(&["rebase", "@{upstream}"]) {
            Ok(_) => {
                tracing::info!(branch, "rebased onto upstream");
                Ok(RebaseResult::Rebased)
            }
            Err(e) if self.is_rebasing() => {
                tracing::warn!(branch, error = %e, "rebase stopped with conflicts");
                Ok(RebaseResult::Conflict)
            }
            Err(e) => Err(e),
        }
    }
}

fn not_a_repository(path: &Path, err: git2::Error) -> Error {
    match err.code() {
        git2::ErrorCode::NotFound => Error::NotARepository(path.to_path_buf()),
        _ => Error::Git(err),
    }
}

fn short_refname(refname: &str) -> &str {
    refname
        .strip_prefix("refs/remotes/")
        .or_else(|| refname.strip_prefix("refs/heads/"))
        .unwrap_or(refname)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebaseResult {
    Rebased,
    /// Stopped on conflicts; the repository is left mid-rebase.
    Conflict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeResult {
    UpToDate,
    FastForward,
    Merged,
    Conflict,
}
