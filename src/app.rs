use std::path::Path;

use crate::config::{Config, InteractiveMode};
use crate::error::{Error, ErrorKind, Result};
use crate::git::Repository;
use crate::input::{stdin_is_terminal, Prompt, TerminalPrompt};
use crate::report::{self, StatusRow, SyncReport};
use crate::sync::{
    gather, recommend_action, BranchState, DivergenceChoice, ExecutorOptions, SyncExecutor,
};

/// How a command finished, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Success,
    Failure,
    /// Nothing failed, but the user has to act.
    ActionNeeded,
}

impl Exit {
    pub fn code(self) -> i32 {
        match self {
            Exit::Success => 0,
            Exit::Failure => 1,
            Exit::ActionNeeded => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub branch: Option<String>,
    pub no_fetch: bool,
    pub allow_stale: bool,
    pub yes: bool,
    pub strategy: Option<DivergenceChoice>,
}

pub struct App {
    config: Config,
    repo: Repository,
    interactive: bool,
    json: bool,
}

impl App {
    pub fn new(config: Config, dir: &Path, non_interactive: bool, json: bool) -> Result<Self> {
        let repo = Repository::discover(dir)?;
        let interactive = !non_interactive
            && match config.interactive {
                InteractiveMode::Always => true,
                InteractiveMode::Never => false,
                InteractiveMode::Auto => stdin_is_terminal(),
            };
        tracing::info!(path = %repo.path().display(), interactive, "opened repository");

        Ok(Self {
            config,
            repo,
            interactive,
            json,
        })
    }

    fn current_branch(&self) -> Result<String> {
        self.repo.head_name()?.ok_or_else(|| {
            Error::Git(git2::Error::from_str(
                "HEAD is detached; name the branch explicitly",
            ))
        })
    }

    /// Fetches `remote`. With `allow_stale`, an unreachable remote is
    /// reported as a warning and the caller carries on with what is known
    /// locally.
    fn fetch_remote(&self, remote: &str, allow_stale: bool) -> Result<()> {
        match self.repo.fetch(remote) {
            Err(e) if allow_stale && e.kind() == ErrorKind::Recoverable => {
                tracing::warn!(remote, error = %e, "continuing with stale remote state");
                eprintln!("warning: {}; continuing with stale remote state", e);
                Ok(())
            }
            other => other,
        }
    }

    pub fn status(&self, branches: Vec<String>, all: bool, fetch: bool) -> Result<Exit> {
        if fetch {
            self.fetch_remote(&self.config.git.default_remote, self.config.allow_stale)?;
        }

        let branches = if all {
            self.repo.branches()?.into_iter().map(|b| b.name).collect()
        } else if branches.is_empty() {
            vec![self.current_branch()?]
        } else {
            branches
        };

        // A single named branch fails loudly; a listing reports per row.
        if branches.len() == 1 {
            let state = gather(&self.repo, &branches[0])?;
            let row = StatusRow::new(branches[0].clone(), Ok(state), self.interactive);
            self.print_rows(&[row])?;
            return Ok(Exit::Success);
        }

        let rows: Vec<StatusRow> = gather_parallel(self.repo.path(), &branches)
            .into_iter()
            .map(|(branch, state)| StatusRow::new(branch, state, self.interactive))
            .collect();
        self.print_rows(&rows)?;

        if rows.iter().any(StatusRow::is_error) {
            Ok(Exit::Failure)
        } else {
            Ok(Exit::Success)
        }
    }

    fn print_rows(&self, rows: &[StatusRow]) -> Result<()> {
        if self.json {
            println!("{}", report::to_json(rows)?);
        } else {
            for row in rows {
                println!("{}", row.render());
            }
        }
        Ok(())
    }

    pub fn sync(&self, args: SyncArgs) -> Result<Exit> {
        let branch = match args.branch {
            Some(branch) => branch,
            None => self.current_branch()?,
        };
        let remote = self.config.git.default_remote.clone();

        if self.config.fetch_before_sync && !args.no_fetch {
            self.fetch_remote(&remote, args.allow_stale || self.config.allow_stale)?;
        }

        if self.repo.ensure_local_branch(&branch, &remote)? {
            eprintln!("Created local branch '{}' tracking {}/{}", branch, remote, branch);
        }

        let state = gather(&self.repo, &branch)?;
        let relation = state.relation();
        let action = recommend_action(relation, self.interactive);

        let options = ExecutorOptions {
            remote,
            interactive: self.interactive,
            assume_yes: args.yes,
            strategy: args.strategy,
        };
        let mut prompt = TerminalPrompt::stdio();
        let outcome = SyncExecutor::new(&self.repo, &mut prompt, options).execute(&state, action)?;
        tracing::info!(%branch, %relation, %outcome, "sync finished");

        let report = SyncReport {
            branch: &branch,
            relation,
            action,
            outcome: &outcome,
        };
        if self.json {
            println!("{}", report::to_json(&report)?);
        } else {
            println!("{}", report.render());
        }

        if outcome.is_action_needed() {
            Ok(Exit::ActionNeeded)
        } else {
            Ok(Exit::Success)
        }
    }

    pub fn fetch(&self, remote: Option<String>) -> Result<Exit> {
        let remote = remote.unwrap_or_else(|| self.config.git.default_remote.clone());
        self.repo.fetch(&remote)?;
        println!("Fetched {}", remote);
        Ok(Exit::Success)
    }

    pub fn list(&self) -> Result<Exit> {
        let branches = self.repo.branches()?;
        if self.json {
            println!("{}", report::to_json(&branches)?);
        } else {
            for branch in &branches {
                println!("{}", report::render_branch(branch));
            }
        }
        Ok(Exit::Success)
    }

    pub fn create(&self, name: &str, from: Option<&str>) -> Result<Exit> {
        let at = self.repo.create_branch(name, from)?;
        println!("Created branch '{}' at {}", name, at.short());
        Ok(Exit::Success)
    }

    pub fn delete(&self, name: &str, force: bool) -> Result<Exit> {
        if self.config.is_protected(name) {
            return Err(Error::Protected(name.to_string()));
        }
        self.repo.delete_branch(name, force)?;
        println!("Deleted branch '{}'", name);
        Ok(Exit::Success)
    }

    pub fn cleanup(&self, base: Option<String>, dry_run: bool) -> Result<Exit> {
        let base = base.unwrap_or_else(|| self.config.git.default_branch.clone());
        let current = self.repo.head_name()?;
        let candidates: Vec<String> = self
            .repo
            .merged_branches(&base)?
            .into_iter()
            .filter(|b| !self.config.is_protected(b) && current.as_deref() != Some(b.as_str()))
            .collect();

        if candidates.is_empty() {
            println!("No merged branches to clean up");
            return Ok(Exit::Success);
        }

        println!("Branches merged into '{}':", base);
        for branch in &candidates {
            println!("  {}", branch);
        }
        if dry_run {
            return Ok(Exit::Success);
        }

        if self.config.confirm_destructive {
            if !self.interactive {
                eprintln!("Refusing to delete without confirmation; rerun interactively");
                return Ok(Exit::ActionNeeded);
            }
            let mut prompt = TerminalPrompt::stdio();
            let question = format!("Delete {} branch(es)?", candidates.len());
            if !prompt.confirm(&question)? {
                println!("Cancelled");
                return Ok(Exit::Success);
            }
        }

        for branch in &candidates {
            // Already verified as merged into base, which need not be HEAD.
            self.repo.delete_branch(branch, true)?;
            println!("Deleted {}", branch);
        }
        Ok(Exit::Success)
    }
}

/// Gathers every branch on its own thread, each with its own repository
/// handle. Results come back in input order.
pub fn gather_parallel(path: &Path, branches: &[String]) -> Vec<(String, Result<BranchState>)> {
    std::thread::scope(|scope| {
        let handles: Vec<_> = branches
            .iter()
            .map(|branch| {
                scope.spawn(move || {
                    let repo = Repository::open(path)?;
                    gather(&repo, branch)
                })
            })
            .collect();

        handles
            .into_iter()
            .zip(branches)
            .map(|(handle, branch)| {
                let state = handle.join().unwrap_or_else(|_| {
                    Err(Error::Io(std::io::Error::other(format!(
                        "worker for '{}' panicked",
                        branch
                    ))))
                });
                (branch.clone(), state)
            })
            .collect()
    })
}
