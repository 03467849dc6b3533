use serde::Serialize;

use crate::error::Result;
use crate::git::{MergeResult, RebaseResult};
use crate::input::Prompt;

use super::action::{Action, DivergenceChoice};
use super::state::{BranchState, CommitId};

/// Side effects the executor may perform on a repository.
pub trait SyncOps {
    fn push_set_upstream(&self, branch: &str, remote: &str) -> Result<()>;
    fn push(&self, branch: &str) -> Result<()>;
    /// Overwrites the upstream, guarded by a lease on its last known commit.
    fn force_push(&self, branch: &str) -> Result<()>;
    fn fast_forward(&self, branch: &str, target: &CommitId) -> Result<()>;
    fn merge_upstream(&self, branch: &str, upstream: &CommitId) -> Result<MergeResult>;
    fn rebase_onto_upstream(&self, branch: &str) -> Result<RebaseResult>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "kebab-case")]
pub enum Outcome {
    Nothing,
    Pushed,
    PushedWithUpstream,
    FastForwarded,
    Merged,
    /// Merge stopped with conflicts left in the index for the user.
    MergeConflict,
    Rebased,
    /// Rebase stopped with conflicts; the repository is mid-rebase.
    RebaseConflict,
    ForcePushed,
    Declined,
    /// Not a failure: the user has to step in.
    ActionNeeded(String),
}

impl Outcome {
    pub fn is_action_needed(&self) -> bool {
        matches!(
            self,
            Outcome::ActionNeeded(_) | Outcome::MergeConflict | Outcome::RebaseConflict
        )
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Nothing => f.write_str("already up to date"),
            Outcome::Pushed => f.write_str("pushed"),
            Outcome::PushedWithUpstream => f.write_str("pushed and set upstream"),
            Outcome::FastForwarded => f.write_str("fast-forwarded"),
            Outcome::Merged => f.write_str("merged upstream"),
            Outcome::MergeConflict => {
                f.write_str("merge has conflicts; resolve them and commit")
            }
            Outcome::Rebased => f.write_str("rebased onto upstream"),
            Outcome::RebaseConflict => f.write_str(
                "rebase stopped on conflicts; resolve them and run `git rebase --continue`, \
                 or `git rebase --abort` to undo",
            ),
            Outcome::ForcePushed => f.write_str("force-pushed"),
            Outcome::Declined => f.write_str("cancelled"),
            Outcome::ActionNeeded(reason) => write!(f, "action needed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    pub remote: String,
    pub interactive: bool,
    /// Answer yes to push confirmations. Never applies to force-push.
    pub assume_yes: bool,
    /// Divergence strategy picked up front, e.g. from the command line.
    pub strategy: Option<DivergenceChoice>,
}

/// Carries out an [`Action`] for one branch.
pub struct SyncExecutor<'a, O: SyncOps + ?Sized, P: Prompt + ?Sized> {
    ops: &'a O,
    prompt: &'a mut P,
    options: ExecutorOptions,
}

impl<'a, O: SyncOps + ?Sized, P: Prompt + ?Sized> SyncExecutor<'a, O, P> {
    pub fn new(ops: &'a O, prompt: &'a mut P, options: ExecutorOptions) -> Self {
        Self {
            ops,
            prompt,
            options,
        }
    }

    pub fn execute(&mut self, state: &BranchState, action: Action) -> Result<Outcome> {
        tracing::info!(branch = %state.branch, action = ?action, "executing");
        let branch = state.branch.as_str();

        match action {
            Action::NoOp => Ok(Outcome::Nothing),
            Action::SetUpstreamAndPush => {
                self.ops.push_set_upstream(branch, &self.options.remote)?;
                Ok(Outcome::PushedWithUpstream)
            }
            Action::FastForwardPull => match &state.upstream_commit {
                Some(target) => {
                    self.ops.fast_forward(branch, target)?;
                    Ok(Outcome::FastForwarded)
                }
                None => Ok(Outcome::ActionNeeded(
                    "no upstream commit to fast-forward to".to_string(),
                )),
            },
            Action::PromptPush => self.push_with_confirmation(state),
            Action::PromptResolveDivergence => self.resolve_divergence(state),
            Action::ManualInterventionRequired => self.manual_intervention(state),
        }
    }

    fn push_with_confirmation(&mut self, state: &BranchState) -> Result<Outcome> {
        if !self.options.assume_yes {
            if !self.options.interactive {
                return Ok(Outcome::ActionNeeded(format!(
                    "{} local commit(s) not pushed; rerun with --yes to push",
                    state.ahead
                )));
            }
            let question = format!(
                "Push {} commit(s) from '{}' to {}?",
                state.ahead,
                state.branch,
                upstream_label(state)
            );
            if !self.prompt.confirm(&question)? {
                return Ok(Outcome::Declined);
            }
        }

        self.ops.push(&state.branch)?;
        Ok(Outcome::Pushed)
    }

    fn resolve_divergence(&mut self, state: &BranchState) -> Result<Outcome> {
        let choice = match self.options.strategy {
            Some(choice) => choice,
            None => {
                let choices = Action::PromptResolveDivergence.choices();
                let labels: Vec<&str> = choices.iter().map(|c| c.label()).collect();
                let question = format!(
                    "'{}' and {} have diverged ({} local, {} remote commit(s)). How to reconcile?",
                    state.branch,
                    upstream_label(state),
                    state.ahead,
                    state.behind
                );
                let picked = self.prompt.choose(&question, &labels)?;
                match picked.and_then(|index| choices.get(index).copied()) {
                    Some(choice) => choice,
                    None => return Ok(Outcome::Declined),
                }
            }
        };

        if choice.is_destructive() && !self.confirm_force_push(state)? {
            tracing::info!(branch = %state.branch, "force-push not confirmed");
            return Ok(Outcome::Declined);
        }

        self.apply(state, choice)
    }

    fn manual_intervention(&mut self, state: &BranchState) -> Result<Outcome> {
        match self.options.strategy {
            Some(choice) if !choice.is_destructive() => self.apply(state, choice),
            Some(_) => Ok(Outcome::ActionNeeded(
                "force-push needs interactive confirmation".to_string(),
            )),
            None => Ok(Outcome::ActionNeeded(format!(
                "'{}' has diverged from {}; choose merge or rebase with --strategy",
                state.branch,
                upstream_label(state)
            ))),
        }
    }

    /// Two separate confirmations: a yes/no, then the branch name typed back.
    fn confirm_force_push(&mut self, state: &BranchState) -> Result<bool> {
        let question = format!(
            "Force-push discards {} commit(s) on {} for everyone. Continue?",
            state.behind,
            upstream_label(state)
        );
        if !self.prompt.confirm(&question)? {
            return Ok(false);
        }

        let typed = self
            .prompt
            .input(&format!("Type '{}' to confirm the force-push", state.branch))?;
        Ok(typed == state.branch)
    }

    fn apply(&mut self, state: &BranchState, choice: DivergenceChoice) -> Result<Outcome> {
        tracing::info!(branch = %state.branch, choice = ?choice, "reconciling divergence");
        let branch = state.branch.as_str();

        match choice {
            DivergenceChoice::Merge => {
                let Some(upstream) = &state.upstream_commit else {
                    return Ok(Outcome::ActionNeeded("no upstream to merge".to_string()));
                };
                Ok(match self.ops.merge_upstream(branch, upstream)? {
                    MergeResult::UpToDate => Outcome::Nothing,
                    MergeResult::FastForward => Outcome::FastForwarded,
                    MergeResult::Merged => Outcome::Merged,
                    MergeResult::Conflict => Outcome::MergeConflict,
                })
            }
            DivergenceChoice::Rebase => {
                Ok(match self.ops.rebase_onto_upstream(branch)? {
                    RebaseResult::Rebased => Outcome::Rebased,
                    RebaseResult::Conflict => Outcome::RebaseConflict,
                })
            }
            DivergenceChoice::ForcePush => {
                self.ops.force_push(branch)?;
                Ok(Outcome::ForcePushed)
            }
        }
    }
}

fn upstream_label(state: &BranchState) -> String {
    state
        .upstream_name
        .clone()
        .unwrap_or_else(|| "its upstream".to_string())
}
