use serde::Serialize;

use crate::error::Result;

use super::{classify, SyncRelation};

/// Opaque commit identifier, normally a full hex object id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(7) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<git2::Oid> for CommitId {
    fn from(oid: git2::Oid) -> Self {
        Self(oid.to_string())
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lookups the classifier needs from version control.
///
/// Implementations report a missing repository or branch as an error
/// instead of returning a placeholder; a missing upstream is `Ok(None)`.
pub trait VersionControl {
    fn local_commit(&self, branch: &str) -> Result<CommitId>;

    fn upstream_commit(&self, branch: &str) -> Result<Option<CommitId>>;

    fn merge_base(&self, local: &CommitId, upstream: &CommitId) -> Result<Option<CommitId>>;

    fn upstream_name(&self, _branch: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Commits unique to `local` and to `upstream`, in that order.
    fn ahead_behind(&self, _local: &CommitId, _upstream: &CommitId) -> Result<(usize, usize)> {
        Ok((0, 0))
    }
}

/// Snapshot of a branch and its upstream at one moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchState {
    pub branch: String,
    pub local_commit: CommitId,
    pub upstream_commit: Option<CommitId>,
    pub merge_base_commit: Option<CommitId>,
    pub upstream_name: Option<String>,
    pub ahead: usize,
    pub behind: usize,
}

impl BranchState {
    pub fn new(
        branch: impl Into<String>,
        local_commit: CommitId,
        upstream_commit: Option<CommitId>,
        merge_base_commit: Option<CommitId>,
    ) -> Self {
        Self {
            branch: branch.into(),
            local_commit,
            upstream_commit,
            merge_base_commit,
            upstream_name: None,
            ahead: 0,
            behind: 0,
        }
    }

    pub fn relation(&self) -> SyncRelation {
        classify(
            &self.local_commit,
            self.upstream_commit.as_ref(),
            self.merge_base_commit.as_ref(),
        )
    }
}

/// Queries `vc` and builds the current [`BranchState`] of `branch`.
pub fn gather<V: VersionControl + ?Sized>(vc: &V, branch: &str) -> Result<BranchState> {
    let local = vc.local_commit(branch)?;
    let Some(upstream) = vc.upstream_commit(branch)? else {
        tracing::debug!(branch, "no upstream configured");
        return Ok(BranchState::new(branch, local, None, None));
    };

    let merge_base = vc.merge_base(&local, &upstream)?;
    let (ahead, behind) = vc.ahead_behind(&local, &upstream)?;

    let mut state = BranchState::new(branch, local, Some(upstream), merge_base);
    state.upstream_name = vc.upstream_name(branch)?;
    state.ahead = ahead;
    state.behind = behind;

    tracing::debug!(
        branch,
        local = %state.local_commit.short(),
        relation = %state.relation(),
        ahead,
        behind,
        "gathered branch state"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::error::Error;
    use crate::sync::{recommend_action, Action};

    /// In-memory commit table: branch -> (local, upstream, merge base).
    #[derive(Default)]
    struct FakeVc {
        branches: HashMap<String, (&'static str, Option<&'static str>, Option<&'static str>)>,
    }

    impl FakeVc {
        fn with(
            branch: &str,
            local: &'static str,
            upstream: Option<&'static str>,
            base: Option<&'static str>,
        ) -> Self {
            let mut vc = Self::default();
            vc.branches.insert(branch.to_string(), (local, upstream, base));
            vc
        }
    }

    impl VersionControl for FakeVc {
        fn local_commit(&self, branch: &str) -> Result<CommitId> {
            self.branches
                .get(branch)
                .map(|(l, _, _)| CommitId::from(*l))
                .ok_or_else(|| Error::BranchNotFound(branch.to_string()))
        }

        fn upstream_commit(&self, branch: &str) -> Result<Option<CommitId>> {
            Ok(self
                .branches
                .get(branch)
                .and_then(|(_, u, _)| u.map(CommitId::from)))
        }

        fn merge_base(&self, local: &CommitId, _upstream: &CommitId) -> Result<Option<CommitId>> {
            Ok(self
                .branches
                .values()
                .find(|(l, _, _)| *l == local.as_str())
                .and_then(|(_, _, b)| b.map(CommitId::from)))
        }
    }

    fn scenario(
        local: &'static str,
        upstream: Option<&'static str>,
        base: Option<&'static str>,
        interactive: bool,
    ) -> (SyncRelation, Action) {
        let vc = FakeVc::with("topic", local, upstream, base);
        let state = gather(&vc, "topic").unwrap();
        let relation = state.relation();
        (relation, recommend_action(relation, interactive))
    }

    #[test]
    fn test_scenario_no_upstream() {
        assert_eq!(
            scenario("A", None, None, true),
            (SyncRelation::NoUpstream, Action::SetUpstreamAndPush)
        );
    }

    #[test]
    fn test_scenario_up_to_date() {
        assert_eq!(
            scenario("A", Some("A"), Some("A"), true),
            (SyncRelation::UpToDate, Action::NoOp)
        );
    }

    #[test]
    fn test_scenario_behind() {
        assert_eq!(
            scenario("A", Some("B"), Some("A"), true),
            (SyncRelation::Behind, Action::FastForwardPull)
        );
    }

    #[test]
    fn test_scenario_ahead() {
        assert_eq!(
            scenario("B", Some("A"), Some("A"), true),
            (SyncRelation::Ahead, Action::PromptPush)
        );
    }

    #[test]
    fn test_scenario_diverged_non_interactive() {
        assert_eq!(
            scenario("B", Some("C"), Some("A"), false),
            (SyncRelation::Diverged, Action::ManualInterventionRequired)
        );
    }

    #[test]
    fn test_gather_missing_branch_fails() {
        let vc = FakeVc::default();
        let err = gather(&vc, "ghost").unwrap_err();
        assert!(matches!(err, Error::BranchNotFound(ref b) if b == "ghost"));
    }

    #[test]
    fn test_short_commit_id() {
        let id = CommitId::from("0123456789abcdef");
        assert_eq!(id.short(), "0123456");
        assert_eq!(CommitId::from("abc").short(), "abc");
        assert_eq!(CommitId::from("ééééé").short(), "ééééé");
        assert_eq!(CommitId::from("éééééééé").short(), "ééééééé");
    }
}
