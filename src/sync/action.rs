use serde::Serialize;

use super::classify::SyncRelation;

/// What should happen to bring a branch in line with its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    NoOp,
    SetUpstreamAndPush,
    FastForwardPull,
    /// Push local commits once the user agrees.
    PromptPush,
    /// Ask the user to pick one of [`DivergenceChoice::ALL`].
    PromptResolveDivergence,
    /// Divergence with nobody to ask. Never resolved automatically.
    ManualInterventionRequired,
}

impl Action {
    pub fn describe(&self) -> &'static str {
        match self {
            Action::NoOp => "nothing to do",
            Action::SetUpstreamAndPush => "push and set upstream",
            Action::FastForwardPull => "fast-forward to upstream",
            Action::PromptPush => "push local commits",
            Action::PromptResolveDivergence => "resolve divergence (merge, rebase or force-push)",
            Action::ManualInterventionRequired => "manual intervention required",
        }
    }

    /// Sub-choices the caller must offer for this action.
    pub fn choices(&self) -> &'static [DivergenceChoice] {
        match self {
            Action::PromptResolveDivergence => &DivergenceChoice::ALL,
            _ => &[],
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// Ways to reconcile a diverged branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DivergenceChoice {
    Merge,
    Rebase,
    ForcePush,
}

impl DivergenceChoice {
    pub const ALL: [DivergenceChoice; 3] = [
        DivergenceChoice::Merge,
        DivergenceChoice::Rebase,
        DivergenceChoice::ForcePush,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DivergenceChoice::Merge => "merge upstream into local",
            DivergenceChoice::Rebase => "rebase local onto upstream",
            DivergenceChoice::ForcePush => "force-push local over upstream",
        }
    }

    /// Rewrites shared history, so it needs a second, separate confirmation.
    pub fn is_destructive(&self) -> bool {
        matches!(self, DivergenceChoice::ForcePush)
    }
}

/// Maps a relation to the action that reconciles it.
pub fn recommend_action(relation: SyncRelation, interactive: bool) -> Action {
    match relation {
        SyncRelation::UpToDate => Action::NoOp,
        SyncRelation::NoUpstream => Action::SetUpstreamAndPush,
        SyncRelation::Behind => Action::FastForwardPull,
        SyncRelation::Ahead => Action::PromptPush,
        SyncRelation::Diverged if interactive => Action::PromptResolveDivergence,
        SyncRelation::Diverged => Action::ManualInterventionRequired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping() {
        assert_eq!(recommend_action(SyncRelation::UpToDate, true), Action::NoOp);
        assert_eq!(
            recommend_action(SyncRelation::NoUpstream, true),
            Action::SetUpstreamAndPush
        );
        assert_eq!(
            recommend_action(SyncRelation::Behind, true),
            Action::FastForwardPull
        );
        assert_eq!(recommend_action(SyncRelation::Ahead, true), Action::PromptPush);
        assert_eq!(
            recommend_action(SyncRelation::Diverged, true),
            Action::PromptResolveDivergence
        );
    }

    #[test]
    fn test_diverged_non_interactive_needs_manual_intervention() {
        assert_eq!(
            recommend_action(SyncRelation::Diverged, false),
            Action::ManualInterventionRequired
        );
    }

    #[test]
    fn test_interactive_flag_only_affects_divergence() {
        for relation in [
            SyncRelation::NoUpstream,
            SyncRelation::UpToDate,
            SyncRelation::Behind,
            SyncRelation::Ahead,
            SyncRelation::Diverged,
        ] {
            if relation == SyncRelation::Diverged {
                continue;
            }
            assert_eq!(
                recommend_action(relation, true),
                recommend_action(relation, false)
            );
        }
    }

    #[test]
    fn test_divergence_offers_three_choices() {
        let choices = Action::PromptResolveDivergence.choices();
        assert_eq!(choices.len(), 3);
        assert!(choices.contains(&DivergenceChoice::Merge));
        assert!(choices.contains(&DivergenceChoice::Rebase));
        assert!(choices.contains(&DivergenceChoice::ForcePush));
        assert!(Action::ManualInterventionRequired.choices().is_empty());
    }

    #[test]
    fn test_only_force_push_is_destructive() {
        let destructive: Vec<_> = DivergenceChoice::ALL
            .iter()
            .filter(|c| c.is_destructive())
            .collect();
        assert_eq!(destructive, vec![&DivergenceChoice::ForcePush]);
    }
}
