use serde::Serialize;

use crate::error::Result;
use crate::git::BranchInfo;
use crate::sync::{recommend_action, Action, BranchState, Outcome, SyncRelation};

/// One row of `bsync status`.
#[derive(Debug, Serialize)]
pub struct StatusRow {
    pub branch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<SyncRelation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<BranchState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusRow {
    pub fn new(branch: String, state: Result<BranchState>, interactive: bool) -> Self {
        match state {
            Ok(state) => {
                let relation = state.relation();
                Self {
                    branch,
                    relation: Some(relation),
                    action: Some(recommend_action(relation, interactive)),
                    state: Some(state),
                    error: None,
                }
            }
            Err(e) => Self {
                branch,
                relation: None,
                action: None,
                state: None,
                error: Some(e.to_string()),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn render(&self) -> String {
        if let Some(error) = &self.error {
            return format!("{:<24} error: {}", self.branch, error);
        }

        let counts = match &self.state {
            Some(state) if state.ahead > 0 || state.behind > 0 => {
                format!("+{} -{}", state.ahead, state.behind)
            }
            _ => String::new(),
        };
        let upstream = self
            .state
            .as_ref()
            .and_then(|s| s.upstream_name.clone())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{:<24} {:<20} {:<12} {:<8} {}",
            self.branch,
            upstream,
            self.relation.map(|r| r.label()).unwrap_or(""),
            counts,
            self.action.map(|a| a.describe()).unwrap_or("")
        )
    }
}

#[derive(Debug, Serialize)]
pub struct SyncReport<'a> {
    pub branch: &'a str,
    pub relation: SyncRelation,
    pub action: Action,
    #[serde(flatten)]
    pub outcome: &'a Outcome,
}

impl SyncReport<'_> {
    pub fn render(&self) -> String {
        format!("{} ({}): {}", self.branch, self.relation, self.outcome)
    }
}

pub fn render_branch(branch: &BranchInfo) -> String {
    let marker = if branch.is_head { "*" } else { " " };
    let tracking = match &branch.upstream {
        Some(upstream) if branch.ahead > 0 || branch.behind > 0 => {
            format!("{} [+{} -{}]", upstream, branch.ahead, branch.behind)
        }
        Some(upstream) => upstream.clone(),
        None => String::new(),
    };
    format!(
        "{} {:<24} {:<28} {} {} {}",
        marker,
        branch.name,
        tracking,
        branch.last_commit.short_id,
        branch.last_commit.date(),
        branch.last_commit.summary
    )
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
