use serde::Serialize;

use super::commit::CommitInfo;

#[derive(Debug, Clone, Serialize)]
pub struct BranchInfo {
    pub name: String,
    pub is_head: bool,
    pub last_commit: CommitInfo,
    /// Upstream tracking branch name (e.g., "origin/feature/hoge")
    pub upstream: Option<String>,
    pub ahead: usize,
    pub behind: usize,
}
