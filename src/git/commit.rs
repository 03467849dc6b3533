use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub summary: String,
    pub author: String,
    pub time: i64,
}

impl CommitInfo {
    pub fn from_commit(commit: &git2::Commit) -> Self {
        let id = commit.id().to_string();
        let short_id = id[..7.min(id.len())].to_string();

        Self {
            id,
            short_id,
            summary: commit.summary().unwrap_or("").to_string(),
            author: commit.author().name().unwrap_or("").to_string(),
            time: commit.time().seconds(),
        }
    }

    /// Commit time in the local timezone, e.g. `2024-03-01 14:05`.
    pub fn date(&self) -> String {
        DateTime::from_timestamp(self.time, 0)
            .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default()
    }
}
