use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not a git repository (or any parent up to the filesystem root): {}", .0.display())]
    NotARepository(PathBuf),

    #[error("branch '{0}' not found locally or on the remote")]
    BranchNotFound(String),

    #[error("remote '{remote}' is unreachable: {message}")]
    RemoteUnreachable { remote: String, message: String },

    #[error("`git {command}` failed: {message}")]
    GitCommand { command: String, message: String },

    #[error("upstream '{upstream}' of branch '{branch}' is gone from the remote")]
    UpstreamGone { branch: String, upstream: String },

    #[error("branch '{0}' must be checked out for this operation")]
    NotCheckedOut(String),

    #[error("working tree has uncommitted changes")]
    DirtyWorktree,

    #[error("branch '{0}' is protected")]
    Protected(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse classification used to decide how the CLI reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Stops everything: there is nothing to operate on.
    Fatal,
    /// Stops the current operation only.
    Operation,
    /// May succeed on retry, or the caller may continue with stale state.
    Recoverable,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotARepository(_) | Error::Config(_) => ErrorKind::Fatal,
            Error::RemoteUnreachable { .. } => ErrorKind::Recoverable,
            _ => ErrorKind::Operation,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_unreachable_is_recoverable() {
        let err = Error::RemoteUnreachable {
            remote: "origin".to_string(),
            message: "Could not resolve host".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Recoverable);
        assert_eq!(
            err.to_string(),
            "remote 'origin' is unreachable: Could not resolve host"
        );
    }

    #[test]
    fn test_not_a_repository_is_fatal() {
        let err = Error::NotARepository(PathBuf::from("/tmp/nowhere"));
        assert_eq!(err.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_branch_not_found_stops_operation() {
        let err = Error::BranchNotFound("feature/x".to_string());
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert!(err.to_string().contains("feature/x"));
    }

    #[test]
    fn test_upstream_gone_names_branch_and_upstream() {
        let err = Error::UpstreamGone {
            branch: "feature".to_string(),
            upstream: "origin/feature".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Operation);
        assert_eq!(
            err.to_string(),
            "upstream 'origin/feature' of branch 'feature' is gone from the remote"
        );
    }
}
