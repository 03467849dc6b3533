mod branch;
mod commit;
mod repository;

pub use branch::BranchInfo;
pub use commit::CommitInfo;
pub use repository::{MergeResult, RebaseResult, Repository};
