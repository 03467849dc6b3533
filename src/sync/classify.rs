use serde::Serialize;

use super::state::CommitId;

/// How a local branch relates to its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncRelation {
    NoUpstream,
    UpToDate,
    /// The upstream has commits the local branch lacks, and nothing else.
    Behind,
    /// The local branch has commits the upstream lacks, and nothing else.
    Ahead,
    /// Both sides have commits the other lacks.
    Diverged,
}

impl SyncRelation {
    pub fn label(&self) -> &'static str {
        match self {
            SyncRelation::NoUpstream => "no upstream",
            SyncRelation::UpToDate => "up to date",
            SyncRelation::Behind => "behind",
            SyncRelation::Ahead => "ahead",
            SyncRelation::Diverged => "diverged",
        }
    }
}

impl std::fmt::Display for SyncRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Classifies a (local, upstream, merge base) triple.
///
/// `upstream` and `merge_base` are expected to be absent together. The
/// ancestry of `merge_base` is trusted, not verified. Equality of local
/// and upstream wins over every other check, so an all-equal triple is
/// [`SyncRelation::UpToDate`].
///
/// An upstream without a merge base means the histories share no commit,
/// which is reported as [`SyncRelation::Diverged`].
pub fn classify(
    local: &CommitId,
    upstream: Option<&CommitId>,
    merge_base: Option<&CommitId>,
) -> SyncRelation {
    let Some(upstream) = upstream else {
        return SyncRelation::NoUpstream;
    };

    if local == upstream {
        return SyncRelation::UpToDate;
    }

    match merge_base {
        Some(base) if base == local => SyncRelation::Behind,
        Some(base) if base == upstream => SyncRelation::Ahead,
        _ => SyncRelation::Diverged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> CommitId {
        CommitId::from(s)
    }

    #[test]
    fn test_no_upstream() {
        assert_eq!(classify(&id("A"), None, None), SyncRelation::NoUpstream);
    }

    #[test]
    fn test_no_upstream_ignores_stray_merge_base() {
        assert_eq!(
            classify(&id("A"), None, Some(&id("A"))),
            SyncRelation::NoUpstream
        );
    }

    #[test]
    fn test_all_equal_is_up_to_date() {
        for name in ["A", "0123abc", ""] {
            assert_eq!(
                classify(&id(name), Some(&id(name)), Some(&id(name))),
                SyncRelation::UpToDate
            );
        }
    }

    #[test]
    fn test_behind_when_local_is_merge_base() {
        assert_eq!(
            classify(&id("A"), Some(&id("B")), Some(&id("A"))),
            SyncRelation::Behind
        );
    }

    #[test]
    fn test_ahead_when_upstream_is_merge_base() {
        assert_eq!(
            classify(&id("B"), Some(&id("A")), Some(&id("A"))),
            SyncRelation::Ahead
        );
    }

    #[test]
    fn test_pairwise_distinct_is_diverged() {
        assert_eq!(
            classify(&id("B"), Some(&id("C")), Some(&id("A"))),
            SyncRelation::Diverged
        );
    }

    #[test]
    fn test_unrelated_histories_are_diverged() {
        assert_eq!(
            classify(&id("B"), Some(&id("C")), None),
            SyncRelation::Diverged
        );
    }

    #[test]
    fn test_exhaustive_triples_match_partition() {
        let ids = ["A", "B", "C"];
        for l in ids {
            for u in ids {
                for m in ids {
                    let expected = if l == u {
                        SyncRelation::UpToDate
                    } else if l == m {
                        SyncRelation::Behind
                    } else if u == m {
                        SyncRelation::Ahead
                    } else {
                        SyncRelation::Diverged
                    };
                    assert_eq!(
                        classify(&id(l), Some(&id(u)), Some(&id(m))),
                        expected,
                        "local={} upstream={} base={}",
                        l,
                        u,
                        m
                    );
                }
            }
        }
    }

    #[test]
    fn test_classify_is_idempotent() {
        let (l, u, m) = (id("B"), id("C"), id("A"));
        let first = classify(&l, Some(&u), Some(&m));
        let second = classify(&l, Some(&u), Some(&m));
        assert_eq!(first, second);
    }
}
