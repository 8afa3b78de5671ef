//! Finding tracker issues, and the one active branch when no name is given.

use crate::error::{PmuError, Result};
use crate::gateway::{Gateway, Issue, IssueState, RepoRef};
use crate::title::{self, BranchIdentity};
use serde::Serialize;
use std::collections::HashSet;

pub const TRACKER_LABEL: &str = "branch";

/// Labels that mark tracker candidates, current label first.
pub const TRACKER_LABELS: &[&str] = &[TRACKER_LABEL, "release"];

#[derive(Debug, Clone, Serialize)]
pub struct Tracker {
    pub issue: Issue,
    pub identity: BranchIdentity,
}

impl Tracker {
    /// `None` when the issue title is not a tracker title.
    pub fn from_issue(issue: Issue) -> Option<Self> {
        let identity = title::decode(&issue.title)?;
        Some(Self { issue, identity })
    }

    pub fn number(&self) -> u64 {
        self.issue.number
    }

    pub fn version(&self) -> &str {
        &self.identity.version
    }

    /// Whether a user-supplied branch name refers to this tracker: either
    /// the title body matches the name exactly, or both read as the same
    /// track and version.
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        if title::remainder(&self.issue.title) == Some(name) {
            return true;
        }
        BranchIdentity::from_name(name).is_ok_and(|wanted| wanted.same_branch(&self.identity))
    }
}

/// Trackers in `state` under any tracker label, in discovery order. An issue
/// carrying both labels appears once. Label alone is not enough: the title
/// must decode.
pub fn list_trackers<G: Gateway + ?Sized>(
    gw: &G,
    repo: &RepoRef,
    state: IssueState,
) -> Result<Vec<Tracker>> {
    let mut seen = HashSet::new();
    let mut trackers = Vec::new();
    for label in TRACKER_LABELS {
        for issue in gw.list_issues(repo, label, state)? {
            if !seen.insert(issue.number) {
                continue;
            }
            if let Some(t) = Tracker::from_issue(issue) {
                trackers.push(t);
            }
        }
    }
    Ok(trackers)
}

/// The single open tracker, `None` when there is none. More than one is an
/// error naming every candidate version.
pub fn find_active<G: Gateway + ?Sized>(gw: &G, repo: &RepoRef) -> Result<Option<Tracker>> {
    let mut open = list_trackers(gw, repo, IssueState::Open)?;
    match open.len() {
        0 => Ok(None),
        1 => Ok(open.pop()),
        _ => Err(PmuError::MultipleActiveBranches(
            open.iter().map(|t| t.version().to_string()).collect(),
        )),
    }
}

pub fn resolve_active<G: Gateway + ?Sized>(gw: &G, repo: &RepoRef) -> Result<Tracker> {
    find_active(gw, repo)?.ok_or(PmuError::NoActiveBranch)
}
