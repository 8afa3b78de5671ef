//! Branch lifecycle: `start`, `add`, `remove`, `current`, `close`,
//! `reopen`, `list`.
//!
//! A branch exists only as an open tracker issue plus the project items
//! whose branch field holds its version. There is no local state; every
//! call reads what it needs through the [`Gateway`].
//!
//! `start` checks for an open tracker and then creates one with no
//! compare-and-swap in between, so two clients starting at the same moment
//! can both succeed.

use crate::config::Config;
use crate::error::{PmuError, Result};
use crate::gateway::{FieldValue, FullItem, Gateway, IssueState, Project, RepoRef};
use crate::query::{self, BRANCH_FIELD, BRANCH_FIELD_ALIASES};
use crate::resolver::{self, Tracker, TRACKER_LABEL};
use crate::title::BranchIdentity;
use crate::version;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub const BODY_HEADER: &str = "## Issues in this release";

/// Tracker body listing member issues. With no members this is the header
/// alone, never an absent body.
pub fn render_body(items: &[FullItem]) -> String {
    let mut body = format!("{BODY_HEADER}\n\n");
    for item in items {
        body.push_str(&format!("- #{} {}\n", item.number, item.title));
    }
    body
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StartOutcome {
    pub branch: String,
    pub title: String,
    pub number: u64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignOutcome {
    pub issue: u64,
    pub title: String,
    pub version: String,
    /// Branch field value before the call; empty when unset.
    pub previous: String,
    /// `false` when nothing was written.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentReport {
    pub tracker: Tracker,
    pub total: usize,
    pub open: usize,
    pub closed: usize,
    pub refreshed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosePlan {
    pub tracker: Tracker,
    /// Members whose issue is closed.
    pub done: Vec<FullItem>,
    /// Open members in the parking-lot status; left untouched.
    pub parking_lot: Vec<FullItem>,
    /// Open members that will be sent back to the backlog.
    pub to_move: Vec<FullItem>,
}

impl ClosePlan {
    pub fn incomplete(&self) -> usize {
        self.parking_lot.len() + self.to_move.len()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CloseOptions {
    pub tag: bool,
    pub dry_run: bool,
    pub yes: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseReport {
    pub plan: ClosePlan,
    pub moved: usize,
    /// Issue numbers that could not be moved.
    pub failed: Vec<u64>,
    pub tag: Option<String>,
}

impl CloseReport {
    pub fn summary(&self) -> String {
        format!("{} issue(s) moved to backlog", self.moved)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CloseOutcome {
    DryRun(ClosePlan),
    Aborted(ClosePlan),
    Closed(CloseReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BranchStatus {
    Active,
    Closed,
}

impl fmt::Display for BranchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BranchStatus::Active => "Active",
            BranchStatus::Closed => "Closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchSummary {
    pub version: String,
    pub track: String,
    pub codename: String,
    pub number: u64,
    pub title: String,
    pub status: BranchStatus,
}

// ---------------------------------------------------------------------------
// BranchManager
// ---------------------------------------------------------------------------

pub struct BranchManager<'a, G: Gateway + ?Sized> {
    gw: &'a G,
    config: &'a Config,
}

impl<'a, G: Gateway + ?Sized> BranchManager<'a, G> {
    pub fn new(gw: &'a G, config: &'a Config) -> Self {
        Self { gw, config }
    }

    fn repo(&self) -> Result<RepoRef> {
        self.config.primary_repository()
    }

    fn project(&self) -> Result<Project> {
        let p = &self.config.project;
        self.gw.get_project(&p.owner, p.number)
    }

    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    pub fn start(&self, name: &str, codename: Option<&str>) -> Result<StartOutcome> {
        let name = name.trim();
        let mut identity = BranchIdentity::from_name(name)?;
        if let Some(c) = codename.filter(|c| !c.trim().is_empty()) {
            identity = identity.with_codename(c.trim());
        }

        let repo = self.repo()?;
        if let Some(existing) = resolver::list_trackers(self.gw, &repo, IssueState::Open)?
            .into_iter()
            .next()
        {
            return Err(PmuError::ActiveBranchExists {
                title: existing.issue.title,
                number: existing.issue.number,
            });
        }

        let project = self.project()?;
        let status = self.config.status();
        project.require_field(&status.field)?;

        self.gw.create_branch(name)?;

        let title = identity.title();
        let issue = self
            .gw
            .create_issue(&repo, &title, &render_body(&[]), &[TRACKER_LABEL])?;
        let item_id = self.gw.add_issue_to_project(&project, &issue.id)?;
        self.gw
            .set_field_value(&project, &item_id, &status.field, &status.values.in_progress)?;

        tracing::info!(branch = name, tracker = issue.number, "branch started");
        Ok(StartOutcome {
            branch: name.to_string(),
            title,
            number: issue.number,
            url: issue.url,
        })
    }

    // -----------------------------------------------------------------------
    // add / remove
    // -----------------------------------------------------------------------

    /// Locate the issue's project item and read every branch field alias the
    /// project defines. At least one of them must exist.
    fn locate(&self, project: &Project, repo: &RepoRef, number: u64) -> Result<Located> {
        let aliases: Vec<&str> = BRANCH_FIELD_ALIASES
            .iter()
            .copied()
            .filter(|a| project.field(a).is_some())
            .collect();
        if aliases.is_empty() {
            return Err(PmuError::FieldNotFound(BRANCH_FIELD.to_string()));
        }

        let issue = self.gw.get_issue(repo, number)?;
        let item_id = self
            .gw
            .get_project_item_id(project, &issue.id)?
            .ok_or(PmuError::ItemNotInProject(number))?;

        let mut values = Vec::with_capacity(aliases.len());
        for alias in aliases {
            let value = self.gw.get_field_value(project, &item_id, alias)?;
            values.push(FieldValue {
                field: alias.to_string(),
                value,
            });
        }
        Ok(Located {
            title: issue.title,
            item_id,
            values,
        })
    }

    /// Write the version into the first alias the project has. A different
    /// version left in another alias is cleared so the item belongs to one
    /// branch only.
    pub fn add(&self, number: u64) -> Result<AssignOutcome> {
        let repo = self.repo()?;
        let tracker = resolver::resolve_active(self.gw, &repo)?;
        let project = self.project()?;
        let located = self.locate(&project, &repo, number)?;
        let version = tracker.version().to_string();

        let mut changed = false;
        for (i, fv) in located.values.iter().enumerate() {
            let wanted = if i == 0 { version.as_str() } else { "" };
            let same_branch = i > 0 && fv.value == version;
            if fv.value != wanted && !same_branch {
                self.gw
                    .set_field_value(&project, &located.item_id, &fv.field, wanted)?;
                changed = true;
            }
        }

        Ok(AssignOutcome {
            issue: number,
            title: located.title.clone(),
            version,
            previous: located.current().to_string(),
            changed,
        })
    }

    /// Clear every alias holding a value. With all of them empty the issue
    /// is not on any branch and nothing is written.
    pub fn remove(&self, number: u64) -> Result<AssignOutcome> {
        let repo = self.repo()?;
        let tracker = resolver::resolve_active(self.gw, &repo)?;
        let project = self.project()?;
        let located = self.locate(&project, &repo, number)?;

        let mut changed = false;
        for fv in located.values.iter().filter(|fv| !fv.value.is_empty()) {
            self.gw
                .set_field_value(&project, &located.item_id, &fv.field, "")?;
            changed = true;
        }

        Ok(AssignOutcome {
            issue: number,
            title: located.title.clone(),
            version: tracker.version().to_string(),
            previous: located.current().to_string(),
            changed,
        })
    }

    // -----------------------------------------------------------------------
    // current
    // -----------------------------------------------------------------------

    /// `Ok(None)` when no branch is active.
    pub fn current(&self, refresh: bool) -> Result<Option<CurrentReport>> {
        let repo = self.repo()?;
        let Some(tracker) = resolver::find_active(self.gw, &repo)? else {
            return Ok(None);
        };
        let project = self.project()?;
        let discovery = query::discover(self.gw, &project, Some(&repo), tracker.version())?;

        if refresh {
            let items = query::hydrate(self.gw, &project, &discovery)?;
            self.gw
                .update_issue_body(&tracker.issue.id, &render_body(&items))?;
        }

        Ok(Some(CurrentReport {
            total: discovery.total(),
            open: discovery.open,
            closed: discovery.closed,
            refreshed: refresh,
            tracker,
        }))
    }

    // -----------------------------------------------------------------------
    // close
    // -----------------------------------------------------------------------

    fn find_named(&self, repo: &RepoRef, name: &str, state: IssueState) -> Result<Tracker> {
        resolver::list_trackers(self.gw, repo, state)?
            .into_iter()
            .find(|t| t.matches_name(name))
            .ok_or_else(|| PmuError::BranchNotFound(name.to_string()))
    }

    fn plan_for(&self, project: &Project, repo: &RepoRef, tracker: Tracker) -> Result<ClosePlan> {
        let members = query::fetch_members(self.gw, project, Some(repo), tracker.version())?;
        let status = self.config.status();

        let mut plan = ClosePlan {
            tracker,
            done: Vec::new(),
            parking_lot: Vec::new(),
            to_move: Vec::new(),
        };
        for item in members.items {
            if !item.state.is_open() {
                plan.done.push(item);
            } else if item
                .field_value(&status.field)
                .is_some_and(|s| s.eq_ignore_ascii_case(&status.values.parking_lot))
            {
                plan.parking_lot.push(item);
            } else {
                plan.to_move.push(item);
            }
        }
        Ok(plan)
    }

    /// Close a branch. `confirm` is asked unless `opts.yes` is set, even
    /// when there is nothing to move; returning `false` aborts untouched.
    pub fn close(
        &self,
        name: Option<&str>,
        opts: CloseOptions,
        confirm: impl FnOnce(&ClosePlan) -> bool,
    ) -> Result<CloseOutcome> {
        let repo = self.repo()?;
        let tracker = match name {
            Some(n) => self.find_named(&repo, n, IssueState::Open)?,
            None => resolver::resolve_active(self.gw, &repo)?,
        };
        let project = self.project()?;
        let plan = self.plan_for(&project, &repo, tracker)?;

        if opts.dry_run {
            return Ok(CloseOutcome::DryRun(plan));
        }
        if !opts.yes && !confirm(&plan) {
            return Ok(CloseOutcome::Aborted(plan));
        }

        if !plan.to_move.is_empty() {
            project.require_field(BRANCH_FIELD)?;
            project.require_field(&self.config.status().field)?;
        }

        let version = plan.tracker.version().to_string();
        let mut moved = 0;
        let mut failed = Vec::new();
        for item in &plan.to_move {
            match self.move_to_backlog(&project, item, &version) {
                Ok(()) => moved += 1,
                Err(e) => {
                    tracing::warn!(issue = item.number, error = %e, "could not move issue to backlog, skipping");
                    failed.push(item.number);
                }
            }
        }

        let tag = if opts.tag {
            let identity = &plan.tracker.identity;
            let tag_name = identity.tag_name();
            self.gw
                .create_annotated_tag(&tag_name, &format!("Release {identity}"))?;
            Some(tag_name)
        } else {
            None
        };

        self.gw.close_issue(&plan.tracker.issue.id)?;
        tracing::info!(
            tracker = plan.tracker.number(),
            moved,
            failed = failed.len(),
            "branch closed"
        );

        Ok(CloseOutcome::Closed(CloseReport {
            plan,
            moved,
            failed,
            tag,
        }))
    }

    fn move_to_backlog(&self, project: &Project, item: &FullItem, version: &str) -> Result<()> {
        let item_id = match &item.item_id {
            Some(id) => id.clone(),
            None => self
                .gw
                .get_project_item_id(project, &item.issue_id)?
                .ok_or(PmuError::ItemNotInProject(item.number))?,
        };

        for alias in BRANCH_FIELD_ALIASES {
            let holds_version = item.field_value(alias) == Some(version);
            if (*alias == BRANCH_FIELD || holds_version) && project.field(alias).is_some() {
                self.gw.set_field_value(project, &item_id, alias, "")?;
            }
        }

        let status = self.config.status();
        self.gw
            .set_field_value(project, &item_id, &status.field, &status.values.backlog)
    }

    // -----------------------------------------------------------------------
    // reopen / list
    // -----------------------------------------------------------------------

    pub fn reopen(&self, name: &str) -> Result<Tracker> {
        let repo = self.repo()?;
        let mut tracker = self.find_named(&repo, name, IssueState::Closed)?;
        self.gw.reopen_issue(&tracker.issue.id)?;
        tracker.issue.state = IssueState::Open;
        Ok(tracker)
    }

    /// Every tracker, newest version first.
    pub fn list(&self) -> Result<Vec<BranchSummary>> {
        let repo = self.repo()?;
        let mut seen = HashSet::new();
        let mut summaries = Vec::new();
        for state in [IssueState::Open, IssueState::Closed] {
            for t in resolver::list_trackers(self.gw, &repo, state)? {
                if !seen.insert(t.number()) {
                    continue;
                }
                summaries.push(BranchSummary {
                    version: t.identity.version.clone(),
                    track: t.identity.track.clone(),
                    codename: t.identity.codename.clone(),
                    number: t.issue.number,
                    title: t.issue.title.clone(),
                    status: if state.is_open() {
                        BranchStatus::Active
                    } else {
                        BranchStatus::Closed
                    },
                });
            }
        }
        summaries.reverse();
        summaries.sort_by(|a, b| version::compare(&b.version, &a.version));
        Ok(summaries)
    }
}

struct Located {
    title: String,
    item_id: String,
    /// One entry per alias the project defines, current name first.
    values: Vec<FieldValue>,
}

impl Located {
    fn current(&self) -> &str {
        query::branch_value(&self.values).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
