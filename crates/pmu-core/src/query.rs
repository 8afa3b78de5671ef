//! Project item queries.
//!
//! Branch membership is discovered in two phases: a cheap minimal listing
//! of every candidate item, filtered locally on the branch field, then a
//! targeted hydration of only the matches. Board-style reads go through an
//! ordered list of [`ItemStrategy`] values, falling back silently until the
//! last one.

use crate::error::Result;
use crate::gateway::{FieldValue, FullItem, Gateway, IssueRef, MinimalItem, Project, RepoRef};
use serde::Serialize;
use std::collections::HashMap;

/// The field that carries branch membership on project items.
pub const BRANCH_FIELD: &str = "Branch";

/// Every field name accepted as the branch field, current name first.
pub const BRANCH_FIELD_ALIASES: &[&str] = &[BRANCH_FIELD, "Release"];

/// The first non-empty value under any accepted branch field name, current
/// name first.
pub fn branch_value(fields: &[FieldValue]) -> Option<&str> {
    BRANCH_FIELD_ALIASES
        .iter()
        .filter_map(|name| {
            fields
                .iter()
                .find(|f| f.field.eq_ignore_ascii_case(name))
                .map(|f| f.value.as_str())
        })
        .find(|v| !v.is_empty())
}

pub fn is_member(item: &MinimalItem, version: &str) -> bool {
    !version.is_empty()
        && BRANCH_FIELD_ALIASES
            .iter()
            .any(|name| item.field_value(name) == Some(version))
}

// ---------------------------------------------------------------------------
// Phase 1: discovery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct Discovery {
    pub refs: Vec<IssueRef>,
    pub open: usize,
    pub closed: usize,
}

impl Discovery {
    pub fn total(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }
}

pub fn discover<G: Gateway + ?Sized>(
    gw: &G,
    project: &Project,
    repo: Option<&RepoRef>,
    version: &str,
) -> Result<Discovery> {
    let items = gw.list_minimal_items(project, repo)?;
    let candidates = items.len();

    let mut discovery = Discovery::default();
    for item in items {
        if !is_member(&item, version) {
            continue;
        }
        if item.state.is_open() {
            discovery.open += 1;
        } else {
            discovery.closed += 1;
        }
        discovery.refs.push(item.issue_ref());
    }

    tracing::debug!(
        version,
        candidates,
        matched = discovery.total(),
        "branch membership discovered"
    );
    Ok(discovery)
}

// ---------------------------------------------------------------------------
// Phase 2: hydration
// ---------------------------------------------------------------------------

/// Fetch full items for exactly the discovered refs. Makes no gateway call
/// when nothing matched. Anything the gateway returns beyond the discovered
/// set is dropped, and the result follows discovery order.
pub fn hydrate<G: Gateway + ?Sized>(
    gw: &G,
    project: &Project,
    discovery: &Discovery,
) -> Result<Vec<FullItem>> {
    if discovery.is_empty() {
        return Ok(Vec::new());
    }

    let order: HashMap<&IssueRef, usize> = discovery
        .refs
        .iter()
        .enumerate()
        .map(|(i, r)| (r, i))
        .collect();

    let mut slots: Vec<Option<FullItem>> = vec![None; discovery.refs.len()];
    for item in gw.hydrate_items(project, &discovery.refs)? {
        if let Some(&pos) = order.get(&item.issue_ref()) {
            slots[pos].get_or_insert(item);
        }
    }
    Ok(slots.into_iter().flatten().collect())
}

#[derive(Debug, Clone, Default)]
pub struct Members {
    pub discovery: Discovery,
    pub items: Vec<FullItem>,
}

/// Both phases back to back.
pub fn fetch_members<G: Gateway + ?Sized>(
    gw: &G,
    project: &Project,
    repo: Option<&RepoRef>,
    version: &str,
) -> Result<Members> {
    let discovery = discover(gw, project, repo, version)?;
    let items = hydrate(gw, project, &discovery)?;
    Ok(Members { discovery, items })
}

// ---------------------------------------------------------------------------
// Board reads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    /// Repositories to include; empty means every repository.
    pub repos: Vec<RepoRef>,
    pub include_closed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStrategy {
    /// Server-side search with the open-state filter in the request.
    SearchOpenInRepo,
    /// List every project item and filter client-side.
    FullListing,
}

impl ItemStrategy {
    pub fn name(self) -> &'static str {
        match self {
            ItemStrategy::SearchOpenInRepo => "search_open_in_repo",
            ItemStrategy::FullListing => "full_listing",
        }
    }

    pub fn applies(self, query: &ItemQuery) -> bool {
        match self {
            ItemStrategy::SearchOpenInRepo => query.repos.len() == 1 && !query.include_closed,
            ItemStrategy::FullListing => true,
        }
    }

    fn run<G: Gateway + ?Sized>(
        self,
        gw: &G,
        project: &Project,
        query: &ItemQuery,
    ) -> Result<Vec<FullItem>> {
        match self {
            ItemStrategy::SearchOpenInRepo => gw.search_open_items(project, &query.repos[0]),
            ItemStrategy::FullListing => {
                let items = gw.list_items(project)?;
                Ok(items
                    .into_iter()
                    .filter(|i| query.repos.is_empty() || query.repos.contains(&i.repo))
                    .filter(|i| query.include_closed || i.state.is_open())
                    .collect())
            }
        }
    }
}

const STRATEGY_ORDER: &[ItemStrategy] =
    &[ItemStrategy::SearchOpenInRepo, ItemStrategy::FullListing];

/// Applicable strategies in the order they will be tried. Always ends with
/// [`ItemStrategy::FullListing`].
pub fn plan(query: &ItemQuery) -> Vec<ItemStrategy> {
    STRATEGY_ORDER
        .iter()
        .copied()
        .filter(|s| s.applies(query))
        .collect()
}

pub fn fetch_items<G: Gateway + ?Sized>(
    gw: &G,
    project: &Project,
    query: &ItemQuery,
) -> Result<Vec<FullItem>> {
    let mut strategies = plan(query).into_iter().peekable();
    while let Some(strategy) = strategies.next() {
        match strategy.run(gw, project, query) {
            Ok(items) => return Ok(items),
            Err(e) if strategies.peek().is_some() => {
                tracing::debug!(strategy = strategy.name(), error = %e, "falling back");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(Vec::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
