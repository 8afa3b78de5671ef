//! In-memory [`Gateway`] for unit tests. Records every call so tests can
//! assert on what was (and was not) sent.

use crate::error::{PmuError, Result};
use crate::gateway::{
    FieldKind, FieldOption, FieldValue, FullItem, Gateway, Issue, IssueRef, IssueState,
    MinimalItem, Project, ProjectField, RepoRef,
};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashSet};

pub const OWNER: &str = "acme";
pub const REPO: &str = "widgets";

pub fn repo() -> RepoRef {
    RepoRef::new(OWNER, REPO)
}

struct FakeIssue {
    repo: RepoRef,
    issue: Issue,
}

struct FakeItem {
    item_id: String,
    issue_id: String,
    fields: BTreeMap<String, String>,
}

pub struct FakeGateway {
    pub project: Project,
    issues: RefCell<Vec<FakeIssue>>,
    items: RefCell<Vec<FakeItem>>,
    calls: RefCell<Vec<String>>,
    failing: RefCell<HashSet<&'static str>>,
    failing_lookups: RefCell<HashSet<u64>>,
    next_number: Cell<u64>,
    /// Hydration returns every project item, not just the requested ones.
    pub hydrate_everything: Cell<bool>,
    /// Hydrated items come back without their project item id.
    pub omit_item_ids: Cell<bool>,
}

fn select(id: &str, name: &str, options: &[&str]) -> ProjectField {
    ProjectField {
        id: id.to_string(),
        name: name.to_string(),
        kind: FieldKind::SingleSelect,
        options: options
            .iter()
            .enumerate()
            .map(|(i, o)| FieldOption {
                id: format!("{id}_O{i}"),
                name: o.to_string(),
            })
            .collect(),
    }
}

fn text(id: &str, name: &str) -> ProjectField {
    ProjectField {
        id: id.to_string(),
        name: name.to_string(),
        kind: FieldKind::Text,
        options: Vec::new(),
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            project: Project {
                id: "PVT_1".to_string(),
                owner: OWNER.to_string(),
                number: 3,
                title: "Roadmap".to_string(),
                fields: vec![
                    select(
                        "F_STATUS",
                        "Status",
                        &["Backlog", "In progress", "Parking Lot", "Done"],
                    ),
                    text("F_BRANCH", "Branch"),
                    text("F_RELEASE", "Release"),
                ],
            },
            issues: RefCell::new(Vec::new()),
            items: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
            failing: RefCell::new(HashSet::new()),
            failing_lookups: RefCell::new(HashSet::new()),
            next_number: Cell::new(1),
            hydrate_everything: Cell::new(false),
            omit_item_ids: Cell::new(false),
        }
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    fn push_issue(&self, title: &str, state: IssueState, labels: &[&str]) -> u64 {
        let number = self.next_number.get();
        self.next_number.set(number + 1);
        self.issues.borrow_mut().push(FakeIssue {
            repo: repo(),
            issue: Issue {
                id: format!("I_{number}"),
                number,
                title: title.to_string(),
                body: String::new(),
                state,
                labels: labels.iter().map(|l| l.to_string()).collect(),
                url: format!("https://github.com/{OWNER}/{REPO}/issues/{number}"),
            },
        });
        number
    }

    pub fn add_tracker(&self, title: &str, state: IssueState) -> u64 {
        self.push_issue(title, state, &["branch"])
    }

    pub fn add_labelled(&self, title: &str, state: IssueState, labels: &[&str]) -> u64 {
        self.push_issue(title, state, labels)
    }

    /// An issue that is not in the project.
    pub fn add_issue(&self, title: &str, state: IssueState) -> u64 {
        self.push_issue(title, state, &[])
    }

    /// An issue plus its project item with the given field values.
    pub fn add_work_item(&self, title: &str, state: IssueState, fields: &[(&str, &str)]) -> u64 {
        let number = self.push_issue(title, state, &[]);
        self.items.borrow_mut().push(FakeItem {
            item_id: format!("PVTI_{number}"),
            issue_id: format!("I_{number}"),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
        number
    }

    pub fn fail_on(&self, op: &'static str) {
        self.failing.borrow_mut().insert(op);
    }

    pub fn fail_lookup_for(&self, number: u64) {
        self.failing_lookups.borrow_mut().insert(number);
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, op: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.split(' ').next() == Some(op))
            .count()
    }

    pub fn field(&self, number: u64, name: &str) -> Option<String> {
        let issue_id = format!("I_{number}");
        self.items
            .borrow()
            .iter()
            .find(|i| i.issue_id == issue_id)
            .and_then(|i| i.fields.get(name).cloned())
    }

    pub fn issue(&self, number: u64) -> Issue {
        self.issues
            .borrow()
            .iter()
            .find(|i| i.issue.number == number)
            .map(|i| i.issue.clone())
            .expect("issue seeded")
    }

    pub fn issue_count(&self) -> usize {
        self.issues.borrow().len()
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn record(&self, op: &'static str, detail: String) -> Result<()> {
        self.calls.borrow_mut().push(format!("{op} {detail}"));
        if self.failing.borrow().contains(op) {
            return Err(PmuError::gateway(op.replace('_', " "), "injected failure"));
        }
        Ok(())
    }

    fn full_item(&self, item: &FakeItem) -> Option<FullItem> {
        let issues = self.issues.borrow();
        let fake = issues.iter().find(|i| i.issue.id == item.issue_id)?;
        Some(FullItem {
            item_id: (!self.omit_item_ids.get()).then(|| item.item_id.clone()),
            issue_id: fake.issue.id.clone(),
            repo: fake.repo.clone(),
            number: fake.issue.number,
            title: fake.issue.title.clone(),
            body: fake.issue.body.clone(),
            state: fake.issue.state,
            labels: fake.issue.labels.clone(),
            assignees: Vec::new(),
            url: fake.issue.url.clone(),
            fields: field_values(&item.fields),
        })
    }

    fn set_state(&self, issue_id: &str, state: IssueState) {
        if let Some(i) = self
            .issues
            .borrow_mut()
            .iter_mut()
            .find(|i| i.issue.id == issue_id)
        {
            i.issue.state = state;
        }
    }
}

fn field_values(fields: &BTreeMap<String, String>) -> Vec<FieldValue> {
    fields
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| FieldValue {
            field: k.clone(),
            value: v.clone(),
        })
        .collect()
}

impl Gateway for FakeGateway {
    fn list_issues(&self, repo: &RepoRef, label: &str, state: IssueState) -> Result<Vec<Issue>> {
        self.record("list_issues", format!("{repo} {label} {state}"))?;
        Ok(self
            .issues
            .borrow()
            .iter()
            .filter(|i| &i.repo == repo && i.issue.state == state)
            .filter(|i| i.issue.labels.iter().any(|l| l == label))
            .map(|i| i.issue.clone())
            .collect())
    }

    fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue> {
        self.record("get_issue", format!("{repo}#{number}"))?;
        self.issues
            .borrow()
            .iter()
            .find(|i| &i.repo == repo && i.issue.number == number)
            .map(|i| i.issue.clone())
            .ok_or_else(|| PmuError::gateway("get issue", format!("issue #{number} not found")))
    }

    fn get_project(&self, owner: &str, number: u64) -> Result<Project> {
        self.record("get_project", format!("{owner}/{number}"))?;
        Ok(self.project.clone())
    }

    fn get_project_item_id(&self, _project: &Project, issue_id: &str) -> Result<Option<String>> {
        self.record("get_project_item_id", issue_id.to_string())?;
        let number: u64 = issue_id.trim_start_matches("I_").parse().unwrap_or(0);
        if self.failing_lookups.borrow().contains(&number) {
            return Err(PmuError::gateway("get project item", "injected failure"));
        }
        Ok(self
            .items
            .borrow()
            .iter()
            .find(|i| i.issue_id == issue_id)
            .map(|i| i.item_id.clone()))
    }

    fn get_field_value(&self, _project: &Project, item_id: &str, field: &str) -> Result<String> {
        self.record("get_field_value", format!("{item_id} {field}"))?;
        Ok(self
            .items
            .borrow()
            .iter()
            .find(|i| i.item_id == item_id)
            .and_then(|i| i.fields.get(field).cloned())
            .unwrap_or_default())
    }

    fn set_field_value(
        &self,
        _project: &Project,
        item_id: &str,
        field: &str,
        value: &str,
    ) -> Result<()> {
        self.record("set_field_value", format!("{item_id} {field}={value}"))?;
        let mut items = self.items.borrow_mut();
        let item = items
            .iter_mut()
            .find(|i| i.item_id == item_id)
            .ok_or_else(|| PmuError::gateway("set field value", "unknown item"))?;
        item.fields.insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn list_minimal_items(
        &self,
        _project: &Project,
        repo: Option<&RepoRef>,
    ) -> Result<Vec<MinimalItem>> {
        let scope = repo.map(|r| r.to_string()).unwrap_or_else(|| "*".into());
        self.record("list_minimal_items", scope)?;
        let issues = self.issues.borrow();
        Ok(self
            .items
            .borrow()
            .iter()
            .filter_map(|item| {
                let fake = issues.iter().find(|i| i.issue.id == item.issue_id)?;
                if repo.is_some_and(|r| r != &fake.repo) {
                    return None;
                }
                Some(MinimalItem {
                    item_id: item.item_id.clone(),
                    repo: fake.repo.clone(),
                    number: fake.issue.number,
                    state: fake.issue.state,
                    fields: field_values(&item.fields),
                })
            })
            .collect())
    }

    fn hydrate_items(&self, _project: &Project, refs: &[IssueRef]) -> Result<Vec<FullItem>> {
        self.record("hydrate_items", refs.len().to_string())?;
        let everything = self.hydrate_everything.get();
        let items = self.items.borrow();
        Ok(items
            .iter()
            .filter_map(|item| self.full_item(item))
            .filter(|full| everything || refs.contains(&full.issue_ref()))
            .collect())
    }

    fn search_open_items(&self, _project: &Project, repo: &RepoRef) -> Result<Vec<FullItem>> {
        self.record("search_open_items", repo.to_string())?;
        let items = self.items.borrow();
        Ok(items
            .iter()
            .filter_map(|item| self.full_item(item))
            .filter(|full| &full.repo == repo && full.state.is_open())
            .collect())
    }

    fn list_items(&self, _project: &Project) -> Result<Vec<FullItem>> {
        self.record("list_items", String::new())?;
        let items = self.items.borrow();
        Ok(items.iter().filter_map(|item| self.full_item(item)).collect())
    }

    fn update_issue_body(&self, issue_id: &str, body: &str) -> Result<()> {
        self.record("update_issue_body", issue_id.to_string())?;
        if let Some(i) = self
            .issues
            .borrow_mut()
            .iter_mut()
            .find(|i| i.issue.id == issue_id)
        {
            i.issue.body = body.to_string();
        }
        Ok(())
    }

    fn close_issue(&self, issue_id: &str) -> Result<()> {
        self.record("close_issue", issue_id.to_string())?;
        self.set_state(issue_id, IssueState::Closed);
        Ok(())
    }

    fn reopen_issue(&self, issue_id: &str) -> Result<()> {
        self.record("reopen_issue", issue_id.to_string())?;
        self.set_state(issue_id, IssueState::Open);
        Ok(())
    }

    fn create_issue(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
        labels: &[&str],
    ) -> Result<Issue> {
        self.record("create_issue", format!("{repo} {title}"))?;
        let number = self.push_issue(title, IssueState::Open, labels);
        if let Some(i) = self.issues.borrow_mut().last_mut() {
            i.issue.body = body.to_string();
        }
        Ok(self.issue(number))
    }

    fn add_issue_to_project(&self, _project: &Project, issue_id: &str) -> Result<String> {
        self.record("add_issue_to_project", issue_id.to_string())?;
        let item_id = format!("PVTI_{}", issue_id.trim_start_matches("I_"));
        self.items.borrow_mut().push(FakeItem {
            item_id: item_id.clone(),
            issue_id: issue_id.to_string(),
            fields: BTreeMap::new(),
        });
        Ok(item_id)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        self.record("create_branch", name.to_string())
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.record("create_annotated_tag", format!("{name} {message}"))
    }
}
