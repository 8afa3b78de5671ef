//! The issue/project gateway seam.
//!
//! Everything the branch lifecycle needs from GitHub goes through the
//! [`Gateway`] trait so the lifecycle rules can be exercised without a
//! network. [`crate::gh::GhGateway`] is the production implementation.

use crate::error::{PmuError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Repositories and issues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(PmuError::InvalidRepository(s.to_string())),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn is_open(self) -> bool {
        self == IssueState::Open
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// GraphQL node id.
    pub id: String,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub url: String,
}

/// Identifies an issue across repositories without fetching it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    SingleSelect,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldOption {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectField {
    pub id: String,
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

impl ProjectField {
    pub fn option(&self, name: &str) -> Option<&FieldOption> {
        self.options
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner: String,
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fields: Vec<ProjectField>,
}

impl Project {
    pub fn field(&self, name: &str) -> Option<&ProjectField> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn require_field(&self, name: &str) -> Result<&ProjectField> {
        self.field(name)
            .ok_or_else(|| PmuError::FieldNotFound(name.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Item projections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub field: String,
    pub value: String,
}

fn lookup<'a>(fields: &'a [FieldValue], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|f| f.field.eq_ignore_ascii_case(name))
        .map(|f| f.value.as_str())
}

/// The cheap shape of a project item: enough to decide branch membership
/// and to partition by issue state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinimalItem {
    pub item_id: String,
    pub repo: RepoRef,
    pub number: u64,
    pub state: IssueState,
    #[serde(default)]
    pub fields: Vec<FieldValue>,
}

impl MinimalItem {
    pub fn field_value(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }

    pub fn issue_ref(&self) -> IssueRef {
        IssueRef {
            owner: self.repo.owner.clone(),
            repo: self.repo.name.clone(),
            number: self.number,
        }
    }
}

/// The expensive shape of a project item, for display and mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullItem {
    /// `None` when the issue was fetched but its project item was not
    /// returned alongside it.
    pub item_id: Option<String>,
    pub issue_id: String,
    pub repo: RepoRef,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub fields: Vec<FieldValue>,
}

impl FullItem {
    pub fn field_value(&self, name: &str) -> Option<&str> {
        lookup(&self.fields, name)
    }

    pub fn issue_ref(&self) -> IssueRef {
        IssueRef {
            owner: self.repo.owner.clone(),
            repo: self.repo.name.clone(),
            number: self.number,
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Operations consumed from GitHub and the local git checkout.
///
/// Implementations report every failure as [`PmuError::Gateway`] naming the
/// operation. Nothing here retries.
pub trait Gateway {
    fn list_issues(&self, repo: &RepoRef, label: &str, state: IssueState) -> Result<Vec<Issue>>;

    fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue>;

    fn get_project(&self, owner: &str, number: u64) -> Result<Project>;

    /// `Ok(None)` when the issue is not in the project.
    fn get_project_item_id(&self, project: &Project, issue_id: &str) -> Result<Option<String>>;

    /// Empty string when the field is unset.
    fn get_field_value(&self, project: &Project, item_id: &str, field: &str) -> Result<String>;

    /// An empty `value` clears the field.
    fn set_field_value(
        &self,
        project: &Project,
        item_id: &str,
        field: &str,
        value: &str,
    ) -> Result<()>;

    fn list_minimal_items(
        &self,
        project: &Project,
        repo: Option<&RepoRef>,
    ) -> Result<Vec<MinimalItem>>;

    fn hydrate_items(&self, project: &Project, refs: &[IssueRef]) -> Result<Vec<FullItem>>;

    /// Server-side search for open issues of one repository that are in the
    /// project.
    fn search_open_items(&self, project: &Project, repo: &RepoRef) -> Result<Vec<FullItem>>;

    /// Every item in the project, any state.
    fn list_items(&self, project: &Project) -> Result<Vec<FullItem>>;

    fn update_issue_body(&self, issue_id: &str, body: &str) -> Result<()>;

    fn close_issue(&self, issue_id: &str) -> Result<()>;

    fn reopen_issue(&self, issue_id: &str) -> Result<()>;

    fn create_issue(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
        labels: &[&str],
    ) -> Result<Issue>;

    /// Returns the new project item id.
    fn add_issue_to_project(&self, project: &Project, issue_id: &str) -> Result<String>;

    fn create_branch(&self, name: &str) -> Result<()>;

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_parse() {
        let r = RepoRef::parse("acme/widgets").unwrap();
        assert_eq!(r, RepoRef::new("acme", "widgets"));
        assert_eq!(r.to_string(), "acme/widgets");

        for bad in ["widgets", "/widgets", "acme/", "a/b/c"] {
            assert!(matches!(
                RepoRef::parse(bad),
                Err(PmuError::InvalidRepository(_))
            ));
        }
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let item = MinimalItem {
            item_id: "PVTI_1".into(),
            repo: RepoRef::new("acme", "widgets"),
            number: 7,
            state: IssueState::Open,
            fields: vec![FieldValue {
                field: "Branch".into(),
                value: "1.2.0".into(),
            }],
        };
        assert_eq!(item.field_value("branch"), Some("1.2.0"));
        assert_eq!(item.field_value("Release"), None);
        assert_eq!(item.issue_ref().to_string(), "acme/widgets#7");
    }

    #[test]
    fn project_option_lookup() {
        let project = Project {
            id: "PVT_1".into(),
            owner: "acme".into(),
            number: 3,
            title: String::new(),
            fields: vec![ProjectField {
                id: "F1".into(),
                name: "Status".into(),
                kind: FieldKind::SingleSelect,
                options: vec![FieldOption {
                    id: "O1".into(),
                    name: "In progress".into(),
                }],
            }],
        };
        let status = project.require_field("status").unwrap();
        assert_eq!(status.option("in progress").unwrap().id, "O1");
        assert!(matches!(
            project.require_field("Branch"),
            Err(PmuError::FieldNotFound(_))
        ));
    }
}
