//! [`Gateway`] backed by the `gh` CLI (GraphQL via `gh api graphql`) and
//! the local `git` binary.

use crate::error::{PmuError, Result};
use crate::gateway::{
    FieldKind, FieldOption, FieldValue, FullItem, Gateway, Issue, IssueRef, IssueState,
    MinimalItem, Project, ProjectField, RepoRef,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Issues fetched per aliased hydration query.
const HYDRATE_BATCH: usize = 25;

const ISSUE_JSON_FIELDS: &str = "id,number,title,body,state,labels,url";

/// Upper bound passed to `gh issue list --limit`.
const ISSUE_LIST_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// GraphQL documents
// ---------------------------------------------------------------------------

const FIELD_VALUES: &str = "fieldValues(first: 30) { nodes { \
    ... on ProjectV2ItemFieldTextValue { text field { ... on ProjectV2FieldCommon { name } } } \
    ... on ProjectV2ItemFieldSingleSelectValue { name field { ... on ProjectV2FieldCommon { name } } } \
    } }";

const PROJECT_QUERY: &str = "query($owner: String!, $number: Int!) { \
    repositoryOwner(login: $owner) { ... on ProjectV2Owner { projectV2(number: $number) { \
    id title number fields(first: 100) { nodes { \
    ... on ProjectV2FieldCommon { id name dataType } \
    ... on ProjectV2SingleSelectField { options { id name } } \
    } } } } } }";

const ITEM_ID_QUERY: &str = "query($id: ID!) { node(id: $id) { ... on Issue { \
    projectItems(first: 50) { nodes { id project { id } } } } } }";

const FIELD_VALUE_QUERY: &str = "query($id: ID!, $field: String!) { node(id: $id) { \
    ... on ProjectV2Item { fieldValueByName(name: $field) { \
    ... on ProjectV2ItemFieldTextValue { text } \
    ... on ProjectV2ItemFieldSingleSelectValue { name } } } } }";

const SET_TEXT_MUTATION: &str = "mutation($project: ID!, $item: ID!, $field: ID!, $text: String!) { \
    updateProjectV2ItemFieldValue(input: { projectId: $project, itemId: $item, fieldId: $field, \
    value: { text: $text } }) { projectV2Item { id } } }";

const SET_OPTION_MUTATION: &str = "mutation($project: ID!, $item: ID!, $field: ID!, $option: String!) { \
    updateProjectV2ItemFieldValue(input: { projectId: $project, itemId: $item, fieldId: $field, \
    value: { singleSelectOptionId: $option } }) { projectV2Item { id } } }";

const CLEAR_MUTATION: &str = "mutation($project: ID!, $item: ID!, $field: ID!) { \
    clearProjectV2ItemFieldValue(input: { projectId: $project, itemId: $item, fieldId: $field }) { \
    projectV2Item { id } } }";

const ADD_ITEM_MUTATION: &str = "mutation($project: ID!, $content: ID!) { \
    addProjectV2ItemById(input: { projectId: $project, contentId: $content }) { item { id } } }";

const UPDATE_BODY_MUTATION: &str = "mutation($id: ID!, $body: String!) { \
    updateIssue(input: { id: $id, body: $body }) { issue { id } } }";

const CLOSE_MUTATION: &str =
    "mutation($id: ID!) { closeIssue(input: { issueId: $id }) { issue { id } } }";

const REOPEN_MUTATION: &str =
    "mutation($id: ID!) { reopenIssue(input: { issueId: $id }) { issue { id } } }";

fn minimal_items_query() -> String {
    format!(
        "query($id: ID!, $after: String) {{ node(id: $id) {{ ... on ProjectV2 {{ \
         items(first: 100, after: $after) {{ pageInfo {{ hasNextPage endCursor }} nodes {{ id \
         content {{ ... on Issue {{ number state repository {{ name owner {{ login }} }} }} }} \
         {FIELD_VALUES} }} }} }} }} }}"
    )
}

fn full_items_query() -> String {
    format!(
        "query($id: ID!, $after: String) {{ node(id: $id) {{ ... on ProjectV2 {{ \
         items(first: 100, after: $after) {{ pageInfo {{ hasNextPage endCursor }} nodes {{ id \
         content {{ ... on Issue {{ {} }} }} {FIELD_VALUES} }} }} }} }} }}",
        issue_selection(false)
    )
}

fn search_query() -> String {
    format!(
        "query($q: String!, $after: String) {{ search(query: $q, type: ISSUE, first: 100, after: $after) {{ \
         pageInfo {{ hasNextPage endCursor }} nodes {{ ... on Issue {{ {} }} }} }} }}",
        issue_selection(true)
    )
}

fn issue_selection(with_project_items: bool) -> String {
    let mut s = String::from(
        "id number title body state url \
         labels(first: 20) { nodes { name } } \
         assignees(first: 10) { nodes { login } } \
         repository { name owner { login } }",
    );
    if with_project_items {
        s.push_str(&format!(
            " projectItems(first: 20) {{ nodes {{ id project {{ id }} {FIELD_VALUES} }} }}"
        ));
    }
    s
}

/// One query fetching every ref through aliases `i0`, `i1`, ...
fn hydrate_query(refs: &[IssueRef]) -> String {
    let selection = issue_selection(true);
    let mut q = String::from("query {");
    for (i, r) in refs.iter().enumerate() {
        q.push_str(&format!(
            " i{i}: repository(owner: {}, name: {}) {{ issue(number: {}) {{ {selection} }} }}",
            graphql_string(&r.owner),
            graphql_string(&r.repo),
            r.number
        ));
    }
    q.push_str(" }");
    q
}

fn graphql_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Default for Nodes<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> Nodes<T> {
    fn into_vec(self) -> Vec<T> {
        self.nodes.into_iter().flatten().collect()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    page_info: PageInfo,
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

#[derive(Deserialize)]
struct NodeData<T> {
    node: Option<T>,
}

#[derive(Deserialize)]
struct Id {
    id: String,
}

#[derive(Deserialize)]
struct Name {
    name: String,
}

#[derive(Deserialize)]
struct Login {
    login: String,
}

#[derive(Deserialize)]
struct GhRepo {
    name: String,
    owner: Login,
}

impl From<GhRepo> for RepoRef {
    fn from(r: GhRepo) -> Self {
        RepoRef::new(r.owner.login, r.name)
    }
}

#[derive(Deserialize)]
struct GhIssue {
    id: String,
    number: u64,
    title: String,
    #[serde(default)]
    body: String,
    state: IssueState,
    #[serde(default)]
    labels: Vec<Name>,
    #[serde(default)]
    url: String,
}

impl From<GhIssue> for Issue {
    fn from(i: GhIssue) -> Self {
        Issue {
            id: i.id,
            number: i.number,
            title: i.title,
            body: i.body,
            state: i.state,
            labels: i.labels.into_iter().map(|l| l.name).collect(),
            url: i.url,
        }
    }
}

/// Text and single-select values carry the field name; other value types
/// arrive as empty objects and are dropped.
#[derive(Deserialize)]
struct GhFieldValue {
    text: Option<String>,
    name: Option<String>,
    field: Option<Name>,
}

fn field_values(nodes: Nodes<GhFieldValue>) -> Vec<FieldValue> {
    nodes
        .into_vec()
        .into_iter()
        .filter_map(|v| {
            let field = v.field?.name;
            let value = v.text.or(v.name)?;
            Some(FieldValue { field, value })
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhField {
    id: Option<String>,
    name: Option<String>,
    data_type: Option<String>,
    #[serde(default)]
    options: Vec<GhOption>,
}

#[derive(Deserialize)]
struct GhOption {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct GhProject {
    id: String,
    #[serde(default)]
    title: String,
    number: u64,
    #[serde(default)]
    fields: Nodes<GhField>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerData {
    repository_owner: Option<OwnerProject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerProject {
    project_v2: Option<GhProject>,
}

fn project_from(p: GhProject, owner: &str) -> Project {
    let fields = p
        .fields
        .into_vec()
        .into_iter()
        .filter_map(|f| {
            let kind = match f.data_type.as_deref() {
                Some("TEXT") => FieldKind::Text,
                Some("SINGLE_SELECT") => FieldKind::SingleSelect,
                _ => FieldKind::Other,
            };
            Some(ProjectField {
                id: f.id?,
                name: f.name?,
                kind,
                options: f
                    .options
                    .into_iter()
                    .map(|o| FieldOption {
                        id: o.id,
                        name: o.name,
                    })
                    .collect(),
            })
        })
        .collect();
    Project {
        id: p.id,
        owner: owner.to_string(),
        number: p.number,
        title: p.title,
        fields,
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhProjectItem {
    id: String,
    project: Option<Id>,
    #[serde(default)]
    field_values: Nodes<GhFieldValue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueProjectItems {
    #[serde(default)]
    project_items: Nodes<GhProjectItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GhFullIssue {
    id: String,
    number: u64,
    title: String,
    #[serde(default)]
    body: String,
    state: IssueState,
    #[serde(default)]
    url: String,
    #[serde(default)]
    labels: Nodes<Name>,
    #[serde(default)]
    assignees: Nodes<Login>,
    repository: GhRepo,
    #[serde(default)]
    project_items: Nodes<GhProjectItem>,
}

impl GhFullIssue {
    /// Convert, taking item id and field values from the item that belongs
    /// to `project_id` (if the issue has one).
    fn into_full(self, project_id: &str) -> FullItem {
        let item = self
            .project_items
            .into_vec()
            .into_iter()
            .find(|i| i.project.as_ref().is_some_and(|p| p.id == project_id));
        let (item_id, fields) = match item {
            Some(i) => (Some(i.id), field_values(i.field_values)),
            None => (None, Vec::new()),
        };
        FullItem {
            item_id,
            issue_id: self.id,
            repo: self.repository.into(),
            number: self.number,
            title: self.title,
            body: self.body,
            state: self.state,
            labels: self.labels.into_vec().into_iter().map(|l| l.name).collect(),
            assignees: self
                .assignees
                .into_vec()
                .into_iter()
                .map(|a| a.login)
                .collect(),
            url: self.url,
            fields,
        }
    }
}

#[derive(Deserialize)]
struct MinimalContent {
    number: u64,
    state: IssueState,
    repository: GhRepo,
}

/// Project item nodes carry `content` as a union; anything that is not an
/// issue (draft, pull request) fails to deserialize and is skipped.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemNode {
    id: String,
    content: Option<serde_json::Value>,
    #[serde(default)]
    field_values: Nodes<GhFieldValue>,
}

impl ItemNode {
    fn into_minimal(self) -> Option<MinimalItem> {
        let content: MinimalContent = serde_json::from_value(self.content?).ok()?;
        Some(MinimalItem {
            item_id: self.id,
            repo: content.repository.into(),
            number: content.number,
            state: content.state,
            fields: field_values(self.field_values),
        })
    }

    fn into_full(self) -> Option<FullItem> {
        let issue: GhFullIssue = serde_json::from_value(self.content?).ok()?;
        let mut full = issue.into_full("");
        full.item_id = Some(self.id);
        full.fields = field_values(self.field_values);
        Some(full)
    }
}

#[derive(Deserialize)]
struct ProjectItems {
    items: Page<ItemNode>,
}

#[derive(Deserialize)]
struct SearchData {
    search: Page<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldValueByName {
    field_value_by_name: Option<GhSingleValue>,
}

#[derive(Deserialize)]
struct GhSingleValue {
    text: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct RepoIssue {
    issue: Option<GhFullIssue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddItemData {
    add_project_v2_item_by_id: AddedItem,
}

#[derive(Deserialize)]
struct AddedItem {
    item: Id,
}

/// `gh issue create` prints the new issue URL; the number is its last
/// path segment.
fn issue_number_from_url(url: &str) -> Option<u64> {
    url.trim().rsplit('/').next()?.parse().ok()
}

/// Decode `gh issue list` output. The flag is set when the listing filled
/// `limit`, meaning `gh` may have stopped early.
fn parse_issue_list(op: &str, stdout: &[u8], limit: usize) -> Result<(Vec<Issue>, bool)> {
    let issues: Vec<GhIssue> =
        serde_json::from_slice(stdout).map_err(|e| PmuError::gateway(op, e))?;
    let truncated = issues.len() >= limit;
    Ok((issues.into_iter().map(Issue::from).collect(), truncated))
}

fn parse_response<T: DeserializeOwned>(op: &str, stdout: &[u8]) -> Result<T> {
    let resp: GraphqlResponse<T> =
        serde_json::from_slice(stdout).map_err(|e| PmuError::gateway(op, e))?;
    if !resp.errors.is_empty() {
        let msg = resp
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(PmuError::gateway(op, msg));
    }
    resp.data
        .ok_or_else(|| PmuError::gateway(op, "response contained no data"))
}

// ---------------------------------------------------------------------------
// GhGateway
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Var<'a> {
    Str(&'a str, &'a str),
    Int(&'a str, u64),
}

pub struct GhGateway {
    gh: PathBuf,
    workdir: PathBuf,
}

impl GhGateway {
    /// Locate `gh` on `PATH`; git commands run in `workdir`.
    pub fn new(workdir: &Path) -> Result<Self> {
        let gh = which::which("gh")
            .map_err(|_| PmuError::gateway("locate gh", "the GitHub CLI is not installed"))?;
        Ok(Self {
            gh,
            workdir: workdir.to_path_buf(),
        })
    }

    fn run(&self, op: &str, program: &Path, args: &[String]) -> Result<Vec<u8>> {
        tracing::debug!(op, program = %program.display(), "running");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|e| PmuError::gateway(op, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let msg = if stderr.is_empty() { stdout } else { stderr };
            return Err(PmuError::gateway(op, msg));
        }
        Ok(output.stdout)
    }

    fn gh(&self, op: &str, args: &[String]) -> Result<Vec<u8>> {
        self.run(op, &self.gh, args)
    }

    fn git(&self, op: &str, args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.run(op, Path::new("git"), &args).map(|_| ())
    }

    fn graphql<T: DeserializeOwned>(&self, op: &str, query: &str, vars: &[Var]) -> Result<T> {
        let mut args = vec![
            "api".to_string(),
            "graphql".to_string(),
            "-f".to_string(),
            format!("query={query}"),
        ];
        for v in vars {
            match v {
                Var::Str(k, val) => {
                    args.push("-f".to_string());
                    args.push(format!("{k}={val}"));
                }
                Var::Int(k, val) => {
                    args.push("-F".to_string());
                    args.push(format!("{k}={val}"));
                }
            }
        }
        let stdout = self.gh(op, &args)?;
        parse_response(op, &stdout)
    }

    fn mutate(&self, op: &str, query: &str, vars: &[Var]) -> Result<()> {
        self.graphql::<serde_json::Value>(op, query, vars).map(|_| ())
    }

    fn issue_json(&self, op: &str, args: &[String]) -> Result<Vec<u8>> {
        let mut args = args.to_vec();
        args.push("--json".to_string());
        args.push(ISSUE_JSON_FIELDS.to_string());
        self.gh(op, &args)
    }

    fn project_items(&self, op: &str, query: &str, project: &Project) -> Result<Vec<ItemNode>> {
        let mut nodes = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut vars = vec![Var::Str("id", &project.id)];
            if let Some(cursor) = after.as_deref() {
                vars.push(Var::Str("after", cursor));
            }
            let data: NodeData<ProjectItems> = self.graphql(op, query, &vars)?;
            let page = data
                .node
                .ok_or_else(|| PmuError::gateway(op, "project not found"))?
                .items;
            nodes.extend(page.nodes.into_iter().flatten());
            if !page.page_info.has_next_page {
                break;
            }
            after = page.page_info.end_cursor;
            if after.is_none() {
                break;
            }
        }
        Ok(nodes)
    }
}

impl Gateway for GhGateway {
    fn list_issues(&self, repo: &RepoRef, label: &str, state: IssueState) -> Result<Vec<Issue>> {
        let op = "list issues";
        let args = vec![
            "issue".to_string(),
            "list".to_string(),
            "--repo".to_string(),
            repo.to_string(),
            "--label".to_string(),
            label.to_string(),
            "--state".to_string(),
            state.to_string(),
            "--limit".to_string(),
            ISSUE_LIST_LIMIT.to_string(),
        ];
        let stdout = self.issue_json(op, &args)?;
        let (issues, truncated) = parse_issue_list(op, &stdout, ISSUE_LIST_LIMIT)?;
        if truncated {
            tracing::warn!(
                repo = %repo,
                label,
                state = %state,
                limit = ISSUE_LIST_LIMIT,
                "issue listing hit the limit, older issues were not read"
            );
        }
        Ok(issues)
    }

    fn get_issue(&self, repo: &RepoRef, number: u64) -> Result<Issue> {
        let op = "get issue";
        let args = vec![
            "issue".to_string(),
            "view".to_string(),
            number.to_string(),
            "--repo".to_string(),
            repo.to_string(),
        ];
        let stdout = self.issue_json(op, &args)?;
        let issue: GhIssue =
            serde_json::from_slice(&stdout).map_err(|e| PmuError::gateway(op, e))?;
        Ok(issue.into())
    }

    fn get_project(&self, owner: &str, number: u64) -> Result<Project> {
        let op = "get project";
        let data: OwnerData = self.graphql(
            op,
            PROJECT_QUERY,
            &[Var::Str("owner", owner), Var::Int("number", number)],
        )?;
        let project = data
            .repository_owner
            .and_then(|o| o.project_v2)
            .ok_or_else(|| PmuError::gateway(op, format!("project {owner}/{number} not found")))?;
        Ok(project_from(project, owner))
    }

    fn get_project_item_id(&self, project: &Project, issue_id: &str) -> Result<Option<String>> {
        let data: NodeData<IssueProjectItems> = self.graphql(
            "get project item",
            ITEM_ID_QUERY,
            &[Var::Str("id", issue_id)],
        )?;
        Ok(data.node.and_then(|n| {
            n.project_items
                .into_vec()
                .into_iter()
                .find(|i| i.project.as_ref().is_some_and(|p| p.id == project.id))
                .map(|i| i.id)
        }))
    }

    fn get_field_value(&self, _project: &Project, item_id: &str, field: &str) -> Result<String> {
        let data: NodeData<FieldValueByName> = self.graphql(
            "get field value",
            FIELD_VALUE_QUERY,
            &[Var::Str("id", item_id), Var::Str("field", field)],
        )?;
        Ok(data
            .node
            .and_then(|n| n.field_value_by_name)
            .and_then(|v| v.text.or(v.name))
            .unwrap_or_default())
    }

    fn set_field_value(
        &self,
        project: &Project,
        item_id: &str,
        field: &str,
        value: &str,
    ) -> Result<()> {
        let op = "set field value";
        let f = project.require_field(field)?;
        let base = [
            Var::Str("project", &project.id),
            Var::Str("item", item_id),
            Var::Str("field", &f.id),
        ];

        if value.is_empty() {
            return self.mutate(op, CLEAR_MUTATION, &base);
        }

        match f.kind {
            FieldKind::Text => {
                let mut vars = base.to_vec();
                vars.push(Var::Str("text", value));
                self.mutate(op, SET_TEXT_MUTATION, &vars)
            }
            FieldKind::SingleSelect => {
                let option = f.option(value).ok_or_else(|| {
                    PmuError::gateway(op, format!("'{value}' is not an option of field '{field}'"))
                })?;
                let mut vars = base.to_vec();
                vars.push(Var::Str("option", &option.id));
                self.mutate(op, SET_OPTION_MUTATION, &vars)
            }
            FieldKind::Other => Err(PmuError::gateway(
                op,
                format!("field '{field}' is neither text nor single select"),
            )),
        }
    }

    fn list_minimal_items(
        &self,
        project: &Project,
        repo: Option<&RepoRef>,
    ) -> Result<Vec<MinimalItem>> {
        let nodes = self.project_items("list minimal items", &minimal_items_query(), project)?;
        Ok(nodes
            .into_iter()
            .filter_map(ItemNode::into_minimal)
            .filter(|i| repo.map_or(true, |r| &i.repo == r))
            .collect())
    }

    fn hydrate_items(&self, project: &Project, refs: &[IssueRef]) -> Result<Vec<FullItem>> {
        let op = "hydrate items";
        let mut items = Vec::with_capacity(refs.len());
        for batch in refs.chunks(HYDRATE_BATCH) {
            let mut data: HashMap<String, Option<RepoIssue>> =
                self.graphql(op, &hydrate_query(batch), &[])?;
            for i in 0..batch.len() {
                if let Some(Some(RepoIssue { issue: Some(issue) })) = data.remove(&format!("i{i}")) {
                    items.push(issue.into_full(&project.id));
                }
            }
        }
        Ok(items)
    }

    fn search_open_items(&self, project: &Project, repo: &RepoRef) -> Result<Vec<FullItem>> {
        let op = "search open items";
        let q = format!("repo:{repo} is:issue is:open");
        let query = search_query();
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut vars = vec![Var::Str("q", &q)];
            if let Some(cursor) = after.as_deref() {
                vars.push(Var::Str("after", cursor));
            }
            let data: SearchData = self.graphql(op, &query, &vars)?;
            for node in data.search.nodes.into_iter().flatten() {
                let Ok(issue) = serde_json::from_value::<GhFullIssue>(node) else {
                    continue;
                };
                let full = issue.into_full(&project.id);
                if full.item_id.is_some() {
                    items.push(full);
                }
            }
            if !data.search.page_info.has_next_page {
                break;
            }
            after = data.search.page_info.end_cursor;
            if after.is_none() {
                break;
            }
        }
        Ok(items)
    }

    fn list_items(&self, project: &Project) -> Result<Vec<FullItem>> {
        let nodes = self.project_items("list items", &full_items_query(), project)?;
        Ok(nodes.into_iter().filter_map(ItemNode::into_full).collect())
    }

    fn update_issue_body(&self, issue_id: &str, body: &str) -> Result<()> {
        self.mutate(
            "update issue body",
            UPDATE_BODY_MUTATION,
            &[Var::Str("id", issue_id), Var::Str("body", body)],
        )
    }

    fn close_issue(&self, issue_id: &str) -> Result<()> {
        self.mutate("close issue", CLOSE_MUTATION, &[Var::Str("id", issue_id)])
    }

    fn reopen_issue(&self, issue_id: &str) -> Result<()> {
        self.mutate("reopen issue", REOPEN_MUTATION, &[Var::Str("id", issue_id)])
    }

    fn create_issue(
        &self,
        repo: &RepoRef,
        title: &str,
        body: &str,
        labels: &[&str],
    ) -> Result<Issue> {
        let op = "create issue";
        let mut args = vec![
            "issue".to_string(),
            "create".to_string(),
            "--repo".to_string(),
            repo.to_string(),
            "--title".to_string(),
            title.to_string(),
            "--body".to_string(),
            body.to_string(),
        ];
        for label in labels {
            args.push("--label".to_string());
            args.push(label.to_string());
        }
        let stdout = self.gh(op, &args)?;
        let url = String::from_utf8_lossy(&stdout).to_string();
        let number = issue_number_from_url(&url).ok_or_else(|| {
            PmuError::gateway(op, format!("could not parse issue number from '{}'", url.trim()))
        })?;
        self.get_issue(repo, number)
    }

    fn add_issue_to_project(&self, project: &Project, issue_id: &str) -> Result<String> {
        let data: AddItemData = self.graphql(
            "add issue to project",
            ADD_ITEM_MUTATION,
            &[Var::Str("project", &project.id), Var::Str("content", issue_id)],
        )?;
        Ok(data.add_project_v2_item_by_id.item.id)
    }

    fn create_branch(&self, name: &str) -> Result<()> {
        self.git("create branch", &["checkout", "-b", name])
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        self.git("create tag", &["tag", "-a", name, "-m", message])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
