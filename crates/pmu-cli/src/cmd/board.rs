use crate::cmd::connect;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use pmu_core::config::Config;
use pmu_core::gateway::{FullItem, Gateway};
use pmu_core::query::{self, ItemQuery};
use serde::Serialize;
use std::path::Path;

const NO_STATUS: &str = "(no status)";

#[derive(Serialize)]
struct Column<'a> {
    status: String,
    items: Vec<&'a FullItem>,
}

pub fn run(root: &Path, all: bool, status: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let project = gw
        .get_project(&config.project.owner, config.project.number)
        .context("failed to load project")?;
    let query = ItemQuery {
        repos: config
            .repository_refs()
            .context("failed to read repositories")?,
        include_closed: all,
    };
    let items = query::fetch_items(&gw, &project, &query).context("failed to fetch items")?;

    let columns = group_by_status(&config, &items, status);

    if json {
        return print_json(&columns);
    }

    if columns.iter().all(|c| c.items.is_empty()) {
        println!("No items.");
        return Ok(());
    }

    for column in columns.iter().filter(|c| !c.items.is_empty()) {
        println!("{} ({})", column.status, column.items.len());
        let rows: Vec<Vec<String>> = column
            .items
            .iter()
            .map(|i| {
                vec![
                    format!("#{}", i.number),
                    truncate(&i.title, 60),
                    query::branch_value(&i.fields).unwrap_or("").to_string(),
                    i.repo.to_string(),
                ]
            })
            .collect();
        print_table(&["ISSUE", "TITLE", "BRANCH", "REPO"], &rows);
        println!();
    }
    Ok(())
}

/// Configured status values first in workflow order, then any other values
/// seen on the board, then items with no status.
fn group_by_status<'a>(
    config: &Config,
    items: &'a [FullItem],
    only: Option<&str>,
) -> Vec<Column<'a>> {
    let status = config.status();
    let v = &status.values;
    let candidates = [
        v.backlog.as_str(),
        v.in_progress.as_str(),
        v.parking_lot.as_str(),
        v.done.as_str(),
    ]
    .into_iter()
    .chain(items.iter().filter_map(|i| i.field_value(&status.field)))
    .chain(std::iter::once(NO_STATUS));

    let mut order: Vec<String> = Vec::new();
    for name in candidates {
        if !name.is_empty() && !order.iter().any(|o| o.eq_ignore_ascii_case(name)) {
            order.push(name.to_string());
        }
    }

    order
        .into_iter()
        .filter(|name| only.map_or(true, |o| o.eq_ignore_ascii_case(name)))
        .map(|name| {
            let items = items
                .iter()
                .filter(|i| match i.field_value(&status.field) {
                    Some(s) if !s.is_empty() => s.eq_ignore_ascii_case(&name),
                    _ => name == NO_STATUS,
                })
                .collect();
            Column {
                status: name,
                items,
            }
        })
        .collect()
}
