use crate::cmd::connect;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use clap::Subcommand;
use pmu_core::branch::{BranchManager, CloseOptions, CloseOutcome, ClosePlan};
use pmu_core::gateway::FullItem;
use std::io::{BufRead, Write};
use std::path::Path;

#[derive(Subcommand)]
pub enum BranchSubcommand {
    /// Start a new branch: create it locally and open its tracker issue
    Start {
        /// Branch name, e.g. v1.2.0 or patch/v1.1.1
        #[arg(long)]
        name: String,
        /// Optional codename shown in the tracker title
        #[arg(long)]
        codename: Option<String>,
    },
    /// Assign an issue to the active branch
    Add {
        #[arg(value_parser = parse_issue_number)]
        issue: u64,
    },
    /// Unassign an issue from its branch
    Remove {
        #[arg(value_parser = parse_issue_number)]
        issue: u64,
    },
    /// Show the active branch and its issue counts
    Current {
        /// Rewrite the tracker body with the current member list
        #[arg(long)]
        refresh: bool,
    },
    /// Close a branch, moving unfinished issues back to the backlog
    Close {
        /// Branch name (omit to close the active branch)
        name: Option<String>,
        /// Create an annotated git tag for the version
        #[arg(long)]
        tag: bool,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
        /// Show what would happen without changing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Reopen a closed branch
    Reopen { name: String },
    /// List every branch, newest version first
    List,
}

/// Accept `12` or `#12`.
fn parse_issue_number(s: &str) -> Result<u64, String> {
    let digits = s.trim().trim_start_matches('#');
    match digits.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{s}' is not an issue number")),
    }
}

pub fn run(root: &Path, subcmd: BranchSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        BranchSubcommand::Start { name, codename } => {
            start(root, &name, codename.as_deref(), json)
        }
        BranchSubcommand::Add { issue } => add(root, issue, json),
        BranchSubcommand::Remove { issue } => remove(root, issue, json),
        BranchSubcommand::Current { refresh } => current(root, refresh, json),
        BranchSubcommand::Close {
            name,
            tag,
            yes,
            dry_run,
        } => close(
            root,
            name.as_deref(),
            CloseOptions { tag, dry_run, yes },
            json,
        ),
        BranchSubcommand::Reopen { name } => reopen(root, &name, json),
        BranchSubcommand::List => list(root, json),
    }
}

fn start(root: &Path, name: &str, codename: Option<&str>, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let out = BranchManager::new(&gw, &config)
        .start(name, codename)
        .with_context(|| format!("failed to start branch '{name}'"))?;

    if json {
        print_json(&out)?;
    } else {
        println!("Created branch '{}'.", out.branch);
        println!("Tracker: #{} {}", out.number, out.title);
        if !out.url.is_empty() {
            println!("  {}", out.url);
        }
    }
    Ok(())
}

fn add(root: &Path, issue: u64, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let out = BranchManager::new(&gw, &config)
        .add(issue)
        .with_context(|| format!("failed to add issue #{issue}"))?;

    if json {
        print_json(&out)?;
    } else if out.changed {
        println!("Added #{} to branch {}.", out.issue, out.version);
    } else {
        println!("#{} is already in branch {}.", out.issue, out.version);
    }
    Ok(())
}

fn remove(root: &Path, issue: u64, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let out = BranchManager::new(&gw, &config)
        .remove(issue)
        .with_context(|| format!("failed to remove issue #{issue}"))?;

    if json {
        print_json(&out)?;
    } else if out.changed {
        println!("Removed #{} from branch {}.", out.issue, out.previous);
    } else {
        println!("#{} is not assigned to a branch.", out.issue);
    }
    Ok(())
}

fn current(root: &Path, refresh: bool, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let report = BranchManager::new(&gw, &config)
        .current(refresh)
        .context("failed to read active branch")?;

    let Some(report) = report else {
        if json {
            print_json(&serde_json::json!({ "active": null }))?;
        } else {
            println!("No active release.");
        }
        return Ok(());
    };

    if json {
        print_json(&serde_json::json!({ "active": report }))?;
        return Ok(());
    }

    let t = &report.tracker;
    println!("Branch:  {}", t.identity);
    println!("Tracker: #{} {}", t.number(), t.issue.title);
    println!(
        "Issues:  {} total, {} open, {} closed",
        report.total, report.open, report.closed
    );
    if report.refreshed {
        println!("Tracker body refreshed.");
    }
    Ok(())
}

fn close(root: &Path, name: Option<&str>, opts: CloseOptions, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let outcome = BranchManager::new(&gw, &config)
        .close(name, opts, confirm_close)
        .context("failed to close branch")?;

    if json {
        return print_json(&outcome);
    }

    match outcome {
        CloseOutcome::DryRun(plan) => {
            println!("Dry run: nothing was changed.");
            print_plan(&plan);
        }
        CloseOutcome::Aborted(_) => println!("Aborted."),
        CloseOutcome::Closed(report) => {
            println!("Closed {}.", report.plan.tracker.identity);
            println!(
                "  {} done, {} in parking lot left in place",
                report.plan.done.len(),
                report.plan.parking_lot.len()
            );
            println!("  {}", report.summary());
            if !report.failed.is_empty() {
                let failed: Vec<String> = report.failed.iter().map(|n| format!("#{n}")).collect();
                println!("  could not move: {}", failed.join(", "));
            }
            if let Some(tag) = &report.tag {
                println!("  tagged {tag}");
            }
        }
    }
    Ok(())
}

/// Print the plan and ask on stderr, so `--json` stdout stays clean.
fn confirm_close(plan: &ClosePlan) -> bool {
    let mut err = std::io::stderr();
    let _ = writeln!(err, "About to close {}:", plan.tracker.identity);
    let _ = writeln!(
        err,
        "  {} done, {} in parking lot, {} to move to backlog",
        plan.done.len(),
        plan.parking_lot.len(),
        plan.to_move.len()
    );
    for item in &plan.to_move {
        let _ = writeln!(err, "    #{} {}", item.number, item.title);
    }
    let _ = write!(err, "Proceed? [y/N] ");
    let _ = err.flush();

    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn print_plan(plan: &ClosePlan) {
    println!("Branch {} (#{})", plan.tracker.identity, plan.tracker.number());
    let sections: [(&str, &[FullItem]); 3] = [
        ("Done", &plan.done),
        ("Parking lot (left in place)", &plan.parking_lot),
        ("Move to backlog", &plan.to_move),
    ];
    for (heading, items) in sections {
        println!("{heading}: {}", items.len());
        for item in items {
            println!("  #{} {}", item.number, truncate(&item.title, 72));
        }
    }
}

fn reopen(root: &Path, name: &str, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let tracker = BranchManager::new(&gw, &config)
        .reopen(name)
        .with_context(|| format!("failed to reopen branch '{name}'"))?;

    if json {
        print_json(&tracker)?;
    } else {
        println!("Reopened {} (#{}).", tracker.identity, tracker.number());
    }
    Ok(())
}

fn list(root: &Path, json: bool) -> anyhow::Result<()> {
    let (config, gw) = connect(root)?;
    let branches = BranchManager::new(&gw, &config)
        .list()
        .context("failed to list branches")?;

    if json {
        return print_json(&branches);
    }

    if branches.is_empty() {
        println!("No branches.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = branches
        .iter()
        .map(|b| {
            vec![
                b.version.clone(),
                b.track.clone(),
                b.codename.clone(),
                format!("#{}", b.number),
                b.status.to_string(),
            ]
        })
        .collect();
    print_table(&["VERSION", "TRACK", "CODENAME", "ISSUE", "STATUS"], &rows);
    Ok(())
}
