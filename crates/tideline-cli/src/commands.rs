use std::path::Path;
use std::process::ExitCode;

use anyhow::{anyhow, Context};
use colored::{ColoredString, Colorize};
use serde::Serialize;
use tideline_sdk::{
    DiffNode, Direction, ItemPath, MergeStatus, NullProgress, SessionConfig, SyncSession,
};

use crate::cli::*;

/// Exit status when items are left in conflict.
pub const EXIT_CONFLICTS: u8 = 1;
/// Exit status on any error.
pub const EXIT_ERROR: u8 = 2;

pub fn run_command(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = session_config(&cli, Path::new("."))?;
    let session = SyncSession::open(config).context("cannot open session")?;
    session.scan(&NullProgress).context("scan failed")?;

    match cli.command {
        Command::Status(args) => cmd_status(&session, args, &cli.format),
        Command::Merge(args) => cmd_merge(&session, args, &cli.format),
        Command::MarkMerged(args) => cmd_mark_merged(&session, args),
        Command::Show(args) => cmd_show(&session, args, &cli.format),
        Command::TagConflicts(_) => cmd_tag_conflicts(&session, &cli.format),
    }
}

/// The config file (explicit, or discovered in `cwd`), with root flags
/// applied on top.
fn session_config(cli: &Cli, cwd: &Path) -> anyhow::Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::discover(cwd)?.unwrap_or_default(),
    };
    if let Some(local) = &cli.local {
        config.local = local.clone();
    }
    if let Some(base) = &cli.base {
        config.base = Some(base.clone());
    }
    if let Some(remote) = &cli.remote {
        config.remote = remote.clone();
    }
    Ok(config)
}

fn parse_paths(raw: &[String]) -> anyhow::Result<Vec<ItemPath>> {
    raw.iter()
        .map(|p| ItemPath::new(p).with_context(|| format!("bad path {p:?}")))
        .collect()
}

#[derive(Serialize)]
struct ItemReport<'a> {
    path: &'a str,
    kind: String,
    bits: u32,
    conflict: Vec<&'static str>,
    local: Option<&'a str>,
    base: Option<&'a str>,
    remote: Option<&'a str>,
}

impl<'a> ItemReport<'a> {
    fn new(node: &'a DiffNode) -> Self {
        let kind = node.kind();
        Self {
            path: node.path().as_str(),
            kind: kind.to_string(),
            bits: kind.bits(),
            conflict: kind.conflict().names(),
            local: node.local().content.as_ref().map(|h| h.revision()),
            base: node.base().map(|h| h.revision()),
            remote: node.remote().map(|h| h.revision()),
        }
    }
}

fn marker(node: &DiffNode) -> ColoredString {
    match node.kind().direction() {
        Direction::Incoming => "<".cyan(),
        Direction::Outgoing => ">".green(),
        Direction::Conflicting => "!".red().bold(),
        Direction::None => "~".yellow(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_status(
    session: &SyncSession,
    args: StatusArgs,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let nodes: Vec<DiffNode> = session
        .status()
        .into_iter()
        .filter(|n| !args.conflicts || n.kind().is_conflicting())
        .collect();

    match format {
        OutputFormat::Json => {
            print_json(&nodes.iter().map(ItemReport::new).collect::<Vec<_>>())?
        }
        OutputFormat::Text if nodes.is_empty() => println!("{}", "Everything in sync.".green()),
        OutputFormat::Text => {
            for node in &nodes {
                println!("{} {}  {}", marker(node), node.path(), node.kind().to_string().dimmed());
            }
            let conflicts = nodes.iter().filter(|n| n.kind().is_conflicting()).count();
            println!("\n{} item(s) out of sync, {} conflicting", nodes.len(), conflicts);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_merge(
    session: &SyncSession,
    args: MergeArgs,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let paths = parse_paths(&args.paths)?;
    let status = session.merge(&paths, args.force, &NullProgress)?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Text => match &status {
            MergeStatus::Ok => println!("{} Merged.", "✓".green().bold()),
            MergeStatus::Conflicts(items) => {
                println!("{} {} item(s) could not be merged:", "✗".red().bold(), items.len());
                for path in items {
                    println!("  {} {}", "conflict:".red(), path);
                }
            }
        },
    }
    Ok(if status.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_CONFLICTS)
    })
}

fn cmd_mark_merged(session: &SyncSession, args: MarkMergedArgs) -> anyhow::Result<ExitCode> {
    let paths = parse_paths(&args.paths)?;
    session.mark_as_merged(&paths, &NullProgress)?;
    for path in &paths {
        println!("  {} {}", "merged:".green(), path);
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_show(
    session: &SyncSession,
    args: ShowArgs,
    format: &OutputFormat,
) -> anyhow::Result<ExitCode> {
    let path = ItemPath::new(&args.path).with_context(|| format!("bad path {:?}", args.path))?;
    let node = session
        .node(&path)
        .ok_or_else(|| anyhow!("no such item: {path}"))?;
    let report = ItemReport::new(&node);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("{} {}", marker(&node), report.path.bold());
            println!("  Kind:   {} ({})", report.kind, report.bits);
            let none = || "(absent)".dimmed().to_string();
            println!("  Local:  {}", report.local.map(str::to_string).unwrap_or_else(none));
            println!("  Base:   {}", report.base.map(str::to_string).unwrap_or_else(none));
            println!("  Remote: {}", report.remote.map(str::to_string).unwrap_or_else(none));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_tag_conflicts(session: &SyncSession, format: &OutputFormat) -> anyhow::Result<ExitCode> {
    let tagged = session.tag_conflicts(&NullProgress)?;
    let conflicts: Vec<DiffNode> = session
        .status()
        .into_iter()
        .filter(|n| n.kind().is_conflicting())
        .collect();

    match format {
        OutputFormat::Json => {
            print_json(&conflicts.iter().map(ItemReport::new).collect::<Vec<_>>())?
        }
        OutputFormat::Text => {
            for node in &conflicts {
                println!("{} {}  {}", marker(node), node.path(), node.kind());
            }
            println!("\n{tagged} conflict(s) tagged");
        }
    }
    Ok(ExitCode::SUCCESS)
}
