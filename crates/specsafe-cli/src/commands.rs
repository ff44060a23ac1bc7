//! Command-line surface and dispatch

use crate::context::ProjectContext;
use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use specsafe_allocator::format_id;
use specsafe_artifact::{read_string, ErrorKind, Namespace};
use specsafe_completeness::{CompletenessResult, SectionStatus};
use specsafe_snapshot::{ConfirmRestore, RestoreOutcome, RestoreSummary, SnapshotName};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

/// Exit code for errors that carry no specsafe error kind
pub const EXIT_OTHER: i32 = 1;

/// Build the `specsafe` command tree
#[must_use]
pub fn cli() -> Command {
    let namespace = || {
        Arg::new("namespace")
            .required(true)
            .help("Namespace key (directory under the specs root)")
    };
    let snapshot_name = |required: bool| {
        Arg::new("name")
            .required(required)
            .help("Snapshot name, e.g. snapshot-003")
    };

    Command::new("specsafe")
        .version(clap::crate_version!())
        .about("Crash-safe identifiers, verified snapshots and completeness scoring for spec documents")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to specsafe.toml (default: search upward from the working directory)"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("checkpoint")
                .about("Create, list, restore and prune snapshots")
                .subcommand_required(true)
                .subcommand(
                    Command::new("create")
                        .about("Snapshot the namespace's current document")
                        .arg(namespace())
                        .arg(Arg::new("description").required(true).help("What this snapshot is for"))
                        .arg(
                            Arg::new("document")
                                .long("document")
                                .value_parser(value_parser!(PathBuf))
                                .help("Snapshot this file instead of the located document"),
                        ),
                )
                .subcommand(
                    Command::new("list")
                        .about("List snapshots, newest first")
                        .arg(namespace()),
                )
                .subcommand(
                    Command::new("restore")
                        .about("Restore a snapshot (the latest when no name is given)")
                        .arg(namespace())
                        .arg(snapshot_name(false))
                        .arg(
                            Arg::new("force")
                                .long("force")
                                .action(ArgAction::SetTrue)
                                .help("Skip the confirmation prompt"),
                        ),
                )
                .subcommand(
                    Command::new("cleanup")
                        .about("Delete snapshots older than N days")
                        .arg(namespace())
                        .arg(
                            Arg::new("older-than")
                                .long("older-than")
                                .value_parser(value_parser!(u32))
                                .help("Age in days (default: snapshots.retention_days)"),
                        ),
                )
                .subcommand(
                    Command::new("delete")
                        .about("Delete one snapshot")
                        .arg(namespace())
                        .arg(snapshot_name(true)),
                ),
        )
        .subcommand(
            Command::new("id")
                .about("Sequential identifiers")
                .subcommand_required(true)
                .subcommand(
                    Command::new("next")
                        .about("Allocate the next identifier")
                        .arg(namespace())
                        .arg(
                            Arg::new("width")
                                .long("width")
                                .default_value("3")
                                .value_parser(value_parser!(usize))
                                .help("Zero-pad to this many digits"),
                        ),
                )
                .subcommand(
                    Command::new("peek")
                        .about("Show the highest identifier issued so far")
                        .arg(namespace()),
                ),
        )
        .subcommand(
            Command::new("score")
                .about("Score a document against the rubric")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("fix")
                .about("Insert boilerplate for missing sections")
                .arg(
                    Arg::new("path")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("no-backup")
                        .long("no-backup")
                        .action(ArgAction::SetTrue)
                        .help("Do not write <file>.bak-<timestamp>"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Report changes without writing"),
                )
                .arg(
                    Arg::new("namespace")
                        .long("namespace")
                        .help("Take a safety snapshot in this namespace first"),
                ),
        )
}

/// Run a parsed command
///
/// # Errors
/// Any library error, wrapped with the failing step.
pub fn run(
    matches: &ArgMatches,
    ctx: &ProjectContext,
    out: &mut dyn Write,
    confirm: &dyn ConfirmRestore,
) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("checkpoint", args)) => checkpoint(args, ctx, out, confirm),
        Some(("id", args)) => id(args, ctx, out),
        Some(("score", args)) => score(args, ctx, out),
        Some(("fix", args)) => fix(args, ctx, out),
        _ => bail!("no command given"),
    }
}

/// Process exit code for an error
///
/// NotFound 2, Integrity 3, Validation 4, Concurrency 5, IO 6, other 1.
#[must_use]
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<specsafe_artifact::Error>())
        .map(specsafe_artifact::Error::kind);
    match kind {
        Some(ErrorKind::NotFound) => 2,
        Some(ErrorKind::Integrity) => 3,
        Some(ErrorKind::Validation) => 4,
        Some(ErrorKind::Concurrency) => 5,
        Some(ErrorKind::Io) => 6,
        None => EXIT_OTHER,
    }
}

fn namespace_arg(args: &ArgMatches, id: &str) -> anyhow::Result<Namespace> {
    let raw = args
        .get_one::<String>(id)
        .context("namespace argument missing")?;
    Ok(Namespace::new(raw.as_str())?)
}

fn snapshot_arg(args: &ArgMatches) -> anyhow::Result<Option<SnapshotName>> {
    args.get_one::<String>("name")
        .map(|raw| raw.parse::<SnapshotName>())
        .transpose()
        .map_err(Into::into)
}

fn checkpoint(
    args: &ArgMatches,
    ctx: &ProjectContext,
    out: &mut dyn Write,
    confirm: &dyn ConfirmRestore,
) -> anyhow::Result<()> {
    let engine = ctx.snapshots();
    match args.subcommand() {
        Some(("create", args)) => {
            let ns = namespace_arg(args, "namespace")?;
            let description = args
                .get_one::<String>("description")
                .map_or("", String::as_str);
            let document = args.get_one::<PathBuf>("document");
            let name = engine
                .create(&ns, description, document.map(PathBuf::as_path))
                .with_context(|| format!("creating snapshot in '{ns}'"))?;
            writeln!(out, "Created {name} in '{ns}'")?;
        }
        Some(("list", args)) => {
            let ns = namespace_arg(args, "namespace")?;
            let records = engine.list(&ns)?;
            if records.is_empty() {
                writeln!(out, "No snapshots in '{ns}'")?;
                return Ok(());
            }
            writeln!(out, "{:<14} {:<20} {:<10} {:>8}  DESCRIPTION", "NAME", "CREATED", "TIER", "PROGRESS")?;
            for record in records {
                writeln!(
                    out,
                    "{:<14} {:<20} {:<10} {:>7.0}%  {}",
                    record.name.to_string(),
                    record.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                    record.tier,
                    record.completion_percent(),
                    record.description
                )?;
            }
        }
        Some(("restore", args)) => {
            let ns = namespace_arg(args, "namespace")?;
            let force = args.get_flag("force");
            let outcome = match snapshot_arg(args)? {
                Some(name) => engine.restore(&ns, name, force, confirm),
                None => engine.restore_latest(&ns, force, confirm),
            }
            .with_context(|| format!("restoring snapshot in '{ns}'"))?;
            match outcome {
                RestoreOutcome::Restored { name, path, hash } => writeln!(
                    out,
                    "Restored {name} to {} (hash {})",
                    path.display(),
                    hash.short()
                )?,
                RestoreOutcome::Cancelled => writeln!(out, "Restore cancelled")?,
            }
        }
        Some(("cleanup", args)) => {
            let ns = namespace_arg(args, "namespace")?;
            let days = args
                .get_one::<u32>("older-than")
                .copied()
                .unwrap_or(ctx.config().snapshots.retention_days);
            let removed = engine.cleanup(&ns, days)?;
            writeln!(out, "Removed {removed} snapshot(s) older than {days} days from '{ns}'")?;
        }
        Some(("delete", args)) => {
            let ns = namespace_arg(args, "namespace")?;
            let name = snapshot_arg(args)?.context("snapshot name missing")?;
            engine.delete(&ns, name)?;
            writeln!(out, "Deleted {name} from '{ns}'")?;
        }
        _ => bail!("unknown checkpoint command"),
    }
    Ok(())
}

fn id(args: &ArgMatches, ctx: &ProjectContext, out: &mut dyn Write) -> anyhow::Result<()> {
    let allocator = ctx.allocator();
    match args.subcommand() {
        Some(("next", args)) => {
            let ns = namespace_arg(args, "namespace")?;
            let width = args.get_one::<usize>("width").copied().unwrap_or(3);
            let id = allocator
                .allocate(&ns)
                .with_context(|| format!("allocating identifier in '{ns}'"))?;
            writeln!(out, "{}", format_id(id, width))?;
        }
        Some(("peek", args)) => {
            let ns = namespace_arg(args, "namespace")?;
            writeln!(out, "{}", allocator.peek(&ns)?)?;
        }
        _ => bail!("unknown id command"),
    }
    Ok(())
}

fn score(args: &ArgMatches, ctx: &ProjectContext, out: &mut dyn Write) -> anyhow::Result<()> {
    let path = args.get_one::<PathBuf>("path").context("path missing")?;
    let content = read_string(path)?;
    let result = ctx.scorer()?.score(&content);

    if args.get_flag("json") {
        serde_json::to_writer_pretty(&mut *out, &result)?;
        writeln!(out)?;
    } else {
        write_score(out, &result)?;
    }
    Ok(())
}

fn write_score(out: &mut dyn Write, result: &CompletenessResult) -> io::Result<()> {
    writeln!(out, "Completeness: {}%", result.overall)?;
    for section in &result.sections {
        let (mark, earned) = match section.status {
            SectionStatus::Complete => ("✓", f64::from(section.weight)),
            SectionStatus::Partial => ("~", f64::from(section.weight) / 2.0),
            SectionStatus::Missing => ("✗", 0.0),
        };
        writeln!(out, "  {mark} {:<30} {earned:>4}/{}", section.name, section.weight)?;
    }
    if let Some(next) = &result.next_section {
        writeln!(out, "Next: {next}")?;
    }
    Ok(())
}

fn fix(args: &ArgMatches, ctx: &ProjectContext, out: &mut dyn Write) -> anyhow::Result<()> {
    let path = args.get_one::<PathBuf>("path").context("path missing")?;
    let namespace = match args.get_one::<String>("namespace") {
        Some(raw) => Some(Namespace::new(raw.as_str())?),
        None => None,
    };
    let report = ctx
        .auto_fixer(namespace)?
        .auto_fix(path, !args.get_flag("no-backup"), args.get_flag("dry-run"))
        .with_context(|| format!("fixing {}", path.display()))?;

    for change in &report.changes {
        writeln!(out, "- {change}")?;
    }
    if let Some(backup) = &report.backup_path {
        writeln!(out, "Backup: {}", backup.display())?;
    }
    if !report.success {
        bail!("auto-fix of {} failed and was rolled back", path.display());
    }
    Ok(())
}

/// Interactive confirmation on stdin/stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptConfirm;

impl ConfirmRestore for PromptConfirm {
    fn confirm(&self, summary: &RestoreSummary) -> bool {
        ask(&mut io::stderr().lock(), &mut io::stdin().lock(), summary)
    }
}

/// Show `summary` and read a yes/no answer; refuses when the summary
/// cannot be shown or no answer can be read
fn ask(prompt: &mut dyn Write, input: &mut dyn BufRead, summary: &RestoreSummary) -> bool {
    if let Err(e) = show_prompt(prompt, summary) {
        tracing::warn!(error = %e, "could not show restore summary");
        return false;
    }

    let mut answer = String::new();
    if input.read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn show_prompt(prompt: &mut dyn Write, summary: &RestoreSummary) -> io::Result<()> {
    write_summary(prompt, summary)?;
    write!(prompt, "Proceed? [y/N] ")?;
    prompt.flush()
}

fn write_summary(out: &mut dyn Write, summary: &RestoreSummary) -> io::Result<()> {
    let or_none = |value: Option<String>| value.unwrap_or_else(|| "-".to_string());
    writeln!(out, "Restore {} ({})", summary.snapshot, summary.description)?;
    writeln!(out, "  captured: {}", summary.created_at.to_rfc3339())?;
    writeln!(out, "  target:   {}", summary.target.display())?;
    writeln!(
        out,
        "  tier:     {} -> {}",
        or_none(summary.tier_before.clone()),
        summary.tier_after
    )?;
    writeln!(
        out,
        "  progress: {} -> {:.0}%",
        or_none(summary.progress_before.map(|p| format!("{p:.0}%"))),
        summary.progress_after
    )?;
    writeln!(
        out,
        "  sections: {} -> {}",
        or_none(summary.sections_before.map(|n| n.to_string())),
        summary.sections_after
    )
}
