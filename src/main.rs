use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use colored::Colorize;
use linkage_patcher::patcher::PlannedWrite;
use linkage_patcher::{
    apply_requests, load_settings, ApplyOptions, ApplyReport, BinaryPatcher, DryRun,
    FailurePolicy, Patchelf, RPathList, RawRequests, RequestSet, StepOutcome,
};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::Level;

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;

const USAGE: &str = "Usage: linkage-patcher [-change old new] ... [-rpath old new] ... \
[-add_rpath new] ... [-delete_rpath old] ... [-id name] input";

/// Single-dash spellings accepted for compatibility, with the number of values each takes.
const LEGACY_FLAGS: &[(&str, &str, usize)] = &[
    ("-change", "--change", 2),
    ("-id", "--id", 1),
    ("-rpath", "--rpath", 2),
    ("-add_rpath", "--add_rpath", 1),
    ("-delete_rpath", "--delete_rpath", 1),
];

#[derive(Parser, Debug)]
#[command(name = "linkage-patcher")]
#[command(about = "Edit dependency names, soname and rpath of a shared library or executable", long_about = None)]
#[command(version)]
struct Cli {
    /// Change dependency reference OLD to NEW
    #[arg(long = "change", num_args = 2, value_names = ["OLD", "NEW"], action = ArgAction::Append, allow_hyphen_values = true)]
    change: Vec<String>,

    /// Set the identity name (soname) of a shared library
    #[arg(long = "id", value_name = "NAME", action = ArgAction::Append, allow_hyphen_values = true)]
    id: Vec<String>,

    /// Rename rpath entry OLD to NEW
    #[arg(long = "rpath", num_args = 2, value_names = ["OLD", "NEW"], action = ArgAction::Append, allow_hyphen_values = true)]
    rpath: Vec<String>,

    /// Append NEW to the rpath
    #[arg(long = "add_rpath", value_name = "NEW", action = ArgAction::Append, allow_hyphen_values = true)]
    add_rpath: Vec<String>,

    /// Remove rpath entry OLD
    #[arg(long = "delete_rpath", value_name = "OLD", action = ArgAction::Append, allow_hyphen_values = true)]
    delete_rpath: Vec<String>,

    /// Binary to edit
    #[arg(value_name = "INPUT")]
    inputs: Vec<PathBuf>,

    /// Settings file (defaults to $LINKAGE_PATCHER_CONFIG or ~/.config/linkage-patcher.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Program implementing the patchelf command line
    #[arg(long, value_name = "PROGRAM")]
    patchelf: Option<String>,

    /// Keep going after a failed -change or -id edit
    #[arg(long)]
    keep_going: bool,

    /// Dry run - show what would be changed without modifying the binary
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show a per-entry diff of the rpath
    #[arg(long)]
    diff: bool,

    /// Log every patcher invocation
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn requests(&self) -> RawRequests {
        let mut raw = RawRequests::new();
        raw.inputs = self.inputs.clone();
        raw.ids = self.id.clone();
        for pair in self.change.chunks_exact(2) {
            raw = raw.change(&pair[0], &pair[1]);
        }
        for pair in self.rpath.chunks_exact(2) {
            raw = raw.rpath(&pair[0], &pair[1]);
        }
        for new in &self.add_rpath {
            raw = raw.add_rpath(new);
        }
        for old in &self.delete_rpath {
            raw = raw.delete_rpath(old);
        }
        raw
    }
}

/// Rewrite legacy single-dash flags to their long forms. Flag values are left alone.
fn legacy_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = Vec::new();
    let mut pending_values = 0;

    for arg in args {
        if pending_values > 0 {
            pending_values -= 1;
            out.push(arg);
            continue;
        }

        let legacy = arg
            .to_str()
            .and_then(|s| LEGACY_FLAGS.iter().find(|(short, _, _)| *short == s));
        match legacy {
            Some((_, long, values)) => {
                out.push(OsString::from(long));
                pending_values = *values;
            }
            None => out.push(arg),
        }
    }

    out
}

fn main() {
    let cli = Cli::parse_from(legacy_args(env::args_os()));

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("{}", format!("Warning: logging disabled: {e}").yellow());
    }

    match cmd_edit(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn cmd_edit(cli: Cli) -> Result<i32> {
    // 1. Validate before anything else can touch the binary
    let mut requests = match cli.requests().validate() {
        Ok(requests) => requests,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            eprintln!("{USAGE}");
            return Ok(EXIT_USAGE);
        }
    };

    // 2. Settings, with flags taking precedence
    let settings = load_settings(cli.config.as_deref()).context("loading settings")?;
    let program = cli.patchelf.clone().unwrap_or(settings.patcher.program);
    let options = ApplyOptions {
        on_direct_failure: if cli.keep_going {
            FailurePolicy::Continue
        } else {
            settings.policy.on_direct_failure
        },
    };

    println!("Input: {}", requests.input().display());

    // 3. Apply
    let mut patcher = Patchelf::new(program);
    if cli.dry_run {
        println!("{}", "[DRY RUN - nothing will be written]".cyan());
        let mut dry = DryRun::new(patcher);
        let code = execute(&mut requests, &mut dry, &options, cli.diff);
        for write in dry.planned() {
            print_planned(write);
        }
        Ok(code)
    } else {
        Ok(execute(&mut requests, &mut patcher, &options, cli.diff))
    }
}

fn execute<P: BinaryPatcher>(
    requests: &mut RequestSet,
    patcher: &mut P,
    options: &ApplyOptions,
    show_diff: bool,
) -> i32 {
    match apply_requests(requests, patcher, options) {
        Ok(report) => {
            print_report(&report, show_diff);
            if report.has_failures() {
                EXIT_FAILURE
            } else {
                EXIT_SUCCESS
            }
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red(), e);
            EXIT_FAILURE
        }
    }
}

fn print_report(report: &ApplyReport, show_diff: bool) {
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Applied => println!("{} {}", "✓".green(), step.request),
            StepOutcome::Failed { reason } => {
                eprintln!("{} {}: Failed - {}", "✗".red(), step.request, reason)
            }
        }
    }

    let Some(rpath) = &report.rpath else {
        return;
    };

    for rename in &rpath.unmatched_renames {
        print_unmatched(&rename.old, rpath.hint_for(&rename.old));
    }
    for deletion in &rpath.unmatched_deletions {
        print_unmatched(&deletion.old, rpath.hint_for(&deletion.old));
    }

    if rpath.written {
        println!(
            "{} rpath: {} -> {}",
            "✓".green(),
            display_rpath(&rpath.before),
            display_rpath(&rpath.after)
        );
        if show_diff {
            display_diff(&rpath.before, &rpath.after);
        }
    } else {
        println!(
            "{} rpath unchanged: {}",
            "⊙".yellow(),
            display_rpath(&rpath.before)
        );
    }
}

fn print_unmatched(name: &str, hint: Option<String>) {
    match hint {
        Some(hint) => eprintln!(
            "{} no rpath entry \"{}\" found (did you mean \"{}\"?)",
            "⊙".yellow(),
            name,
            hint
        ),
        None => eprintln!("{} no rpath entry \"{}\" found", "⊙".yellow(), name),
    }
}

fn print_planned(write: &PlannedWrite) {
    let line = match write {
        PlannedWrite::ReplaceReference { old, new, .. } => {
            format!("would replace dependency {old} with {new}")
        }
        PlannedWrite::SetIdentityName { name, .. } => format!("would set identity name to {name}"),
        PlannedWrite::SetRPath { value, .. } => {
            format!("would set rpath to {}", display_rpath(value))
        }
    };
    println!("  {}", line.dimmed());
}

fn display_rpath(value: &str) -> String {
    if value.is_empty() {
        "(empty)".to_string()
    } else {
        format!("\"{value}\"")
    }
}

/// Helper: Show a diff of rpath entries, one entry per line
fn display_diff(before: &str, after: &str) {
    let to_lines = |value: &str| -> String {
        RPathList::parse(value)
            .entries()
            .iter()
            .map(|entry| format!("{entry}\n"))
            .collect()
    };
    let (before, after) = (to_lines(before), to_lines(after));

    println!("{}", "--- rpath (original)".dimmed());
    println!("{}", "+++ rpath (patched)".dimmed());

    let diff = TextDiff::from_lines(&before, &after);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}
