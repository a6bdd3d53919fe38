use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use rewrite_apply::action::{compare, Action, ActionKind};
use rewrite_apply::config::{self, Settings};
use rewrite_apply::engine::{remove_action, remove_result, Applied, Engine};
use rewrite_apply::fs::{DiskFs, FileSystem};
use rewrite_apply::result::{parse_test_results, prepare_results, TestResult};
use rewrite_apply::splice::materialize;
use rewrite_apply::telemetry;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "rewrite-apply")]
#[command(about = "Selectively apply edits proposed by a rewrite engine", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (defaults to ./rewrite-apply.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Workspace root the result paths are relative to
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log engine activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List pending results and their actions in source order
    List {
        /// Results JSON file, or a directory of them
        #[arg(short, long)]
        results: PathBuf,
    },

    /// Show a unified diff of what applying would change
    Preview {
        /// Results JSON file, or a directory of them
        #[arg(short, long)]
        results: PathBuf,

        /// Only preview this result
        #[arg(long)]
        result: Option<usize>,
    },

    /// Apply everything, one result, or one action of a result
    Apply {
        /// Results JSON file, or a directory of them
        #[arg(short, long)]
        results: PathBuf,

        /// Apply only this result
        #[arg(long)]
        result: Option<usize>,

        /// Apply only this action of --result; pending actions are rebased
        #[arg(long, requires = "result")]
        action: Option<usize>,

        /// Where to save the results still pending (defaults to --results)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,
    },

    /// Drop a result or one of its actions without applying it
    Skip {
        /// Results JSON file, or a directory of them
        #[arg(short, long)]
        results: PathBuf,

        #[arg(long)]
        result: usize,

        /// Drop only this action of --result
        #[arg(long)]
        action: Option<usize>,

        /// Where to save the results still pending (defaults to --results)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let cwd = env::current_dir().context("cannot determine current directory")?;
    let settings = config::discover(cli.config.as_deref(), &cwd)?;
    let root = resolve_root(cli.root, &settings, &cwd)?;

    match cli.command {
        Commands::List { results } => cmd_list(&root, &results),
        Commands::Preview { results, result } => cmd_preview(&root, &settings, &results, result),
        Commands::Apply {
            results,
            result,
            action,
            output,
            dry_run,
        } => cmd_apply(&root, &settings, &results, result, action, output, dry_run),
        Commands::Skip {
            results,
            result,
            action,
            output,
        } => cmd_skip(&root, &results, result, action, output),
    }
}

/// Resolve the workspace root
///
/// Priority order:
/// 1. Explicit --root flag
/// 2. REWRITE_APPLY_ROOT environment variable
/// 3. `root` in the settings file
/// 4. Current directory
fn resolve_root(cli_root: Option<PathBuf>, settings: &Settings, cwd: &Path) -> Result<PathBuf> {
    let root = cli_root
        .or_else(|| env::var_os("REWRITE_APPLY_ROOT").map(PathBuf::from))
        .or_else(|| settings.root.clone())
        .unwrap_or_else(|| cwd.to_path_buf());
    let root = cwd.join(root);
    root.canonicalize()
        .with_context(|| format!("workspace root {} does not exist", root.display()))
}

/// Read every results file and prepare them for application.
///
/// A directory contributes each `*.json` file directly inside it, in name
/// order.
fn load_results(root: &Path, results_path: &Path) -> Result<Vec<TestResult>> {
    let files = if results_path.is_dir() {
        let mut files = Vec::new();
        for entry in WalkDir::new(results_path).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("json")
            {
                files.push(entry.path().to_path_buf());
            }
        }
        files.sort();
        files
    } else {
        vec![results_path.to_path_buf()]
    };

    let mut parsed = Vec::new();
    for file in &files {
        let output = fs::read_to_string(file)
            .with_context(|| format!("failed to read results from {}", file.display()))?;
        let results = parse_test_results(&output)
            .with_context(|| format!("failed to parse results in {}", file.display()))?;
        parsed.extend(results);
    }

    Ok(prepare_results(parsed, root, &DiskFs)?)
}

fn save_results(results: &[TestResult], path: &Path) -> Result<()> {
    if path.is_dir() {
        anyhow::bail!(
            "{} is a directory; pass --output to choose where pending results are saved",
            path.display()
        );
    }
    let json = serde_json::to_string_pretty(results)?;
    DiskFs
        .write(path, &json)
        .with_context(|| format!("failed to save results to {}", path.display()))?;
    println!(
        "{}",
        format!("{} result(s) pending in {}", results.len(), path.display()).dimmed()
    );
    Ok(())
}

fn describe(action: &Action) -> String {
    match &action.kind {
        ActionKind::Replace { new_text } if action.start == action.end => {
            format!("insert  {} {:?}", action.start, new_text)
        }
        ActionKind::Replace { new_text } => {
            format!("replace {}..{} {:?}", action.start, action.end, new_text)
        }
        ActionKind::Group { children } => format!(
            "group   {}..{} ({} edits)",
            action.start,
            action.end,
            children.len()
        ),
        ActionKind::AddFile { .. } => "add file".to_string(),
        ActionKind::RemoveFile => "remove file".to_string(),
        ActionKind::RenameFile => "rename file".to_string(),
    }
}

fn cmd_list(root: &Path, results_path: &Path) -> Result<()> {
    let results = load_results(root, results_path)?;
    if results.is_empty() {
        println!("{}", "No pending results".yellow());
        return Ok(());
    }

    for (idx, result) in results.iter().enumerate() {
        let mut header = format!("[{}] {}", idx, result.file_path.display());
        if let Some(new_path) = &result.new_file_path {
            header.push_str(&format!(" -> {}", new_path.display()));
        }
        if result.conflicted {
            println!("{} {}", header.bold(), "(conflicted)".red());
        } else {
            println!("{}", header.bold());
        }

        let mut ordered: Vec<(usize, &Action)> = result.actions.iter().enumerate().collect();
        ordered.sort_by(|(_, a), (_, b)| compare(a, b));
        for (action_idx, action) in ordered {
            println!("    [{}] {}", action_idx, describe(action));
        }
    }
    Ok(())
}

/// Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!("\n{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (rewritten)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn preview_result(result: &TestResult, settings: &Settings) -> Result<()> {
    let content = materialize(result, settings.offset_encoding)
        .with_context(|| format!("cannot preview {}", result.file_path.display()))?;
    let original = result.file_source.as_deref().unwrap_or("");
    let shown = result.new_file_path.as_deref().unwrap_or(&result.file_path);

    if let Some(new_path) = &result.new_file_path {
        println!(
            "\n{}",
            format!(
                "rename {} -> {}",
                result.file_path.display(),
                new_path.display()
            )
            .cyan()
        );
    }
    match content {
        Some(content) if content != original => display_diff(shown, original, &content),
        Some(_) => {}
        None => println!(
            "\n{}",
            format!("remove {}", result.file_path.display()).red()
        ),
    }
    Ok(())
}

fn cmd_preview(
    root: &Path,
    settings: &Settings,
    results_path: &Path,
    only: Option<usize>,
) -> Result<()> {
    let results = load_results(root, results_path)?;
    match only {
        Some(idx) => {
            let result = results
                .get(idx)
                .with_context(|| format!("no result #{idx} ({} pending)", results.len()))?;
            preview_result(result, settings)
        }
        None => {
            for result in &results {
                preview_result(result, settings)?;
            }
            Ok(())
        }
    }
}

fn report(applied: &Applied) {
    println!("{} {}", "✓".green(), applied);
}

fn cmd_apply(
    root: &Path,
    settings: &Settings,
    results_path: &Path,
    result: Option<usize>,
    action: Option<usize>,
    output: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let mut results = load_results(root, results_path)?;
    let output = output.unwrap_or_else(|| results_path.to_path_buf());

    if dry_run {
        println!("{}", "[DRY RUN - showing what would be applied]".cyan());
        return match result {
            Some(idx) => cmd_preview(root, settings, results_path, Some(idx)),
            None => {
                for result in &results {
                    preview_result(result, settings)?;
                }
                Ok(())
            }
        };
    }

    let mut engine = Engine::on_disk(root, settings)?;
    let outcome = match (result, action) {
        (Some(result), Some(action)) => engine
            .apply_action(&mut results, result, action)
            .map(|applied| vec![applied]),
        (Some(result), None) => engine
            .apply_result(&mut results, result)
            .map(|applied| vec![applied]),
        (None, _) => engine.apply_all(&mut results),
    };

    // Applied results are gone from the list even when a later one failed
    save_results(&results, &output)?;
    for applied in outcome? {
        report(&applied);
    }
    Ok(())
}

fn cmd_skip(
    root: &Path,
    results_path: &Path,
    result: usize,
    action: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut results = load_results(root, results_path)?;
    let output = output.unwrap_or_else(|| results_path.to_path_buf());

    match action {
        Some(action) => {
            let skipped = remove_action(&mut results, result, action)?;
            println!("{} {}", "Skipped".yellow(), describe(&skipped));
        }
        None => {
            let skipped = remove_result(&mut results, result)?;
            println!("{} {}", "Skipped".yellow(), skipped.file_path.display());
        }
    }

    save_results(&results, &output)
}
