use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use text_patcher::config::{company_id_rules, discover_rule_files, load_rule_set};
use text_patcher::patcher::{plan_file, PatchPlan, PatchResult};
use text_patcher::rule::RuleSet;
use text_patcher::safety::WorkspaceGuard;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "text-patcher")]
#[command(about = "Apply declarative regex rewrite rules to source files", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Defaults to `apply` with the built-in companyId rules
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args, Default)]
struct TargetArgs {
    /// Path to workspace root (defaults to the current directory)
    #[arg(short, long)]
    workspace: Option<PathBuf>,

    /// File to patch (overrides the rule set's target)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Rule file or directory of rule files (defaults to the built-in companyId rules)
    #[arg(short, long)]
    rules: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply rules to the target file
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Report whether the target still needs patching, without writing
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// List rules in the order they run
    List {
        /// Rule file or directory of rule files (defaults to the built-in companyId rules)
        #[arg(short, long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Apply {
        target: TargetArgs::default(),
        dry_run: false,
        diff: false,
    });

    match command {
        Commands::Apply {
            target,
            dry_run,
            diff,
        } => cmd_apply(target, dry_run, diff),

        Commands::Check { target } => cmd_check(target),

        Commands::List { rules } => cmd_list(rules),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Helper: Load the rule sets to run, each paired with a label for output.
///
/// A directory yields every `*.toml` directly inside it, in name order.
fn load_rule_sets(rules: Option<&Path>) -> Result<Vec<(String, RuleSet)>> {
    let Some(path) = rules else {
        return Ok(vec![("built-in rules".to_string(), company_id_rules()?)]);
    };

    let files = if path.is_dir() {
        let files = discover_rule_files(path)?;
        if files.is_empty() {
            anyhow::bail!("No .toml rule files found in {}", path.display());
        }
        files
    } else {
        vec![path.to_path_buf()]
    };

    files
        .into_iter()
        .map(|file| -> Result<(String, RuleSet)> {
            let set = load_rule_set(&file)?;
            Ok((file.display().to_string(), set))
        })
        .collect()
}

/// Helper: Resolve the workspace guard from the flag or the current directory.
fn resolve_workspace(workspace: Option<PathBuf>) -> Result<WorkspaceGuard> {
    let root = match workspace {
        Some(path) => path,
        None => env::current_dir().context("Could not determine current directory")?,
    };
    debug!(workspace = %root.display(), "resolved workspace");
    Ok(WorkspaceGuard::new(root)?)
}

/// Helper: Pick the file a rule set applies to and check it is safe to touch.
fn resolve_target(
    guard: &WorkspaceGuard,
    file: Option<&Path>,
    set: &RuleSet,
) -> Result<PathBuf> {
    let target = match (file, set.target.as_deref()) {
        (Some(file), _) => file.to_path_buf(),
        (None, Some(target)) => target.to_path_buf(),
        (None, None) => anyhow::bail!(
            "Rule set '{}' has no target; pass --file to choose one",
            set.name
        ),
    };

    guard
        .validate_path(&target)
        .with_context(|| format!("Cannot patch {}", target.display()))
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for group in diff.grouped_ops(3) {
        println!("{}", "@@".cyan());
        for op in &group {
            for change in diff.iter_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => format!("-{}", change).red(),
                    ChangeTag::Insert => format!("+{}", change).green(),
                    ChangeTag::Equal => format!(" {}", change).normal(),
                };
                print!("{}", sign);
                if change.missing_newline() {
                    println!();
                }
            }
        }
    }
}

/// Helper: One line per rule with its match count.
fn report_rules(plan: &PatchPlan) {
    for application in plan.applications() {
        if application.matches > 0 {
            println!(
                "  {} {}: {} match(es)",
                "✓".green(),
                application.rule_id,
                application.matches
            );
        } else {
            println!("  {} {}: no match", "⊙".yellow(), application.rule_id);
        }
    }
}

fn cmd_apply(target: TargetArgs, dry_run: bool, show_diff: bool) -> Result<()> {
    let guard = resolve_workspace(target.workspace)?;
    let rule_sets = load_rule_sets(target.rules.as_deref())?;

    println!("Workspace: {}", guard.workspace_root().display());
    println!();

    let mut total_patched = 0;
    let mut total_unchanged = 0;

    for (label, set) in rule_sets {
        println!("Loading rules from {}...", label);

        let file = resolve_target(&guard, target.file.as_deref(), &set)?;
        let plan = plan_file(&file, &set.rules)?;
        report_rules(&plan);

        if show_diff && plan.has_changes() {
            display_diff(&file, plan.original(), plan.patched());
        }

        if dry_run {
            if plan.has_changes() {
                println!("{} Would patch {}", "✓".green(), file.display());
                total_patched += 1;
            } else {
                println!("{} Already patched {}", "⊙".yellow(), file.display());
                total_unchanged += 1;
            }
        } else {
            match plan.commit()? {
                PatchResult::Applied { file, .. } => {
                    println!("{} Patched {}", "✓".green(), file.display());
                    total_patched += 1;
                }
                PatchResult::AlreadyApplied { file } => {
                    println!("{} Already patched {}", "⊙".yellow(), file.display());
                    total_unchanged += 1;
                }
            }
        }

        println!();
    }

    println!("{}", "Summary:".bold());
    if dry_run {
        println!("  {}", "[DRY RUN - no files were written]".cyan());
    }
    println!("  {} patched", format!("{}", total_patched).green());
    println!("  {} unchanged", format!("{}", total_unchanged).yellow());

    Ok(())
}

fn cmd_check(target: TargetArgs) -> Result<()> {
    let guard = resolve_workspace(target.workspace)?;
    let rule_sets = load_rule_sets(target.rules.as_deref())?;

    println!("{}", "Checking rules...".bold());
    println!("Workspace: {}", guard.workspace_root().display());
    println!();

    let mut pending = 0;
    let mut up_to_date = 0;

    for (label, set) in rule_sets {
        let file = resolve_target(&guard, target.file.as_deref(), &set)?;
        let plan = plan_file(&file, &set.rules)?;

        if plan.has_changes() {
            eprintln!("{} {}: PENDING", "✗".red(), label);
            eprintln!(
                "  {} replacement(s) would change {}",
                plan.total_matches(),
                file.display()
            );
            report_rules(&plan);
            pending += 1;
        } else {
            println!("{} {}: up to date ({})", "✓".green(), label, file.display());
            up_to_date += 1;
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} up to date", format!("{}", up_to_date).green());
    println!("  {} pending", format!("{}", pending).red());

    if pending > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list(rules: Option<PathBuf>) -> Result<()> {
    for (label, set) in load_rule_sets(rules.as_deref())? {
        let name = if set.name.is_empty() {
            label.as_str()
        } else {
            set.name.as_str()
        };
        println!("{} ({} rules)", name.bold(), set.len());
        if let Some(description) = &set.description {
            println!("  {}", description.dimmed());
        }
        if let Some(target) = &set.target {
            println!("  target: {}", target.display());
        }

        for (idx, rule) in set.rules.iter().enumerate() {
            println!("  {}. {}", idx + 1, rule.id().cyan());
            if let Some(description) = rule.description() {
                println!("     {}", description);
            }
            println!("     pattern:     {:?}", rule.pattern());
            println!("     replacement: {:?}", rule.replacement());
        }
        println!();
    }

    Ok(())
}
