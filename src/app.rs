//! Command dispatch for the `dupmerge` binary.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Arc;

use anyhow::{bail, Context};

use crate::actions::{FileRemover, MergeEngine, MergeResult, MergeStrategy, PermanentRemover, TrashRemover};
use crate::cli::{Cli, Commands, MergeArgs, ScanArgs, ScanOptions};
use crate::config::Config;
use crate::duplicates::{DuplicateFinder, DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::logging;
use crate::output::{text, JsonMergeOutput, JsonOutput};
use crate::progress::Progress;
use crate::signal::{self, CancelToken};

/// Run the CLI command and return the process exit code.
///
/// # Errors
///
/// Returns an error for invalid configuration, unusable scan roots, or
/// failures writing the report. Per-file problems are not errors; they are
/// reported and reflected in the exit code.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let token = signal::install_handler().context("Failed to set up Ctrl+C handling")?;

    match &cli.command {
        Commands::Scan(args) => {
            args.options.apply_to(&mut config);
            config.validate().context("Invalid settings")?;
            run_scan(args, &config, &token, cli.quiet)
        }
        Commands::Merge(args) => {
            args.apply_to(&mut config);
            config.validate().context("Invalid settings")?;
            run_merge(args, &config, &token, cli.quiet)
        }
    }
}

fn find_duplicates(
    options: &ScanOptions,
    config: &Config,
    token: &CancelToken,
    quiet: bool,
) -> anyhow::Result<(Vec<DuplicateGroup>, ScanSummary)> {
    let mut finder_config = config.finder_config().with_shutdown_flag(token.flag());
    if !quiet && !options.json && io::stderr().is_terminal() {
        finder_config = finder_config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let (groups, summary) = DuplicateFinder::new(finder_config)
        .scan_paths(&options.paths)
        .context("Scan failed")?;

    for error in &summary.traversal_errors {
        log::warn!("Skipped during walk: {}", error);
    }
    for error in &summary.fingerprint_errors {
        log::warn!("Skipped during fingerprinting: {}", error);
    }
    Ok((groups, summary))
}

fn scan_exit_code(groups: &[DuplicateGroup], summary: &ScanSummary) -> ExitCode {
    if summary.interrupted {
        ExitCode::Interrupted
    } else if summary.has_errors() {
        ExitCode::PartialSuccess
    } else if groups.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}

fn run_scan(
    args: &ScanArgs,
    config: &Config,
    token: &CancelToken,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let (groups, summary) = find_duplicates(&args.options, config, token, quiet)?;
    let exit_code = scan_exit_code(&groups, &summary);

    let mut stdout = io::stdout().lock();
    if args.options.json {
        JsonOutput::new(&groups, &summary, exit_code)
            .write_to(&mut stdout)
            .context("Failed to write JSON report")?;
    } else if !quiet {
        text::write_scan(&mut stdout, &groups, &summary).context("Failed to write report")?;
    }
    Ok(exit_code)
}

fn run_merge(
    args: &MergeArgs,
    config: &Config,
    token: &CancelToken,
    quiet: bool,
) -> anyhow::Result<ExitCode> {
    let (groups, summary) = find_duplicates(&args.options, config, token, quiet)?;
    let strategy = MergeStrategy::from(args.strategy);
    let json = args.options.json;
    let mut stdout = io::stdout().lock();

    if summary.interrupted || groups.is_empty() {
        let exit_code = scan_exit_code(&groups, &summary);
        if summary.interrupted {
            log::warn!("Scan interrupted, nothing was removed");
        }
        if json {
            JsonMergeOutput::planned(strategy, Vec::new(), &summary, exit_code)
                .write_to(&mut stdout)
                .context("Failed to write JSON report")?;
        } else if !quiet {
            text::write_summary(&mut stdout, &groups, &summary).context("Failed to write report")?;
        }
        return Ok(exit_code);
    }

    let remover: Box<dyn FileRemover> = if config.merge.permanent {
        Box::new(PermanentRemover)
    } else {
        Box::new(TrashRemover)
    };
    let engine = MergeEngine::new(remover)
        .with_guard(config.path_guard())
        .with_config(config.merge_config())
        .with_hasher(config.hasher());

    if args.dry_run {
        let plans = engine.plan(&groups, strategy);
        let exit_code = scan_exit_code(&groups, &summary);
        if json {
            JsonMergeOutput::planned(strategy, plans, &summary, exit_code)
                .write_to(&mut stdout)
                .context("Failed to write JSON report")?;
        } else if !quiet {
            text::write_plans(&mut stdout, &plans).context("Failed to write report")?;
        }
        return Ok(exit_code);
    }

    if !args.yes && !confirm(&groups, &summary, engine.is_permanent())? {
        log::info!("Merge cancelled by user");
        return Ok(ExitCode::Success);
    }

    let result = engine.merge(&groups, strategy);
    let exit_code = merge_exit_code(&result, &summary);

    if json {
        JsonMergeOutput::completed(strategy, result, &summary, exit_code)
            .write_to(&mut stdout)
            .context("Failed to write JSON report")?;
    } else if !quiet {
        text::write_merge_result(&mut stdout, &result).context("Failed to write report")?;
    }
    Ok(exit_code)
}

fn merge_exit_code(result: &MergeResult, summary: &ScanSummary) -> ExitCode {
    if !result.is_complete() || summary.has_errors() {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}

/// Ask on stderr before removing anything.
///
/// Without a terminal, trash removal proceeds and permanent removal is refused.
fn confirm(groups: &[DuplicateGroup], summary: &ScanSummary, permanent: bool) -> anyhow::Result<bool> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        if permanent {
            bail!("--permanent requires --yes when not running interactively");
        }
        return Ok(true);
    }

    let targets: usize = groups.iter().map(DuplicateGroup::duplicate_count).sum();
    let action = if permanent {
        "Permanently delete"
    } else {
        "Move to trash"
    };
    let mut stderr = io::stderr();
    write!(
        stderr,
        "{} {} file(s) from {} group(s), freeing up to {}? [y/N] ",
        action,
        targets,
        groups.len(),
        summary.reclaimable_display()
    )?;
    stderr.flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
