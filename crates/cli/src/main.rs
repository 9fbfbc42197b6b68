mod cli;

use std::{
    fmt::Display,
    fs::{self, OpenOptions},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{prelude::*, EnvFilter};

use gamepages_core::{
    batch::BatchReport,
    config::{self, AppConfig},
    feed::{FeedClient, FetchOutcome, Snapshot},
    render::{Ledger, PageGenerator, Template, DEFAULT_TEMPLATE},
    style::{MigrationRunner, StyleRevision},
    validate::{validate_pages, ValidationSummary, Validator},
    MigrationMode, TextFileAccessor,
};

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    if let Err(err) = run(cli) {
        tracing::error!("{err:#}");
        return Err(err);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    config::ensure_default_config()?;
    let mut config = AppConfig::load_with(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        config.paths.root = root;
    }
    let accessor = TextFileAccessor::new(config.encodings.clone());

    match cli.command {
        Commands::Fetch => {
            fetch(&config)?;
        }
        Commands::Generate { fetch: refresh } => {
            if refresh {
                fetch(&config)?;
            }
            generate(&config, &accessor)?;
        }
        Commands::InitTemplate { force } => init_template(&config, force)?,
        Commands::Migrate {
            mode,
            revision,
            dry_run,
        } => {
            let mode = MigrationMode::from(mode);
            let revision = match revision {
                Some(path) => StyleRevision::load(path, mode, &accessor)?,
                None => StyleRevision::builtin(mode)?,
            };
            let report = MigrationRunner::new(accessor, revision, config.paths.excluded.clone())
                .dry_run(dry_run)
                .run(config.paths.games_dir())?;

            let changed = report.succeeded.iter().filter(|page| page.changed).count();
            let verb = if dry_run { "would update" } else { "updated" };
            println!(
                "{verb} {changed} of {} pages ({} already current)",
                report.processed(),
                report.succeeded.len() - changed
            );
            for page in report.succeeded.iter().filter(|page| page.changed) {
                println!("  ~ {}", page.file);
            }
            for page in report.succeeded.iter().filter(|page| !page.missing_rules.is_empty()) {
                println!("  ? {} lacks {}", page.file, page.missing_rules.join(", "));
            }
            print_summary(&report);
        }
        Commands::Validate => {
            let validator = Validator::new(config.site.iframe_class.clone());
            let report = validate_pages(
                config.paths.games_dir(),
                &config.paths.excluded,
                &accessor,
                &validator,
            )?;

            for file in &report.succeeded {
                if file.report.is_clean() {
                    continue;
                }
                println!("{}", file.file);
                for error in &file.report.errors {
                    println!("  error: {error}");
                }
                for warning in &file.report.warnings {
                    println!("  warning: {warning}");
                }
            }

            let summary = ValidationSummary::from_report(&report);
            println!(
                "checked {} files: {} with errors, {} with warnings, {} clean",
                summary.checked, summary.with_errors, summary.with_warnings, summary.clean
            );
            print_summary(&report);
        }
    }

    Ok(())
}

fn fetch(config: &AppConfig) -> Result<FetchOutcome> {
    let snapshot = config.paths.snapshot();
    let outcome = FeedClient::new(config.feed.clone())?.fetch_into(&snapshot)?;

    println!(
        "fetched {} records into {}",
        outcome.records.len(),
        snapshot.display()
    );
    for (field, present) in &outcome.key_fields {
        println!("  {} {field}", if *present { "+" } else { "-" });
    }
    print_issues("dropped", &outcome.dropped);
    Ok(outcome)
}

fn generate(config: &AppConfig, accessor: &TextFileAccessor) -> Result<()> {
    let snapshot = Snapshot::load(config.paths.snapshot())?;
    let template = Template::load(config.paths.template(), accessor)?;

    let generator = PageGenerator::new(
        accessor.clone(),
        config.site.clone(),
        config.paths.games_dir(),
    );
    let report = generator.generate(&snapshot.records, &template);

    let ledger_path = config.paths.ledger();
    Ledger::from_report(&report)
        .persist(&ledger_path)
        .with_context(|| format!("failed to write ledger {}", ledger_path.display()))?;

    println!(
        "generated {} of {} pages; ledger at {}",
        report.succeeded.len(),
        snapshot.records.len(),
        ledger_path.display()
    );
    print_summary(&report);
    Ok(())
}

fn init_template(config: &AppConfig, force: bool) -> Result<()> {
    let path = config.paths.template();
    if path.exists() && !force {
        tracing::info!("keeping existing template {}", path.display());
        println!(
            "template already exists at {} (use --force to overwrite)",
            path.display()
        );
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_TEMPLATE)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("template written to {}", path.display());
    Ok(())
}

fn print_summary<T>(report: &BatchReport<T>) {
    println!("{}", report.summary());
    print_issues("failed", &report.failures);
    print_issues("warning", &report.warnings);
}

fn print_issues(label: &str, issues: &[impl Display]) {
    for issue in issues {
        println!("  {label}: {issue}");
    }
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("gamepages.log"))
        .context("failed to open log file")?;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stdout);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(())
}
