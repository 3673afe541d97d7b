//! Binary entry point (§2 "CLI"): wires configuration, the scheduler, the
//! comparator, and the transformer into subcommands. Everything below this
//! module is an external collaborator per §1; this file's only job is
//! flag parsing, dispatch, and exit-code mapping.

mod commands;
mod error;
mod output;

use clap::Parser;
use commands::{CompareCommand, Commands, MigrateArgs, TransformCommand};
use config::{ConfigValidator, EnvOverrides, RawConfig};
use error::{CliError, Result};
use model::ExitCode;
use std::path::PathBuf;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "pgcopydb", version, about = "Concurrent PostgreSQL migration core")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let exit_code = match dispatch(cli.command).await {
        Ok(()) => ExitCode::Quit,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    };
    std::process::exit(exit_code.as_i32());
}

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Migrate(args) => run_migrate(args).await,
        Commands::Compare { command } => match command {
            CompareCommand::Schema { source_conninfo, target_conninfo, run_dir } => {
                run_compare_schema(source_conninfo, target_conninfo, run_dir).await
            }
            CompareCommand::Data { source_conninfo, target_conninfo, run_dir, table_jobs } => {
                run_compare_data(source_conninfo, target_conninfo, run_dir, table_jobs).await
            }
        },
        Commands::Transform { command } => match command {
            TransformCommand::Stream { output_dir, timeline, wal_seg_size } => run_transform_stream(output_dir, timeline, wal_seg_size).await,
            TransformCommand::Segment { input_dir, output_dir, segment_name, is_final_segment } => {
                run_transform_segment(input_dir, output_dir, segment_name, is_final_segment).await
            }
        },
        Commands::Progress { run_dir } => run_progress(run_dir).await,
    }
}

/// Merges the config file (if given), `PGCOPYDB_*` environment overrides,
/// and explicit CLI flags, in increasing order of precedence, then
/// validates the result (§6).
fn resolve_config(args: &MigrateArgs) -> Result<config::ValidatedConfig> {
    let raw = match &args.config {
        Some(path) => config::file::load_file(path)?,
        None => RawConfig::default(),
    };
    let mut raw = EnvOverrides::from_process_env().apply(raw);

    if let Some(v) = &args.source_conninfo {
        raw.source_conninfo = Some(v.clone());
    }
    if let Some(v) = &args.target_conninfo {
        raw.target_conninfo = Some(v.clone());
    }
    if let Some(v) = &args.run_dir {
        raw.run_dir = Some(v.display().to_string());
    }
    if let Some(v) = args.table_jobs {
        raw.table_jobs = Some(v);
    }
    if let Some(v) = args.index_jobs {
        raw.index_jobs = Some(v);
    }
    if args.resume {
        raw.resume = Some(true);
    }
    if args.restart {
        raw.restart = Some(true);
    }
    if args.fail_fast {
        raw.fail_fast = Some(true);
    }

    Ok(ConfigValidator::new(raw).validate()?)
}

async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let config = resolve_config(&args)?;

    if config.options.restart && config.run_dir.exists() {
        info!(run_dir = %config.run_dir.display(), "restart requested, wiping run directory");
        tokio::fs::remove_dir_all(&config.run_dir).await.map_err(|source| CliError::WriteReport {
            path: config.run_dir.display().to_string(),
            source,
        })?;
    }

    let cancel = concurrency::CancelFlags::new();
    concurrency::cancel::install_signal_handlers(cancel.clone());

    let run_config = scheduler::RunConfig {
        run_dir: config.run_dir.clone(),
        source_conninfo: config.source_conninfo,
        target_conninfo: config.target_conninfo,
        options: config.options,
        filter: config.filter,
    };

    let summary = scheduler::run(run_config, cancel).await?;

    let summary_path = args.summary_path.unwrap_or_else(|| config.run_dir.join("summary.json"));
    output::write_report(&summary, &summary_path).await?;
    output::print_report(&summary)?;
    Ok(())
}

async fn run_compare_schema(source_conninfo: String, target_conninfo: String, run_dir: PathBuf) -> Result<()> {
    let source_triplet = catalog::CatalogTriplet::open_triplet(run_dir.join("source"))?;
    let target_triplet = catalog::CatalogTriplet::open_triplet(run_dir.join("target"))?;

    let source_conn = pgconn::PgConnection::connect(&source_conninfo).await?;
    planner::fetch_schema(source_conn.client(), &source_triplet.source, &pgconn::ObjectFilter::default(), true).await?;
    source_conn.close().await;

    let target_conn = pgconn::PgConnection::connect(&target_conninfo).await?;
    planner::fetch_schema(target_conn.client(), &target_triplet.source, &pgconn::ObjectFilter::default(), true).await?;
    target_conn.close().await;

    let report = comparator::compare_schemas(&source_triplet.source, &target_triplet.source).await?;
    output::print_report(&report)?;

    if report.has_mismatches() {
        return Err(CliError::SchemaMismatch);
    }
    Ok(())
}

async fn run_compare_data(source_conninfo: String, target_conninfo: String, run_dir: PathBuf, table_jobs: usize) -> Result<()> {
    let triplet = catalog::CatalogTriplet::open_triplet(run_dir.join("source"))?;

    let source_conn = pgconn::PgConnection::connect(&source_conninfo).await?;
    let outcome = planner::fetch_schema(source_conn.client(), &triplet.source, &pgconn::ObjectFilter::default(), true).await?;
    source_conn.close().await;

    let source_client = pgconn::connect_shared(&source_conninfo).await?;
    let target_client = pgconn::connect_shared(&target_conninfo).await?;
    let cancel = concurrency::CancelFlags::new();

    let results = comparator::compare_data(source_client, target_client, outcome.tables, triplet.source, table_jobs, cancel).await?;
    output::print_report(&results)?;

    if results.iter().any(|r| !r.matched) {
        return Err(CliError::SchemaMismatch);
    }
    Ok(())
}

async fn run_transform_stream(output_dir: PathBuf, timeline: u32, wal_seg_size: u64) -> Result<()> {
    tokio::fs::create_dir_all(&output_dir).await.map_err(|source| CliError::WriteReport {
        path: output_dir.display().to_string(),
        source,
    })?;
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    let config = transform::PipeStreamerConfig { output_dir, timeline, wal_seg_size };
    transform::pipe::stream(stdin, stdout, config).await?;
    Ok(())
}

async fn run_transform_segment(input_dir: PathBuf, output_dir: PathBuf, segment_name: String, is_final_segment: bool) -> Result<()> {
    tokio::fs::create_dir_all(&output_dir).await.map_err(|source| CliError::WriteReport {
        path: output_dir.display().to_string(),
        source,
    })?;
    let (tx, rx) = concurrency::NamedQueue::create("transform-cli", 1);
    let cancel = concurrency::CancelFlags::new();
    let job = transform::SegmentJob { segment_name, is_final_segment };
    tx.send(job).await.map_err(|_| CliError::Migration(scheduler::MigrationError::QueueClosed("transform queue".to_string())))?;
    tx.send_stop().await.map_err(|_| CliError::Migration(scheduler::MigrationError::QueueClosed("transform queue".to_string())))?;
    transform::file_worker::run(rx, input_dir, output_dir, cancel).await?;
    Ok(())
}

async fn run_progress(run_dir: PathBuf) -> Result<()> {
    let triplet = catalog::CatalogTriplet::open_triplet(run_dir)?;
    let timings = triplet.source.list_timings().await?;
    output::print_report(&timings)?;
    Ok(())
}
