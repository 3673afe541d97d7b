use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Runs a full migration: schema fetch, partitioning, COPY, index and
    /// constraint build, vacuum, sequences, large objects, finalize schema.
    Migrate(MigrateArgs),

    /// Validates a completed (or in-progress) migration.
    Compare {
        #[command(subcommand)]
        command: CompareCommand,
    },

    /// Drives the change-stream transformer.
    Transform {
        #[command(subcommand)]
        command: TransformCommand,
    },

    /// Prints the current `summary`/`timings` state of a run directory.
    Progress {
        /// Run directory containing `source.db`.
        #[arg(long)]
        run_dir: PathBuf,
    },
}

#[derive(Args)]
pub struct MigrateArgs {
    /// Path to a `pgcopydb.toml` config file. Missing is not an error;
    /// CLI flags and `PGCOPYDB_*` environment variables can supply
    /// everything on their own.
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub source_conninfo: Option<String>,

    #[arg(long)]
    pub target_conninfo: Option<String>,

    #[arg(long)]
    pub run_dir: Option<PathBuf>,

    #[arg(long)]
    pub table_jobs: Option<usize>,

    #[arg(long)]
    pub index_jobs: Option<usize>,

    #[arg(long)]
    pub resume: bool,

    #[arg(long)]
    pub restart: bool,

    #[arg(long)]
    pub fail_fast: bool,

    /// Where to write `summary.json`. Defaults to `<run_dir>/summary.json`.
    #[arg(long)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum CompareCommand {
    /// Re-fetches both schemas and reports every mismatch by qualified name.
    Schema {
        #[arg(long)]
        source_conninfo: String,
        #[arg(long)]
        target_conninfo: String,
        #[arg(long)]
        run_dir: PathBuf,
    },
    /// Checksums every matched table concurrently on both ends.
    Data {
        #[arg(long)]
        source_conninfo: String,
        #[arg(long)]
        target_conninfo: String,
        #[arg(long)]
        run_dir: PathBuf,
        #[arg(long, default_value_t = 4)]
        table_jobs: usize,
    },
}

#[derive(Subcommand)]
pub enum TransformCommand {
    /// Pipe-mode: reads logical-decoding JSON lines from stdin, writes
    /// rotating SQL segment files plus an echo to stdout.
    Stream {
        #[arg(long)]
        output_dir: PathBuf,
        #[arg(long, default_value_t = 1)]
        timeline: u32,
        #[arg(long, default_value_t = 16 * 1024 * 1024)]
        wal_seg_size: u64,
    },
    /// File-mode: transforms one already-delimited `<segment>.json` file
    /// into `<segment>.sql`.
    Segment {
        #[arg(long)]
        input_dir: PathBuf,
        #[arg(long)]
        output_dir: PathBuf,
        #[arg(long)]
        segment_name: String,
        #[arg(long)]
        is_final_segment: bool,
    },
}
