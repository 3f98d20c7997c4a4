use std::path::PathBuf;

use clap::Parser;

use groundwork::constants::{DEFAULT_BACKUP_ROOT, DEFAULT_LOG_PATH};

#[derive(Parser)]
#[command(name = "groundwork")]
#[command(version)]
#[command(about = "Provision and tune a single Ubuntu host for local AI workloads", long_about = None)]
pub struct Cli {
    /// Record what would run without executing or snapshotting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip every step before this one without probing it
    #[arg(long, value_name = "STEP_ID")]
    pub resume_from: Option<String>,

    /// Run only these steps (plus their dependencies)
    #[arg(long, value_name = "STEP_IDS", value_delimiter = ',')]
    pub only: Option<Vec<String>>,

    /// Replay a recorded run's snapshots in reverse instead of provisioning
    #[arg(long, value_name = "RUN_ID")]
    pub rollback: Option<String>,

    /// Append-only facts log
    #[arg(long, value_name = "PATH", default_value = DEFAULT_LOG_PATH)]
    pub log_path: PathBuf,

    /// Backup area root; each run snapshots into a timestamped directory here
    #[arg(long, value_name = "PATH", default_value = DEFAULT_BACKUP_ROOT)]
    pub backup_dir: PathBuf,

    /// Keep going past failed steps instead of halting the plan
    #[arg(long)]
    pub keep_going: bool,

    /// Per-step wall-clock budget in seconds (default: unbounded)
    #[arg(long, value_name = "SECONDS")]
    pub step_timeout: Option<u64>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
