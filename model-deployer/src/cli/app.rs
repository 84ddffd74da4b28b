use clap::{Args, Parser, Subcommand, ValueEnum};
use model_deployer_core::{DeployerConfig, WatchMode};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "model-deployer",
    version,
    about = "Model Deployer - keep a model collection in sync with a directory",
    long_about = "Model Deployer watches a directory of model files and deploys every file that appears to a remote model collection, undeploying it again when the file disappears. Each file is deployed under the part of its name before the first dot."
)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize a directory with the model collection until interrupted
    #[command(about = "Watch a directory and deploy/undeploy models as files come and go")]
    Watch(WatchArgs),

    /// Show what a directory would deploy
    #[command(about = "List the files in a directory and the model each one maps to")]
    Scan(ScanArgs),

    /// Deploy a single model file
    #[command(about = "Deploy one model file to the collection")]
    Deploy(DeployArgs),

    /// Undeploy a single model
    #[command(about = "Remove one model from the collection")]
    Undeploy(UndeployArgs),
}

/// Change detection strategy argument for CLI
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// Periodic directory snapshots
    Poll,
    /// Native filesystem notifications
    Notify,
}

impl From<ModeArg> for WatchMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Poll => WatchMode::Poll,
            ModeArg::Notify => WatchMode::Notify,
        }
    }
}

/// Where the model collection lives
#[derive(Args, Debug, Default)]
pub struct CollectionArgs {
    /// Base URL of the model collection, e.g. http://localhost:8080/openscoring/model
    #[arg(long)]
    pub model_collection: Option<String>,
}

impl CollectionArgs {
    pub fn apply(&self, config: &mut DeployerConfig) {
        if let Some(url) = &self.model_collection {
            config.model_collection = Some(url.clone());
        }
    }
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Directory to watch for model file additions and removals
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    #[command(flatten)]
    pub collection: CollectionArgs,

    /// Milliseconds between directory scans
    #[arg(long, value_name = "MS")]
    pub poll_interval: Option<u64>,

    /// Milliseconds to wait for the scoring server before the first scan
    #[arg(long, value_name = "MS")]
    pub warmup: Option<u64>,

    /// How changes are detected
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Log deploys and undeploys instead of sending them
    #[arg(long)]
    pub dry_run: bool,
}

impl WatchArgs {
    pub fn apply(&self, config: &mut DeployerConfig) {
        if let Some(dir) = &self.dir {
            config.model_dir = Some(dir.clone());
        }
        self.collection.apply(config);
        if let Some(ms) = self.poll_interval {
            config.poll_interval_ms = ms;
        }
        if let Some(ms) = self.warmup {
            config.warmup_ms = ms;
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
    }
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan (defaults to the configured model directory)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Model file to upload
    pub file: PathBuf,

    /// Identifier to deploy under instead of the one derived from the file name
    #[arg(long)]
    pub id: Option<String>,

    #[command(flatten)]
    pub collection: CollectionArgs,
}

#[derive(Args, Debug)]
pub struct UndeployArgs {
    /// Identifier of the model to remove
    pub id: String,

    #[command(flatten)]
    pub collection: CollectionArgs,
}
