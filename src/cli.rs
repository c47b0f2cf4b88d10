//! Command-line interface
//!
//! Flags are resolved over the connection profile: an explicit flag wins,
//! then the profile, then the built-in default.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::persistence::HistoryFilter;
use crate::config::{
    BenchmarkConfig, ConnectionProfile, KeySelection, OperationKind, PayloadKind,
    DEFAULT_CONCURRENCY, DEFAULT_PAGE_SIZE, DEFAULT_PREFIX,
};
use crate::util::units::{parse_duration, parse_size};

#[derive(Parser, Debug)]
#[command(
    name = "s3-load-gen",
    version,
    about = "Load generator for S3-compatible object storage"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload new objects as fast as possible
    Put(PutArgs),
    /// Download existing objects, fully or by range
    Get(GetArgs),
    /// Enumerate every key under the prefix
    List(ListArgs),
    /// Show stored results of previous runs
    History(HistoryArgs),
}

/// Options shared by the benchmark subcommands
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Endpoint URL, e.g. http://localhost:9000
    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long)]
    pub bucket: Option<String>,

    #[arg(long)]
    pub access_key: Option<String>,

    #[arg(long)]
    pub secret_key: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    /// Run time, in seconds or as a duration string (e.g. 2m)
    #[arg(long, value_parser = parse_duration, default_value = "60")]
    pub duration: Duration,

    /// Number of concurrent workers
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Key prefix; must end with '/'
    #[arg(long, default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Connection profile file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not append this run to the result history
    #[arg(long)]
    pub no_save: bool,

    /// Hide the live progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl CommonArgs {
    /// Layer profile values and then explicit flags onto a preset
    fn apply(&self, preset: BenchmarkConfig, profile: &ConnectionProfile) -> BenchmarkConfig {
        let mut config = preset
            .with_profile(profile)
            .with_duration(self.duration)
            .with_concurrency(self.concurrency)
            .with_prefix(self.prefix.clone());

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(access_key) = &self.access_key {
            config.credentials.access_key = access_key.clone();
        }
        if let Some(secret_key) = &self.secret_key {
            config.credentials.secret_key = secret_key.clone();
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PayloadArg {
    Random,
    Pattern,
}

impl From<PayloadArg> for PayloadKind {
    fn from(arg: PayloadArg) -> Self {
        match arg {
            PayloadArg::Random => PayloadKind::Random,
            PayloadArg::Pattern => PayloadKind::Pattern,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PutArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Object size, in bytes or with a unit (e.g. 4MiB)
    #[arg(long, value_parser = parse_size, default_value = "1MiB")]
    pub object_size: u64,

    /// Multipart part size, in bytes or with a unit
    #[arg(long, value_parser = parse_size, default_value = "8MiB")]
    pub part_size: u64,

    /// Always upload with a single PutObject
    #[arg(long)]
    pub no_multipart: bool,

    /// Payload content
    #[arg(long, value_enum, default_value_t = PayloadArg::Random)]
    pub payload: PayloadArg,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Read only the first N bytes of each object
    #[arg(long, value_parser = parse_size)]
    pub range_bytes: Option<u64>,

    /// Derive keys from a prior PUT run instead of listing the prefix
    #[arg(long)]
    pub objects_per_worker: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Keys requested per page (1-1000)
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OperationArg {
    Put,
    Get,
    List,
}

impl From<OperationArg> for OperationKind {
    fn from(arg: OperationArg) -> Self {
        match arg {
            OperationArg::Put => OperationKind::Put,
            OperationArg::Get => OperationKind::Get,
            OperationArg::List => OperationKind::List,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Number of most recent runs to show
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    /// Only show runs of this workload
    #[arg(long, value_enum)]
    pub operation: Option<OperationArg>,

    /// Delete the stored history
    #[arg(long)]
    pub clear: bool,
}

impl HistoryArgs {
    pub fn filter(&self) -> HistoryFilter {
        HistoryFilter::recent(self.limit).with_operation(self.operation.map(Into::into))
    }
}

impl Commands {
    /// Shared flags of a benchmark subcommand; `None` for `history`
    pub fn common(&self) -> Option<&CommonArgs> {
        match self {
            Commands::Put(args) => Some(&args.common),
            Commands::Get(args) => Some(&args.common),
            Commands::List(args) => Some(&args.common),
            Commands::History(_) => None,
        }
    }

    /// Resolved (not yet validated) configuration of a benchmark subcommand
    pub fn benchmark_config(&self, profile: &ConnectionProfile) -> Option<BenchmarkConfig> {
        match self {
            Commands::Put(args) => Some(
                args.common
                    .apply(BenchmarkConfig::put(), profile)
                    .with_object_size(args.object_size)
                    .with_part_size(args.part_size)
                    .with_multipart(!args.no_multipart)
                    .with_payload(args.payload.into()),
            ),
            Commands::Get(args) => {
                let selection = match args.objects_per_worker {
                    Some(objects_per_worker) => KeySelection::Derived { objects_per_worker },
                    None => KeySelection::Discover,
                };
                Some(
                    args.common
                        .apply(BenchmarkConfig::get(), profile)
                        .with_range_length(args.range_bytes)
                        .with_key_selection(selection),
                )
            }
            Commands::List(args) => Some(
                args.common
                    .apply(BenchmarkConfig::list(), profile)
                    .with_page_size(args.page_size),
            ),
            Commands::History(_) => None,
        }
    }
}
