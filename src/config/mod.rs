//! Configuration management module
//!
//! Holds the immutable benchmark configuration, its validation rules and
//! the optional connection profile file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::bench::multipart::{PartPlan, MAX_PART_COUNT};
use crate::{LoadGenError, Result, APP_NAME, CONFIG_FILE};

pub mod persistence;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCESS_KEY: &str = "changeme";
pub const DEFAULT_SECRET_KEY: &str = "changeme";
pub const DEFAULT_DURATION_SECS: u64 = 60;
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_OBJECT_SIZE: u64 = 1024 * 1024; // 1 MiB
pub const DEFAULT_PART_SIZE: u64 = 8 * 1024 * 1024; // 8 MiB
pub const DEFAULT_PREFIX: &str = "test-object/";
pub const DEFAULT_PAGE_SIZE: i32 = 1000;
/// Separator every key prefix must end with
pub const KEY_SEPARATOR: char = '/';

const MAX_CONCURRENCY: usize = 4096;

/// Workload a run drives against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Put,
    Get,
    List,
}

impl OperationKind {
    /// Label used in reports
    pub fn description(&self) -> &'static str {
        match self {
            OperationKind::Put => "PUT",
            OperationKind::Get => "GET",
            OperationKind::List => "LIST",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Payload content written by PUT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Fresh pseudo-random bytes for every part
    #[default]
    Random,
    /// Shared repeating byte pattern, no per-part generation cost
    Pattern,
}

/// How GET workers pick the keys they read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum KeySelection {
    /// List the prefix once before the run and cycle over what exists
    #[default]
    Discover,
    /// Read the keys a PUT run wrote, `objects_per_worker` per worker id
    Derived { objects_per_worker: u64 },
}

/// Static access credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    #[serde(skip_serializing, default)]
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_ACCESS_KEY, DEFAULT_SECRET_KEY)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Benchmark configuration, created once from resolved inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Store endpoint URL
    pub endpoint: String,
    /// Target bucket
    pub bucket: String,
    /// Signing region
    pub region: String,
    pub credentials: Credentials,
    /// Workload to run
    pub operation: OperationKind,
    /// Time budget for issuing new operations
    pub duration: Duration,
    /// Number of concurrent workers
    pub concurrency: usize,
    /// PUT object size in bytes
    pub object_size: u64,
    /// Multipart part size in bytes
    pub part_size: u64,
    /// Whether PUT may use multipart uploads
    pub multipart: bool,
    /// Key prefix, ends with [`KEY_SEPARATOR`]
    pub prefix: String,
    /// GET range length; full download when unset
    pub range_length: Option<u64>,
    pub payload: PayloadKind,
    pub key_selection: KeySelection,
    /// Keys requested per LIST page
    pub page_size: i32,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: String::new(),
            region: DEFAULT_REGION.to_string(),
            credentials: Credentials::default(),
            operation: OperationKind::Put,
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            object_size: DEFAULT_OBJECT_SIZE,
            part_size: DEFAULT_PART_SIZE,
            multipart: true,
            prefix: DEFAULT_PREFIX.to_string(),
            range_length: None,
            payload: PayloadKind::default(),
            key_selection: KeySelection::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl BenchmarkConfig {
    /// Create configuration for a PUT benchmark
    pub fn put() -> Self {
        Self {
            operation: OperationKind::Put,
            ..Self::default()
        }
    }

    /// Create configuration for a GET benchmark
    pub fn get() -> Self {
        Self {
            operation: OperationKind::Get,
            ..Self::default()
        }
    }

    /// Create configuration for a LIST benchmark
    pub fn list() -> Self {
        Self {
            operation: OperationKind::List,
            ..Self::default()
        }
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(LoadGenError::ConfigError(
                "Endpoint must not be empty".to_string()
            ));
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(LoadGenError::ConfigError(
                format!("Endpoint must start with http:// or https://: {}", self.endpoint)
            ));
        }

        if self.bucket.trim().is_empty() {
            return Err(LoadGenError::ConfigError(
                "Bucket must not be empty".to_string()
            ));
        }

        if self.duration.is_zero() {
            return Err(LoadGenError::ConfigError(
                "Duration must be greater than 0".to_string()
            ));
        }

        if self.concurrency == 0 {
            return Err(LoadGenError::ConfigError(
                "Concurrency must be at least 1".to_string()
            ));
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(LoadGenError::ConfigError(
                format!("Too many workers: {} (max: {})", self.concurrency, MAX_CONCURRENCY)
            ));
        }

        if self.prefix.is_empty() {
            return Err(LoadGenError::ConfigError(
                "Prefix must not be empty".to_string()
            ));
        }

        if !self.prefix.ends_with(KEY_SEPARATOR) {
            return Err(LoadGenError::ConfigError(
                format!("Prefix must end with '{}': {}", KEY_SEPARATOR, self.prefix)
            ));
        }

        match self.operation {
            OperationKind::Put => {
                if self.part_size == 0 {
                    return Err(LoadGenError::ConfigError(
                        "Part size must be greater than 0".to_string()
                    ));
                }

                if self.multipart {
                    let plan = PartPlan::new(self.object_size, self.part_size);
                    if plan.part_count() > MAX_PART_COUNT {
                        return Err(LoadGenError::ConfigError(
                            format!("Object needs {} parts (max: {}); raise the part size",
                                plan.part_count(), MAX_PART_COUNT)
                        ));
                    }
                }
            }
            OperationKind::Get => {
                if self.range_length == Some(0) {
                    return Err(LoadGenError::ConfigError(
                        "Range length must be greater than 0".to_string()
                    ));
                }

                if let KeySelection::Derived { objects_per_worker: 0 } = self.key_selection {
                    return Err(LoadGenError::ConfigError(
                        "Objects per worker must be greater than 0".to_string()
                    ));
                }
            }
            OperationKind::List => {
                if !(1..=1000).contains(&self.page_size) {
                    return Err(LoadGenError::ConfigError(
                        format!("Page size must be between 1 and 1000: {}", self.page_size)
                    ));
                }
            }
        }

        Ok(())
    }

    /// Set the endpoint URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the bucket
    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the test duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the number of workers
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_object_size(mut self, size: u64) -> Self {
        self.object_size = size;
        self
    }

    pub fn with_part_size(mut self, size: u64) -> Self {
        self.part_size = size;
        self
    }

    pub fn with_multipart(mut self, enabled: bool) -> Self {
        self.multipart = enabled;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_range_length(mut self, length: Option<u64>) -> Self {
        self.range_length = length;
        self
    }

    pub fn with_payload(mut self, payload: PayloadKind) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_key_selection(mut self, selection: KeySelection) -> Self {
        self.key_selection = selection;
        self
    }

    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Apply profile values for fields still at their defaults
    pub fn with_profile(mut self, profile: &ConnectionProfile) -> Self {
        if self.endpoint.is_empty() {
            if let Some(endpoint) = &profile.endpoint {
                self.endpoint = endpoint.clone();
            }
        }
        if self.bucket.is_empty() {
            if let Some(bucket) = &profile.bucket {
                self.bucket = bucket.clone();
            }
        }
        if let Some(region) = &profile.region {
            self.region = region.clone();
        }
        if let Some(access_key) = &profile.access_key {
            self.credentials.access_key = access_key.clone();
        }
        if let Some(secret_key) = &profile.secret_key {
            self.credentials.secret_key = secret_key.clone();
        }
        self
    }
}

/// Connection settings read from a TOML profile file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProfile {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

impl ConnectionProfile {
    /// Load the profile from `path`, or from the standard location.
    ///
    /// An explicit path must exist; a missing file at the standard location
    /// yields an empty profile.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let default_path = Self::config_file_path()?;
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                Self::load_from(&default_path)
            }
        }
    }

    /// Load the profile from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| LoadGenError::ConfigError(
                format!("Failed to read config file {}: {}", path.display(), e)
            ))?;

        toml::from_str(&content)
            .map_err(|e| LoadGenError::ConfigError(
                format!("Failed to parse config file {}: {}", path.display(), e)
            ))
    }

    /// Save the profile to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| LoadGenError::ConfigError(
                    format!("Failed to create config directory {}: {}", parent.display(), e)
                ))?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| LoadGenError::ConfigError(
                format!("Failed to write config file {}: {}", path.display(), e)
            ))?;

        Ok(())
    }

    /// Get the standard profile file path
    /// Uses $CONFIG_HOME/s3-load-gen/s3-load-gen.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| LoadGenError::ConfigError(
                "Unable to determine config directory".to_string()
            ))?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
