//! Engine configuration with builder pattern
//!
//! Provides a unified configuration for concurrency limiting, per-call
//! timeouts, comparison options and snapshot validation with sane defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for analysis and reconciliation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub concurrency: ConcurrencyConfig,
    pub timeouts: TimeoutConfig,
    pub comparison: ComparisonConfig,
    pub snapshot: SnapshotConfig,
}

/// Concurrency limiting configuration
#[derive(Debug, Clone)]
pub struct ConcurrencyConfig {
    /// Maximum concurrent remote calls
    pub max_concurrent_requests: usize,
    /// Maximum entity comparators running at once during analysis
    pub max_concurrent_comparators: usize,
    /// Record-level parallelism inside one comparator (e.g., group lookups)
    pub max_parallel_lookups: usize,
    /// Whether concurrency limiting is enabled
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Upper bound for any single remote call
    pub call_timeout: Duration,
}

/// What to compare and how deep
#[derive(Debug, Clone)]
pub struct ComparisonConfig {
    pub include_work_items: bool,
    pub include_classification_nodes: bool,
    pub include_security_groups: bool,
    pub include_queries: bool,
    /// Maximum depth of area/iteration trees
    pub classification_depth: u32,
    /// Maximum depth of the query folder hierarchy
    pub query_depth: u32,
    /// Maximum nesting followed when resolving group membership
    pub max_group_nesting: usize,
    /// Path segments marking deleted content; matching records are never
    /// compared or applied
    pub trash_sentinels: Vec<String>,
    /// Groups to compare; empty compares every source group
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Differences older than this are rejected at apply time
    pub max_age: Option<Duration>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: ConcurrencyConfig::default(),
            timeouts: TimeoutConfig::default(),
            comparison: ComparisonConfig::default(),
            snapshot: SnapshotConfig::default(),
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 8, // Remote APIs throttle aggressively
            max_concurrent_comparators: 2,
            max_parallel_lookups: 4,
            enabled: true,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            include_work_items: true,
            include_classification_nodes: true,
            include_security_groups: true,
            include_queries: true,
            classification_depth: 16,
            query_depth: 16,
            max_group_nesting: 8,
            trash_sentinels: vec!["Recycle Bin".to_string(), "Trash".to_string()],
            security_groups: Vec::new(),
        }
    }
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            max_age: Some(Duration::from_secs(60 * 60)),
        }
    }
}

impl ComparisonConfig {
    /// Whether any segment of `path` is a trash/recycle sentinel.
    ///
    /// A path "contains" the sentinel when one of its `/` or `\`
    /// separated segments equals it, ignoring case and surrounding
    /// whitespace. Substrings do not count, so `Trashed Bugs` is a live
    /// folder while `Shared Queries/Trash` is not.
    pub fn is_trashed(&self, path: &str) -> bool {
        path.split(['/', '\\'])
            .map(str::trim)
            .any(|segment| {
                self.trash_sentinels
                    .iter()
                    .any(|sentinel| segment.eq_ignore_ascii_case(sentinel))
            })
    }

    /// Whether `group_name` is in scope for comparison
    pub fn includes_group(&self, group_name: &str) -> bool {
        self.security_groups.is_empty()
            || self
                .security_groups
                .iter()
                .any(|g| g.eq_ignore_ascii_case(group_name))
    }
}

impl SyncConfig {
    /// Create a new builder for SyncConfig
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::new()
    }

    /// Conservative config for production organizations
    pub fn conservative() -> Self {
        Self {
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: 4,
                max_concurrent_comparators: 1,
                max_parallel_lookups: 2,
                enabled: true,
            },
            timeouts: TimeoutConfig {
                call_timeout: Duration::from_secs(60),
            },
            comparison: ComparisonConfig::default(),
            snapshot: SnapshotConfig {
                max_age: Some(Duration::from_secs(15 * 60)),
            },
        }
    }

    /// Higher limits for development organizations
    pub fn development() -> Self {
        Self {
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: 32,
                max_concurrent_comparators: 4,
                max_parallel_lookups: 16,
                enabled: false, // local runs are not throttled
            },
            timeouts: TimeoutConfig {
                call_timeout: Duration::from_secs(10),
            },
            comparison: ComparisonConfig::default(),
            snapshot: SnapshotConfig { max_age: None },
        }
    }

    /// Disable limits and snapshot expiry (for testing)
    pub fn disabled() -> Self {
        Self {
            concurrency: ConcurrencyConfig {
                max_concurrent_requests: usize::MAX,
                max_concurrent_comparators: usize::MAX,
                max_parallel_lookups: 64,
                enabled: false,
            },
            timeouts: TimeoutConfig {
                call_timeout: Duration::from_secs(3600),
            },
            comparison: ComparisonConfig::default(),
            snapshot: SnapshotConfig { max_age: None },
        }
    }

    /// Default location of the config file: `<config dir>/devops-sync/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("devops-sync").join("config.toml"))
    }

    /// Load config from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load config from the default path, falling back to defaults when
    /// no file exists
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).context("Invalid sync config")?;
        let mut config = Self::default();
        file.apply(&mut config)?;
        Ok(config)
    }
}

/// On-disk representation; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    concurrency: ConcurrencySection,
    #[serde(default)]
    timeouts: TimeoutSection,
    #[serde(default)]
    comparison: ComparisonSection,
    #[serde(default)]
    snapshot: SnapshotSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConcurrencySection {
    max_concurrent_requests: Option<usize>,
    max_concurrent_comparators: Option<usize>,
    max_parallel_lookups: Option<usize>,
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TimeoutSection {
    call_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ComparisonSection {
    include_work_items: Option<bool>,
    include_classification_nodes: Option<bool>,
    include_security_groups: Option<bool>,
    include_queries: Option<bool>,
    classification_depth: Option<u32>,
    query_depth: Option<u32>,
    max_group_nesting: Option<usize>,
    trash_sentinels: Option<Vec<String>>,
    security_groups: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SnapshotSection {
    /// 0 disables the age check
    max_age_secs: Option<u64>,
}

impl ConfigFile {
    fn apply(self, config: &mut SyncConfig) -> Result<()> {
        let c = self.concurrency;
        if let Some(v) = c.max_concurrent_requests {
            config.concurrency.max_concurrent_requests = v;
        }
        if let Some(v) = c.max_concurrent_comparators {
            config.concurrency.max_concurrent_comparators = v;
        }
        if let Some(v) = c.max_parallel_lookups {
            config.concurrency.max_parallel_lookups = v;
        }
        if let Some(v) = c.enabled {
            config.concurrency.enabled = v;
        }
        if config.concurrency.enabled
            && (config.concurrency.max_concurrent_requests == 0
                || config.concurrency.max_concurrent_comparators == 0)
        {
            anyhow::bail!("concurrency limits must be at least 1");
        }
        if config.concurrency.max_parallel_lookups == 0 {
            anyhow::bail!("max_parallel_lookups must be at least 1");
        }

        if let Some(secs) = self.timeouts.call_timeout_secs {
            if secs == 0 {
                anyhow::bail!("call_timeout_secs must be at least 1");
            }
            config.timeouts.call_timeout = Duration::from_secs(secs);
        }

        let cmp = self.comparison;
        if let Some(v) = cmp.include_work_items {
            config.comparison.include_work_items = v;
        }
        if let Some(v) = cmp.include_classification_nodes {
            config.comparison.include_classification_nodes = v;
        }
        if let Some(v) = cmp.include_security_groups {
            config.comparison.include_security_groups = v;
        }
        if let Some(v) = cmp.include_queries {
            config.comparison.include_queries = v;
        }
        if let Some(v) = cmp.classification_depth {
            config.comparison.classification_depth = v;
        }
        if let Some(v) = cmp.query_depth {
            config.comparison.query_depth = v;
        }
        if let Some(v) = cmp.max_group_nesting {
            config.comparison.max_group_nesting = v;
        }
        if let Some(v) = cmp.trash_sentinels {
            config.comparison.trash_sentinels = v;
        }
        if let Some(v) = cmp.security_groups {
            config.comparison.security_groups = v;
        }

        if let Some(secs) = self.snapshot.max_age_secs {
            config.snapshot.max_age = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            };
        }

        Ok(())
    }
}

/// Builder for SyncConfig
#[derive(Debug)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SyncConfig::default(),
        }
    }

    /// Replace the concurrency section
    pub fn concurrency_config(mut self, concurrency: ConcurrencyConfig) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// Set max concurrent remote calls
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.config.concurrency.max_concurrent_requests = max;
        self
    }

    /// Set max comparators running at once
    pub fn max_concurrent_comparators(mut self, max: usize) -> Self {
        self.config.concurrency.max_concurrent_comparators = max;
        self
    }

    pub fn max_parallel_lookups(mut self, max: usize) -> Self {
        self.config.concurrency.max_parallel_lookups = max.max(1);
        self
    }

    /// Turn request and comparator limits on or off
    pub fn enable_concurrency_limiting(mut self, enabled: bool) -> Self {
        self.config.concurrency.enabled = enabled;
        self
    }

    /// Set the per-call timeout
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeouts.call_timeout = timeout;
        self
    }

    /// Configure comparison options
    pub fn comparison_config(mut self, comparison: ComparisonConfig) -> Self {
        self.config.comparison = comparison;
        self
    }

    pub fn trash_sentinels(mut self, sentinels: Vec<String>) -> Self {
        self.config.comparison.trash_sentinels = sentinels;
        self
    }

    pub fn security_groups(mut self, groups: Vec<String>) -> Self {
        self.config.comparison.security_groups = groups;
        self
    }

    pub fn classification_depth(mut self, depth: u32) -> Self {
        self.config.comparison.classification_depth = depth;
        self
    }

    pub fn query_depth(mut self, depth: u32) -> Self {
        self.config.comparison.query_depth = depth;
        self
    }

    /// Maximum accepted snapshot age; `None` disables the check
    pub fn max_snapshot_age(mut self, max_age: Option<Duration>) -> Self {
        self.config.snapshot.max_age = max_age;
        self
    }

    /// Finish the builder
    pub fn build(self) -> SyncConfig {
        self.config
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
