//! Configuration types for hadaps-balancer
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Namespace URI, pattern and generation parsing

use crate::error::ConfigError;
use crate::storage::GlobPattern;
use clap::Parser;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

/// Default number of concurrently running balancing operations
pub const DEFAULT_WORKERS: usize = 3;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 256;

/// Default time to wait for workers to exit on shutdown
pub const DEFAULT_GRACE_SECS: u64 = 10;

/// How often a blocked drain checks for interruption
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Highest replication factor accepted on a pattern
pub const MAX_REPLICATION: u16 = 512;

/// Regex for parsing namespace URIs
static NAMESPACE_URI_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches: file:///path, hdfs://host:port/path, mem://
    Regex::new(r"^([a-z]+)://([^/:]*)(?::(\d+))?(/[^\s]*)?$").expect("Invalid namespace URI regex")
});

/// Replication balancer driven by glob patterns
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hadaps-balancer",
    version,
    about = "Discover files by glob pattern and balance them with bounded concurrency",
    long_about = "Expands each pattern against the storage namespace, recursing into matched \
                  directories, sorts the discovered files, and runs one balancing operation per \
                  file with at most --workers operations in flight.\n\n\
                  A failing file is logged and skipped; the run continues.",
    after_help = "EXAMPLES:\n    \
        hadaps-balancer file:///srv/data -P '/logs/*.gz=2' -P '/hot/{a,b}*=5'\n    \
        hadaps-balancer file:///srv/data -P '/archive' -w 8 --grace-secs 30\n    \
        hadaps-balancer file:///srv/data -P '/a*' -g gen1=node1,node2 -g gen2=node3"
)]
pub struct CliArgs {
    /// Namespace to balance (file:///path)
    #[arg(value_name = "NAMESPACE_URI")]
    pub namespace: String,

    /// Glob pattern with optional target replication (GLOB or GLOB=REPLICATION)
    #[arg(
        short = 'P',
        long = "pattern",
        value_name = "GLOB[=REPL]",
        required = true,
        action = clap::ArgAction::Append
    )]
    pub patterns: Vec<String>,

    /// Node generation descriptor (NAME=host1,host2), can be repeated
    #[arg(short = 'g', long = "generation", value_name = "NAME=HOSTS", action = clap::ArgAction::Append)]
    pub generations: Vec<String>,

    /// Number of concurrent balancing operations
    #[arg(short = 'w', long, env = "HADAPS_WORKERS", default_value_t = DEFAULT_WORKERS, value_name = "NUM")]
    pub workers: usize,

    /// Seconds to wait for workers to exit at shutdown
    #[arg(long, default_value_t = DEFAULT_GRACE_SECS, value_name = "SECS")]
    pub grace_secs: u64,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Namespace URI scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Local filesystem
    File,
    /// HDFS namenode
    Hdfs,
    /// In-memory namespace, only usable through a `MemoryStorage` built in code
    Memory,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::File => "file",
            Scheme::Hdfs => "hdfs",
            Scheme::Memory => "mem",
        }
    }
}

/// Parsed namespace URI components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceUri {
    /// URI scheme
    pub scheme: Scheme,

    /// Host (empty for file:// and mem://)
    pub host: String,

    /// Optional port
    pub port: Option<u16>,

    /// Path component (`/` when absent)
    pub path: String,
}

impl NamespaceUri {
    /// Parse a namespace URI string
    ///
    /// Accepts formats:
    /// - file:///path/to/root
    /// - hdfs://namenode:8020/
    /// - mem://
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        let uri = uri.trim();
        let invalid = |reason: &str| ConfigError::InvalidNamespace {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };

        let caps = NAMESPACE_URI_REGEX
            .captures(uri)
            .ok_or_else(|| invalid("Expected format: scheme://[host[:port]]/path"))?;

        let scheme = match caps.get(1).map(|m| m.as_str()) {
            Some("file") => Scheme::File,
            Some("hdfs") => Scheme::Hdfs,
            Some("mem") => Scheme::Memory,
            _ => return Err(invalid("Unknown scheme (expected file, hdfs or mem)")),
        };

        let host = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();

        let port = match caps.get(3) {
            Some(m) => Some(m.as_str().parse::<u16>().map_err(|_| invalid("Port out of range"))?),
            None => None,
        };

        let path = caps
            .get(4)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        if scheme == Scheme::File && !host.is_empty() {
            return Err(invalid("file:// URIs must not name a host"));
        }
        if scheme == Scheme::Hdfs && host.is_empty() {
            return Err(invalid("hdfs:// URIs must name a namenode host"));
        }

        Ok(Self {
            scheme,
            host,
            port,
            path,
        })
    }
}

impl fmt::Display for NamespaceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(p) => write!(f, "{}://{}:{}{}", self.scheme.as_str(), self.host, p, self.path),
            None => write!(f, "{}://{}{}", self.scheme.as_str(), self.host, self.path),
        }
    }
}

/// A glob pattern and the balancing parameters for the files it matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternConfig {
    /// Glob pattern (absolute namespace path)
    pub pattern: String,

    /// Target replication factor; `None` keeps the current one
    pub replication: Option<u16>,
}

impl PatternConfig {
    /// Create a pattern configuration
    pub fn new(pattern: impl Into<String>, replication: Option<u16>) -> Self {
        Self {
            pattern: pattern.into(),
            replication,
        }
    }

    /// Parse `GLOB` or `GLOB=REPLICATION`
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();

        let (pattern, replication) = match value.rsplit_once('=') {
            Some((glob, repl)) if !repl.is_empty() && repl.bytes().all(|b| b.is_ascii_digit()) => {
                let replication = repl
                    .parse::<u16>()
                    .ok()
                    .filter(|r| (1..=MAX_REPLICATION).contains(r))
                    .ok_or_else(|| ConfigError::InvalidReplication {
                        value: repl.to_string(),
                        max: MAX_REPLICATION,
                    })?;
                (glob, Some(replication))
            }
            _ => (value, None),
        };

        GlobPattern::new(pattern).map_err(|e| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self::new(pattern, replication))
    }
}

impl fmt::Display for PatternConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.replication {
            Some(r) => write!(f, "{}={}", self.pattern, r),
            None => f.write_str(&self.pattern),
        }
    }
}

/// A node generation descriptor
///
/// Passed through to balancing operations untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Generation name
    pub name: String,

    /// Hosts belonging to this generation
    pub hosts: Vec<String>,
}

impl Generation {
    /// Parse `NAME=host1,host2` (hosts optional)
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let (name, hosts) = match value.split_once('=') {
            Some((name, hosts)) => (name.trim(), hosts),
            None => (value.trim(), ""),
        };

        if name.is_empty() {
            return Err(ConfigError::InvalidGeneration {
                value: value.to_string(),
                reason: "Generation name is empty".into(),
            });
        }

        let hosts = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            name: name.to_string(),
            hosts,
        })
    }
}

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    /// Worker pool size (maximum operations in flight)
    pub worker_count: usize,

    /// Time allowed for workers to exit at shutdown
    pub shutdown_grace: Duration,

    /// Interval at which a blocked drain checks for interruption
    pub poll_interval: Duration,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKERS,
            shutdown_grace: Duration::from_secs(DEFAULT_GRACE_SECS),
            poll_interval: DEFAULT_POLL_INTERVAL,
            show_progress: false,
            verbose: false,
        }
    }
}

impl BalanceConfig {
    /// Set the worker pool size
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Set the shutdown grace period
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set the interruption poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 || self.worker_count > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: self.worker_count,
                max: MAX_WORKERS,
            });
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::InvalidPollInterval(
                "poll interval must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Everything needed for one balancer run, parsed from the CLI
#[derive(Debug, Clone)]
pub struct BalancePlan {
    /// Namespace to balance
    pub namespace: NamespaceUri,

    /// Generation descriptors
    pub generations: Vec<Generation>,

    /// Patterns in the order given
    pub patterns: Vec<PatternConfig>,

    /// Run configuration
    pub config: BalanceConfig,
}

impl BalancePlan {
    /// Create and validate a plan from CLI arguments
    pub fn from_args(args: &CliArgs) -> Result<Self, ConfigError> {
        let namespace = NamespaceUri::parse(&args.namespace)?;

        match namespace.scheme {
            Scheme::File => {
                let root = PathBuf::from(&namespace.path);
                if !root.is_dir() {
                    return Err(ConfigError::InvalidNamespace {
                        uri: args.namespace.clone(),
                        reason: format!("'{}' is not a directory", root.display()),
                    });
                }
            }
            Scheme::Memory => {
                return Err(ConfigError::InvalidNamespace {
                    uri: args.namespace.clone(),
                    reason: "mem:// namespaces are empty outside of code that builds a MemoryStorage"
                        .into(),
                });
            }
            Scheme::Hdfs => {}
        }

        let patterns = args
            .patterns
            .iter()
            .map(|p| PatternConfig::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        let generations = args
            .generations
            .iter()
            .map(|g| Generation::parse(g))
            .collect::<Result<Vec<_>, _>>()?;

        let config = BalanceConfig {
            worker_count: args.workers,
            shutdown_grace: Duration::from_secs(args.grace_secs),
            poll_interval: DEFAULT_POLL_INTERVAL,
            show_progress: !args.quiet,
            verbose: args.verbose,
        };
        config.validate()?;

        Ok(Self {
            namespace,
            generations,
            patterns,
            config,
        })
    }
}
