use crate::agents::dependency_updater::DEFAULT_CONCURRENCY;
use crate::cache::{DEFAULT_TTL_SECS, TtlCache};
use crate::error::{OdcError, Result};
use crate::npm::DEFAULT_REGISTRY;
use crate::workflow::{CacheOptions, RunOptions};
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "odc",
    about = "Update package.json dependencies to their latest versions, keeping range operators",
    version,
    disable_version_flag = true,
    after_help = "Examples:\n  $ odc\n  $ odc --input test/ -e chalk,lodash"
)]
pub struct Cli {
    /// Path of a package.json file, or a directory to search upward from (defaults to the nearest one)
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Exclude packages (comma-separated, repeatable)
    #[arg(short, long, value_name = "PKG,...", value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Output a JSON object instead of writing package.json
    #[arg(short, long)]
    pub json: bool,

    /// Registry to query for latest versions
    #[arg(long, env = "ODC_REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: String,

    /// Maximum number of concurrent registry lookups per dependency section
    #[arg(long, env = "ODC_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Skip the version cache entirely
    #[arg(long)]
    pub no_cache: bool,

    /// Seconds a cached version stays valid
    #[arg(long, env = "ODC_CACHE_TTL", value_name = "SECS", default_value_t = DEFAULT_TTL_SECS)]
    pub cache_ttl: u64,

    /// Enable verbose output for debugging
    #[arg(long)]
    pub verbose: bool,

    /// Print the version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,
}

impl Cli {
    pub fn into_options(self, working_dir: PathBuf) -> Result<RunOptions> {
        if self.concurrency == 0 {
            return Err(OdcError::InvalidOption(
                "--concurrency must be at least 1".to_string(),
            ));
        }

        let exclude = self
            .exclude
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        let cache = (!self.no_cache).then(|| CacheOptions {
            path: TtlCache::default_path(),
            ttl: Duration::from_secs(self.cache_ttl),
        });

        Ok(RunOptions {
            working_dir,
            input: self.input,
            exclude,
            json: self.json,
            registry: self.registry,
            concurrency: self.concurrency,
            cache,
            show_progress: !self.json,
        })
    }
}
