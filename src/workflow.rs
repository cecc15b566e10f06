use crate::agents::update::{DependencySection, UpdateReport};
use crate::agents::{DependencyUpdater, Manifest, ManifestLocatorAgent, ManifestWriter};
use crate::cache::TtlCache;
use crate::error::Result;
use crate::registry::RegistryFactory;
use colored::Colorize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Everything a single update run needs, resolved from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory relative inputs and the default search start from
    pub working_dir: PathBuf,
    /// Manifest file, or directory to search upward from
    pub input: Option<PathBuf>,
    pub exclude: Vec<String>,
    /// Print the merged manifest instead of writing it
    pub json: bool,
    pub registry: String,
    pub concurrency: usize,
    /// `None` disables the cache
    pub cache: Option<CacheOptions>,
    pub show_progress: bool,
}

#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub path: PathBuf,
    pub ttl: Duration,
}

/// How a successful run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    UpToDate,
    Written { path: PathBuf, updates: usize },
    Printed { updates: usize },
}

/// Execute the update workflow
pub async fn execute_update(options: &RunOptions) -> Result<RunOutcome> {
    let started = Instant::now();

    let locator = ManifestLocatorAgent::new(options.input.as_deref(), &options.working_dir);
    let manifest_path = locator.locate()?;
    debug!(path = %manifest_path.display(), "using manifest");

    let manifest = Manifest::load(&manifest_path)?;
    let dependencies = manifest.dependencies(DependencySection::Dependencies)?;
    let dev_dependencies = manifest.dependencies(DependencySection::DevDependencies)?;

    let mut cache = options
        .cache
        .as_ref()
        .map(|cache| {
            TtlCache::open(&cache.path, cache.ttl)
                .with_namespace(options.registry.trim_end_matches('/'))
        });

    let exclude: HashSet<String> = options.exclude.iter().cloned().collect();
    let updater = DependencyUpdater::new(RegistryFactory::create_npm(&options.registry)?)
        .with_concurrency(options.concurrency)
        .with_progress(options.show_progress);

    let report = updater
        .update(&dependencies, &dev_dependencies, &exclude, cache.as_ref())
        .await?;

    print_changes(&report);

    let outcome = if report.is_empty() {
        println!("{}", "Everything up-to-date".green());
        RunOutcome::UpToDate
    } else {
        let merged = manifest.merge(
            &report.dependencies.dependencies,
            &report.dev_dependencies.dependencies,
        );

        if options.json {
            println!("\n{}", merged.to_pretty_json()?);
            RunOutcome::Printed {
                updates: report.total_updates(),
            }
        } else {
            ManifestWriter::new(&manifest_path).write(&merged)?;
            print_summary(&report);
            RunOutcome::Written {
                path: manifest_path,
                updates: report.total_updates(),
            }
        }
    };

    if let Some(cache) = cache.as_mut() {
        for resolved in report.resolved() {
            cache.set(resolved.name.as_str(), resolved.version.as_str());
        }
        if let Err(e) = cache.flush() {
            warn!("failed to save version cache: {}", e);
        }
    }

    println!(
        "\n✨  Done in {:.2}s",
        started.elapsed().as_secs_f64()
    );
    Ok(outcome)
}

fn print_changes(report: &UpdateReport) {
    for section in report.sections() {
        for change in &section.changes {
            println!(
                "{} {} → {}",
                change.name,
                change.previous.red(),
                change.updated.green()
            );
        }
    }
}

fn print_summary(report: &UpdateReport) {
    for section in report.sections() {
        if !section.is_empty() {
            println!(
                "{}",
                format!("Updated {} package(s) in {}", section.changes.len(), section.section)
                    .dimmed()
            );
        }
    }
}
