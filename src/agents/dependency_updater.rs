use crate::agents::update::{
    DependencyChange, DependencyMap, DependencySection, ResolvedVersion, SectionUpdate,
    UpdateReport,
};
use crate::cache::TtlCache;
use crate::error::Result;
use crate::npm::range::bare_version;
use crate::npm::{RangeOperator, is_sentinel, validate_package_name};
use crate::registry::RegistryClient;
use futures::stream::{self, StreamExt, TryStreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CONCURRENCY: usize = 10;

/// DependencyUpdater resolves the latest version of every dependency and
/// computes the new ranges, keeping each entry's range operator.
pub struct DependencyUpdater {
    registry: Arc<dyn RegistryClient>,
    concurrency: usize,
    progress: MultiProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LookupSource {
    Cache,
    Registry,
}

#[derive(Debug)]
struct Lookup {
    name: String,
    previous: String,
    latest: String,
    source: LookupSource,
}

impl DependencyUpdater {
    pub fn new(registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            registry,
            concurrency: DEFAULT_CONCURRENCY,
            progress: MultiProgress::new(),
        }
    }

    /// Maximum number of in-flight lookups per section
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_progress(self, show_progress: bool) -> Self {
        if !show_progress {
            self.progress.set_draw_target(ProgressDrawTarget::hidden());
        }
        self
    }

    /// Resolve both sections concurrently. The first failed lookup in
    /// either section fails the whole update.
    pub async fn update(
        &self,
        dependencies: &DependencyMap,
        dev_dependencies: &DependencyMap,
        exclude: &HashSet<String>,
        cache: Option<&TtlCache>,
    ) -> Result<UpdateReport> {
        let (dependencies, dev_dependencies) = tokio::try_join!(
            self.resolve(DependencySection::Dependencies, dependencies, exclude, cache),
            self.resolve(DependencySection::DevDependencies, dev_dependencies, exclude, cache),
        )?;

        Ok(UpdateReport {
            dependencies,
            dev_dependencies,
        })
    }

    /// Resolve one section. Lookups run with at most `concurrency` in
    /// flight; their results are folded into the section by this task
    /// alone, in completion order.
    pub async fn resolve(
        &self,
        section: DependencySection,
        dependencies: &DependencyMap,
        exclude: &HashSet<String>,
        cache: Option<&TtlCache>,
    ) -> Result<SectionUpdate> {
        let pb = self.progress_bar(section, Self::candidates(dependencies, exclude).count());

        let lookups: Vec<Lookup> = stream::iter(Self::candidates(dependencies, exclude))
            .map(|(name, previous)| self.lookup(name, previous, cache, &pb))
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;
        pb.finish_and_clear();

        let mut update = SectionUpdate::unchanged(section, dependencies.clone());
        for lookup in lookups {
            let operator = RangeOperator::detect(&lookup.previous);
            let candidate = operator.apply(&lookup.latest);

            if candidate != lookup.previous {
                update
                    .dependencies
                    .insert(lookup.name.clone(), candidate.clone());
                update.changes.push(DependencyChange {
                    name: lookup.name.clone(),
                    previous: lookup.previous,
                    updated: candidate,
                });
            }

            if lookup.source == LookupSource::Registry {
                update.resolved.push(ResolvedVersion {
                    name: lookup.name,
                    version: lookup.latest,
                });
            }
        }

        debug!(
            section = %section,
            changes = update.changes.len(),
            "section resolved"
        );
        Ok(update)
    }

    /// Entries that need a lookup: not excluded and not a sentinel range
    fn candidates<'a>(
        dependencies: &'a DependencyMap,
        exclude: &'a HashSet<String>,
    ) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
        dependencies
            .iter()
            .filter(move |(name, _)| !exclude.contains(name.as_str()))
            .filter(|(_, range)| !is_sentinel(range))
    }

    async fn lookup(
        &self,
        name: &str,
        previous: &str,
        cache: Option<&TtlCache>,
        pb: &ProgressBar,
    ) -> Result<Lookup> {
        validate_package_name(name)?;
        pb.set_message(format!("Checking {}", name));

        let cached = cache.and_then(|cache| cache.get(name));
        let (latest, source) = match cached {
            Some(version) => {
                debug!(package = name, version, "cache hit");
                (version.to_string(), LookupSource::Cache)
            }
            None => {
                let version = self.registry.fetch_latest(name).await?;
                (version, LookupSource::Registry)
            }
        };

        debug!(
            package = name,
            current = bare_version(previous),
            latest = %latest,
            "resolved latest version"
        );
        pb.inc(1);

        Ok(Lookup {
            name: name.to_string(),
            previous: previous.to_string(),
            latest,
            source,
        })
    }

    fn progress_bar(&self, section: DependencySection, len: usize) -> ProgressBar {
        if len == 0 {
            return ProgressBar::hidden();
        }

        let pb = self.progress.add(ProgressBar::new(len as u64));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {prefix:>15} [{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_prefix(section.key());
        pb
    }
}
