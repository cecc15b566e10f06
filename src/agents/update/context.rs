use indexmap::IndexMap;
use std::fmt;

/// Package name to version range, in manifest order
pub type DependencyMap = IndexMap<String, String>;

/// The manifest sections the resolver updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencySection {
    Dependencies,
    DevDependencies,
}

impl DependencySection {
    /// Manifest key for this section
    pub fn key(&self) -> &'static str {
        match self {
            DependencySection::Dependencies => "dependencies",
            DependencySection::DevDependencies => "devDependencies",
        }
    }
}

impl fmt::Display for DependencySection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A single rewritten range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyChange {
    pub name: String,
    pub previous: String,
    pub updated: String,
}

/// A version that came from the registry during this run and belongs in the cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub name: String,
    pub version: String,
}

/// Outcome of resolving one dependency section
#[derive(Debug, Clone)]
pub struct SectionUpdate {
    pub section: DependencySection,
    /// Every entry of the section, with changed ranges staged in place
    pub dependencies: DependencyMap,
    /// Changes in the order their lookups completed
    pub changes: Vec<DependencyChange>,
    /// Versions fetched from the registry (cache hits excluded)
    pub resolved: Vec<ResolvedVersion>,
}

impl SectionUpdate {
    pub fn unchanged(section: DependencySection, dependencies: DependencyMap) -> Self {
        Self {
            section,
            dependencies,
            changes: Vec::new(),
            resolved: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Tracks the changes computed during one run
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub dependencies: SectionUpdate,
    pub dev_dependencies: SectionUpdate,
}

impl UpdateReport {
    /// Check if the report is empty (no updates)
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.dev_dependencies.is_empty()
    }

    /// Get the total number of updates
    pub fn total_updates(&self) -> usize {
        self.dependencies.changes.len() + self.dev_dependencies.changes.len()
    }

    pub fn sections(&self) -> [&SectionUpdate; 2] {
        [&self.dependencies, &self.dev_dependencies]
    }

    /// Registry answers from both sections, for the cache
    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedVersion> {
        self.dependencies
            .resolved
            .iter()
            .chain(self.dev_dependencies.resolved.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(name: &str) -> DependencyChange {
        DependencyChange {
            name: name.to_string(),
            previous: "^1.0.0".to_string(),
            updated: "^2.0.0".to_string(),
        }
    }

    #[test]
    fn report_counts_changes_across_sections() {
        let mut deps = SectionUpdate::unchanged(DependencySection::Dependencies, DependencyMap::new());
        let mut dev =
            SectionUpdate::unchanged(DependencySection::DevDependencies, DependencyMap::new());
        let report = UpdateReport {
            dependencies: deps.clone(),
            dev_dependencies: dev.clone(),
        };
        assert!(report.is_empty());

        deps.changes.push(change("a"));
        dev.changes.push(change("b"));
        dev.changes.push(change("c"));
        let report = UpdateReport {
            dependencies: deps,
            dev_dependencies: dev,
        };
        assert!(!report.is_empty());
        assert_eq!(report.total_updates(), 3);
    }

    #[test]
    fn section_keys_match_manifest_fields() {
        assert_eq!(DependencySection::Dependencies.key(), "dependencies");
        assert_eq!(DependencySection::DevDependencies.to_string(), "devDependencies");
    }
}
