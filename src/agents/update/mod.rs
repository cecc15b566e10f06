// Update module - per-run result types shared by the resolver, the
// manifest writer and the console report.
pub mod context;

pub use context::{
    DependencyChange, DependencyMap, DependencySection, ResolvedVersion, SectionUpdate,
    UpdateReport,
};
