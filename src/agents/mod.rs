pub mod dependency_updater;
pub mod manifest_locator;
pub mod manifest_writer;

pub mod update;

pub use dependency_updater::DependencyUpdater;
pub use manifest_locator::ManifestLocatorAgent;
pub use manifest_writer::{Manifest, ManifestWriter};
