use crate::error::Result;

pub mod factory;
pub use factory::RegistryFactory;

/// Source of "latest published version" answers for package names.
#[async_trait::async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch the version currently tagged `latest` for `package`.
    ///
    /// Unknown packages are an error, never `Ok` with an empty value.
    async fn fetch_latest(&self, package: &str) -> Result<String>;
}
