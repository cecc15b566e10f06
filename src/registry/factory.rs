use crate::error::Result;
use crate::npm::NpmRegistry;
use crate::registry::RegistryClient;
use std::sync::Arc;

pub struct RegistryFactory;

impl RegistryFactory {
    pub fn create_npm(base_url: &str) -> Result<Arc<dyn RegistryClient>> {
        let client = NpmRegistry::new(base_url)?;
        Ok(Arc::new(client))
    }
}
