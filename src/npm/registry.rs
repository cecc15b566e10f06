use crate::error::{OdcError, Result};
use crate::npm::package_name::encode_package_name;
use crate::registry::RegistryClient;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

// Abbreviated metadata is a fraction of the full packument and still carries dist-tags.
const ABBREVIATED_METADATA: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// npm registry client
pub struct NpmRegistry {
    client: Client,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::validate_registry_url(base_url)?;
        Ok(Self {
            client: Self::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn package_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, encode_package_name(package))
    }

    fn build_client() -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("odc/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OdcError::InvalidRegistry(format!("Failed to build HTTP client: {e}")))
    }

    fn validate_registry_url(url: &str) -> Result<()> {
        let parsed = Url::parse(url)
            .map_err(|_| OdcError::InvalidRegistry(format!("Invalid registry URL: {url}")))?;

        match parsed.scheme() {
            "https" | "http" => Ok(()),
            scheme => Err(OdcError::InvalidRegistry(format!(
                "Unsupported registry scheme: {scheme}"
            ))),
        }
    }
}

#[async_trait::async_trait]
impl RegistryClient for NpmRegistry {
    async fn fetch_latest(&self, package: &str) -> Result<String> {
        let url = self.package_url(package);
        debug!(%url, "fetching package metadata");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, ABBREVIATED_METADATA)
            .send()
            .await
            .map_err(|source| OdcError::Network {
                package: package.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(OdcError::PackageNotFound(package.to_string()));
        }

        if !status.is_success() {
            warn!("registry returned status {} for {}", status, url);
            return Err(OdcError::Registry {
                package: package.to_string(),
                message: format!("unexpected status {status}"),
            });
        }

        let document: PackageDocument =
            response.json().await.map_err(|e| OdcError::Registry {
                package: package.to_string(),
                message: format!("malformed registry response: {e}"),
            })?;

        let latest = document
            .dist_tags
            .latest
            .ok_or_else(|| OdcError::Registry {
                package: package.to_string(),
                message: "no 'latest' dist-tag published".to_string(),
            })?;

        if let Err(e) = semver::Version::parse(&latest) {
            return Err(OdcError::Registry {
                package: package.to_string(),
                message: format!("'latest' dist-tag '{latest}' is not a valid version: {e}"),
            });
        }

        Ok(latest)
    }
}

#[derive(Debug, Deserialize)]
struct PackageDocument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: DistTags,
}

#[derive(Debug, Default, Deserialize)]
struct DistTags {
    latest: Option<String>,
}
