use crate::error::{OdcError, Result};
use regex::Regex;
use std::sync::LazyLock;

const MAX_NAME_LENGTH: usize = 214;

// Legacy packages may still carry uppercase letters, so case is not enforced.
static PACKAGE_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(?:@[A-Za-z0-9\-*~][A-Za-z0-9\-*._~]*/)?[A-Za-z0-9\-~][A-Za-z0-9\-._~]*$").ok()
});

/// Reject names the registry would never serve before spending a request on them.
pub fn validate_package_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LENGTH || name.trim() != name {
        return Err(OdcError::InvalidPackageName(name.to_string()));
    }

    match PACKAGE_NAME.as_ref() {
        Some(re) if re.is_match(name) => Ok(()),
        _ => Err(OdcError::InvalidPackageName(name.to_string())),
    }
}

/// Encode a package name for use as a registry URL path segment.
pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replacen('/', "%2F", 1)
    } else {
        name.to_string()
    }
}
