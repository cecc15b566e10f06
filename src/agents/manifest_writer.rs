use crate::agents::update::{DependencyMap, DependencySection};
use crate::error::{OdcError, Result};
use crate::utils::write_atomic;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const INTERNAL_ID_FIELD: &str = "_id";
const README_FIELD: &str = "readme";

/// A parsed package.json. Field order is kept as read.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    fields: Map<String, Value>,
}

impl Manifest {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            OdcError::InvalidManifest(msg) => {
                OdcError::InvalidManifest(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| OdcError::InvalidManifest(format!("not valid JSON: {e}")))?;

        match value {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(OdcError::InvalidManifest(
                "top-level value must be an object".to_string(),
            )),
        }
    }

    /// String-valued entries of `section`. Entries whose value is not a
    /// string are left out; the merge keeps them untouched.
    pub fn dependencies(&self, section: DependencySection) -> Result<DependencyMap> {
        let entries = match self.fields.get(section.key()) {
            None | Some(Value::Null) => return Ok(DependencyMap::new()),
            Some(Value::Object(entries)) => entries,
            Some(_) => {
                return Err(OdcError::InvalidManifest(format!(
                    "'{}' must be an object",
                    section.key()
                )));
            }
        };

        let mut dependencies = DependencyMap::new();
        for (name, value) in entries {
            match value.as_str() {
                Some(range) => {
                    dependencies.insert(name.clone(), range.to_string());
                }
                None => debug!(package = %name, section = %section, "skipping non-string range"),
            }
        }
        Ok(dependencies)
    }

    /// Build the manifest to persist: internal fields are dropped, every
    /// other field keeps its value and position, and the dependency sections
    /// are overlaid with the updated ranges.
    pub fn merge(&self, updated_deps: &DependencyMap, updated_dev_deps: &DependencyMap) -> Manifest {
        let mut fields: Map<String, Value> = self
            .fields
            .iter()
            .filter(|(key, value)| !Self::is_internal_field(key, value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self::overlay(&mut fields, DependencySection::Dependencies, updated_deps);
        Self::overlay(&mut fields, DependencySection::DevDependencies, updated_dev_deps);

        Manifest { fields }
    }

    fn is_internal_field(key: &str, value: &Value) -> bool {
        match key {
            INTERNAL_ID_FIELD => true,
            // A multi-line readme is the inlined document, not a path to one.
            README_FIELD => value.as_str().is_some_and(|readme| readme.contains('\n')),
            _ => false,
        }
    }

    fn overlay(fields: &mut Map<String, Value>, section: DependencySection, updated: &DependencyMap) {
        match fields.get_mut(section.key()) {
            Some(Value::Object(entries)) => {
                for (name, range) in updated {
                    entries.insert(name.clone(), Value::String(range.clone()));
                }
            }
            _ if updated.is_empty() => {}
            _ => {
                let entries = updated
                    .iter()
                    .map(|(name, range)| (name.clone(), Value::String(range.clone())))
                    .collect();
                fields.insert(section.key().to_string(), Value::Object(entries));
            }
        }
    }

    /// Serialize with 4-space indentation
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.fields.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| OdcError::InvalidManifest(e.to_string()))
    }
}

/// ManifestWriter persists a merged manifest back to its file
pub struct ManifestWriter {
    path: PathBuf,
}

impl ManifestWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn write(&self, manifest: &Manifest) -> Result<()> {
        let mut content = manifest.to_pretty_json()?;
        content.push('\n');
        write_atomic(&self.path, content.as_bytes())?;
        debug!(path = %self.path.display(), "manifest written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn map(entries: &[(&str, &str)]) -> DependencyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_rejects_non_object() {
        let err = Manifest::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, OdcError::InvalidManifest(_)));

        let err = Manifest::parse("{ nope").unwrap_err();
        assert!(matches!(err, OdcError::InvalidManifest(_)));
    }

    #[test]
    fn dependencies_reads_string_ranges_in_order() {
        let manifest = Manifest::parse(
            r#"{"dependencies":{"zeta":"^1.0.0","alpha":"~2.0.0","odd":{"version":"1"}}}"#,
        )
        .unwrap();

        let deps = manifest.dependencies(DependencySection::Dependencies).unwrap();
        assert_eq!(deps, map(&[("zeta", "^1.0.0"), ("alpha", "~2.0.0")]));
        let keys: Vec<_> = deps.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);

        let dev = manifest.dependencies(DependencySection::DevDependencies).unwrap();
        assert!(dev.is_empty());
    }

    #[test]
    fn dependencies_rejects_non_object_section() {
        let manifest = Manifest::parse(r#"{"dependencies":"left-pad"}"#).unwrap();
        let err = manifest
            .dependencies(DependencySection::Dependencies)
            .unwrap_err();
        assert!(matches!(err, OdcError::InvalidManifest(_)));
    }

    #[test]
    fn merge_preserves_unrelated_fields_and_order() {
        let manifest = Manifest::parse(
            r#"{"name":"app","_id":"app@1.0.0","version":"1.0.0","dependencies":{"b":"^1.0.0","a":"1.0.0"},"scripts":{"test":"jest"}}"#,
        )
        .unwrap();

        let merged = manifest.merge(&map(&[("a", "2.0.0")]), &DependencyMap::new());

        let keys: Vec<_> = merged.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "version", "dependencies", "scripts"]);

        let deps = merged.fields.get("dependencies").unwrap().as_object().unwrap();
        let dep_keys: Vec<_> = deps.keys().cloned().collect();
        assert_eq!(dep_keys, vec!["b", "a"]);
        assert_eq!(deps["a"], "2.0.0");
        assert_eq!(deps["b"], "^1.0.0");
        assert_eq!(merged.fields.get("scripts"), manifest.fields.get("scripts"));
    }

    #[test]
    fn merge_keeps_entries_the_resolver_did_not_return() {
        let manifest = Manifest::parse(
            r#"{"dependencies":{"left-pad":"^1.0.0","local":{"path":"../local"}}}"#,
        )
        .unwrap();

        let merged = manifest.merge(&map(&[("left-pad", "^1.3.0")]), &DependencyMap::new());

        let deps = merged.fields.get("dependencies").unwrap();
        assert_eq!(deps["left-pad"], "^1.3.0");
        assert_eq!(deps["local"]["path"], "../local");
    }

    #[test]
    fn merge_does_not_add_missing_sections() {
        let manifest = Manifest::parse(r#"{"dependencies":{"left-pad":"^1.0.0"}}"#).unwrap();
        let merged = manifest.merge(&map(&[("left-pad", "^1.3.0")]), &DependencyMap::new());

        assert!(merged.fields.get("devDependencies").is_none());
        assert_eq!(
            merged.to_pretty_json().unwrap(),
            "{\n    \"dependencies\": {\n        \"left-pad\": \"^1.3.0\"\n    }\n}"
        );
    }

    #[test]
    fn merge_drops_inlined_readme_only() {
        let inlined = Manifest::parse(r##"{"readme":"# app\n\nLong text"}"##).unwrap();
        let merged = inlined.merge(&DependencyMap::new(), &DependencyMap::new());
        assert!(merged.fields.get("readme").is_none());

        let path = Manifest::parse(r#"{"readme":"README.md"}"#).unwrap();
        let merged = path.merge(&DependencyMap::new(), &DependencyMap::new());
        assert_eq!(merged.fields.get("readme").unwrap(), "README.md");
    }

    #[test]
    fn writer_uses_four_space_indent_and_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("package.json");
        std::fs::write(&path, r#"{"name":"app","dependencies":{"a":"^1.0.0"}}"#).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        let merged = manifest.merge(&map(&[("a", "^1.1.0")]), &DependencyMap::new());
        ManifestWriter::new(&path).write(&merged).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\n    \"name\": \"app\",\n    \"dependencies\": {\n        \"a\": \"^1.1.0\"\n    }\n}\n"
        );
    }
}
