//! Resolution of schema-location URIs to schemas.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use super::{FsInput, SeekableInput};
use crate::error::ResolveError;
use crate::schema::Schema;

/// Loads the schema a schema-location URI points to.
pub trait SchemaResolver {
    fn resolve(&self, uri: &Url) -> Result<Schema, ResolveError>;
}

/// Resolves `file:` URIs from the local filesystem and `resource:` URIs from
/// a list of resource root directories, searched in order.
#[derive(Debug, Clone, Default)]
pub struct FsSchemaResolver {
    resource_roots: Vec<PathBuf>,
}

impl FsSchemaResolver {
    pub fn new(resource_roots: Vec<PathBuf>) -> Self {
        Self { resource_roots }
    }

    pub fn resource_roots(&self) -> &[PathBuf] {
        &self.resource_roots
    }

    fn path_for(&self, uri: &Url) -> Result<PathBuf, ResolveError> {
        match uri.scheme() {
            "file" => uri
                .to_file_path()
                .map_err(|_| ResolveError::NotFound(uri.to_string())),
            "resource" => {
                let relative = uri.path().trim_start_matches('/');
                self.resource_roots
                    .iter()
                    .map(|root| root.join(relative))
                    .find(|candidate| candidate.is_file())
                    .ok_or_else(|| ResolveError::NotFound(uri.to_string()))
            }
            other => Err(ResolveError::UnsupportedScheme {
                scheme: other.to_string(),
                uri: uri.to_string(),
            }),
        }
    }
}

impl SchemaResolver for FsSchemaResolver {
    fn resolve(&self, uri: &Url) -> Result<Schema, ResolveError> {
        let path = self.path_for(uri)?;
        debug!(%uri, path = %path.display(), "resolving schema");
        let bytes = read_file(&path).map_err(|source| ResolveError::Io {
            uri: uri.to_string(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|e| ResolveError::Parse {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        Schema::parse_str(&text).map_err(|e| ResolveError::Parse {
            uri: uri.to_string(),
            reason: e.to_string(),
        })
    }
}

fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut input = FsInput::open(path)?;
    let bytes = input.read_all()?;
    input.close()?;
    Ok(bytes)
}

/// A fixed URI-to-schema map.
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaResolver {
    schemas: HashMap<Url, Schema>,
}

impl StaticSchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, uri: Url, schema: Schema) -> Self {
        self.schemas.insert(uri, schema);
        self
    }

    pub fn insert(&mut self, uri: Url, schema: Schema) {
        self.schemas.insert(uri, schema);
    }
}

impl SchemaResolver for StaticSchemaResolver {
    fn resolve(&self, uri: &Url) -> Result<Schema, ResolveError> {
        self.schemas
            .get(uri)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(uri.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const SCHEMA: &str = r#"{"type": "record", "name": "R", "fields": [{"name": "id", "type": "long"}]}"#;

    #[test]
    fn test_resource_uri() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("schema")).unwrap();
        fs::write(dir.path().join("schema/r.avsc"), SCHEMA).unwrap();

        let resolver = FsSchemaResolver::new(vec![dir.path().to_path_buf()]);
        let schema = resolver
            .resolve(&Url::parse("resource:schema/r.avsc").unwrap())
            .unwrap();
        assert_eq!(schema.as_record().unwrap().name, "R");
    }

    #[test]
    fn test_resource_roots_searched_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(second.path().join("r.avsc"), SCHEMA).unwrap();

        let resolver = FsSchemaResolver::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert!(resolver.resolve(&Url::parse("resource:r.avsc").unwrap()).is_ok());
    }

    #[test]
    fn test_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.avsc");
        fs::write(&path, SCHEMA).unwrap();

        let resolver = FsSchemaResolver::default();
        let uri = Url::from_file_path(&path).unwrap();
        assert!(resolver.resolve(&uri).is_ok());
    }

    #[test]
    fn test_missing_resource() {
        let resolver = FsSchemaResolver::new(vec![PathBuf::from("/nonexistent")]);
        let err = resolver
            .resolve(&Url::parse("resource:nope.avsc").unwrap())
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(_)));
    }

    #[test]
    fn test_unsupported_scheme() {
        let err = FsSchemaResolver::default()
            .resolve(&Url::parse("hdfs://namenode/schemas/r.avsc").unwrap())
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedScheme { ref scheme, .. } if scheme == "hdfs"));
    }

    #[test]
    fn test_malformed_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.avsc"), "{\"type\": \"record\"").unwrap();
        let resolver = FsSchemaResolver::new(vec![dir.path().to_path_buf()]);
        let err = resolver
            .resolve(&Url::parse("resource:bad.avsc").unwrap())
            .unwrap_err();
        assert!(matches!(err, ResolveError::Parse { .. }));
    }

    #[test]
    fn test_static_resolver() {
        let uri = Url::parse("resource:s.avsc").unwrap();
        let resolver = StaticSchemaResolver::new().with(uri.clone(), Schema::Long);
        assert_eq!(resolver.resolve(&uri).unwrap(), Schema::Long);
        assert!(resolver.resolve(&Url::parse("resource:other").unwrap()).is_err());
    }
}
