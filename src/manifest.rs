use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Package whose version can be forced after ejecting.
pub const REACT_NATIVE_PACKAGE: &str = "react-native";

/// A `package.json` document. Key order is preserved through load and save.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
    root: Map<String, Value>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read package.json file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse package.json file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("package.json at {0} is not a JSON object")]
    NotAnObject(PathBuf),
    #[error("package.json has no \"dependencies\" object")]
    MissingDependencies,
    #[error("\"dependencies\" in package.json is not an object")]
    DependenciesNotObject,
    #[error("failed to serialize modified package.json file: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write modified package.json file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackageManifest {
    pub fn parse(path: &Path, data: &str) -> Result<Self, ManifestError> {
        let value: Value = serde_json::from_str(data).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        match value {
            Value::Object(root) => Ok(Self { root }),
            _ => Err(ManifestError::NotAnObject(path.to_path_buf())),
        }
    }

    pub fn dependency_version(&self, package: &str) -> Option<&str> {
        self.root
            .get("dependencies")
            .and_then(Value::as_object)
            .and_then(|deps| deps.get(package))
            .and_then(Value::as_str)
    }

    /// Two-space indented JSON with a trailing newline.
    pub fn to_pretty_string(&self) -> Result<String, ManifestError> {
        let mut data = serde_json::to_string_pretty(&self.root).map_err(ManifestError::Serialize)?;
        data.push('\n');
        Ok(data)
    }
}

pub fn load_manifest(path: &Path) -> Result<PackageManifest, ManifestError> {
    let data = fs::read_to_string(path).map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    PackageManifest::parse(path, &data)
}

/// Overwrites (or inserts) `package` under `"dependencies"`.
///
/// An existing key keeps its position; a new key is appended.
pub fn set_dependency_version(
    mut manifest: PackageManifest,
    package: &str,
    version: &str,
) -> Result<PackageManifest, ManifestError> {
    let deps = match manifest.root.get_mut("dependencies") {
        None => return Err(ManifestError::MissingDependencies),
        Some(Value::Object(deps)) => deps,
        Some(_) => return Err(ManifestError::DependenciesNotObject),
    };

    deps.insert(package.to_string(), Value::String(version.to_string()));
    Ok(manifest)
}

/// Writes through a sibling temp file so the manifest is never left half-written.
pub fn save_manifest(manifest: &PackageManifest, path: &Path) -> Result<(), ManifestError> {
    let data = manifest.to_pretty_string()?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, data).map_err(|source| ManifestError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| ManifestError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "name": "demo-app",
  "version": "1.0.0",
  "private": true,
  "main": "node_modules/expo/AppEntry.js",
  "scripts": {
    "start": "expo start",
    "android": "expo start --android"
  },
  "dependencies": {
    "expo": "^35.0.0",
    "react": "16.8.3",
    "react-native": "https://github.com/expo/react-native/archive/sdk-35.0.0.tar.gz",
    "react-native-web": "^0.11.7"
  },
  "devDependencies": {
    "babel-preset-expo": "^7.0.0"
  },
  "jest": {
    "testTimeout": 5000,
    "verbose": false
  }
}
"#;

    fn write_sample(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("package.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn override_changes_only_the_target_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, SAMPLE);

        let manifest = load_manifest(&path).expect("sample should load");
        let updated = set_dependency_version(manifest, REACT_NATIVE_PACKAGE, "0.64.0")
            .expect("dependencies present");
        save_manifest(&updated, &path).expect("save should succeed");

        let reloaded = fs::read_to_string(&path).unwrap();
        let expected = SAMPLE.replace(
            "https://github.com/expo/react-native/archive/sdk-35.0.0.tar.gz",
            "0.64.0",
        );
        assert_eq!(reloaded, expected);
        assert!(!dir.path().join("package.json.tmp").exists());
    }

    #[test]
    fn untouched_values_keep_their_types() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, SAMPLE);

        let manifest = load_manifest(&path).unwrap();
        let updated = set_dependency_version(manifest, REACT_NATIVE_PACKAGE, "0.64.0").unwrap();
        save_manifest(&updated, &path).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["private"], Value::Bool(true));
        assert_eq!(value["jest"]["testTimeout"], Value::from(5000));
        assert_eq!(value["jest"]["verbose"], Value::Bool(false));
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["name", "version", "private", "main", "scripts", "dependencies", "devDependencies", "jest"]
        );
    }

    #[test]
    fn numeric_literals_keep_their_exact_text() {
        let dir = tempfile::tempdir().unwrap();
        let original = r#"{
  "dependencies": {
    "react-native": "0.59.8"
  },
  "config": {
    "big": 12345678901234567890123,
    "ratio": 1e3,
    "scale": 1.50
  }
}
"#;
        let path = write_sample(&dir, original);

        let manifest = load_manifest(&path).unwrap();
        let updated = set_dependency_version(manifest, REACT_NATIVE_PACKAGE, "0.64.0").unwrap();
        save_manifest(&updated, &path).unwrap();

        let reloaded = fs::read_to_string(&path).unwrap();
        assert_eq!(reloaded, original.replace("0.59.8", "0.64.0"));
    }

    #[test]
    fn inserts_missing_package_at_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, r#"{"dependencies": {"expo": "^35.0.0"}}"#);

        let manifest = load_manifest(&path).unwrap();
        let updated = set_dependency_version(manifest, REACT_NATIVE_PACKAGE, "0.64.0").unwrap();
        assert_eq!(updated.dependency_version(REACT_NATIVE_PACKAGE), Some("0.64.0"));
        assert_eq!(updated.dependency_version("expo"), Some("^35.0.0"));
    }

    #[test]
    fn missing_dependencies_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, r#"{"name": "demo"}"#);

        let manifest = load_manifest(&path).unwrap();
        let err = set_dependency_version(manifest, REACT_NATIVE_PACKAGE, "0.64.0")
            .expect_err("no dependencies object");
        assert!(matches!(err, ManifestError::MissingDependencies));
    }

    #[test]
    fn non_object_dependencies_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir, r#"{"dependencies": ["react-native"]}"#);

        let manifest = load_manifest(&path).unwrap();
        let err = set_dependency_version(manifest, REACT_NATIVE_PACKAGE, "0.64.0")
            .expect_err("dependencies is an array");
        assert!(matches!(err, ManifestError::DependenciesNotObject));
    }

    #[test]
    fn surfaces_read_and_parse_failures() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("package.json");
        assert!(matches!(
            load_manifest(&missing),
            Err(ManifestError::Read { .. })
        ));

        let path = write_sample(&dir, "{ not json");
        let err = load_manifest(&path).expect_err("invalid json");
        assert!(matches!(err, ManifestError::Parse { .. }));
        assert!(err.to_string().contains("failed to parse package.json"));

        let path = write_sample(&dir, "[1, 2]");
        assert!(matches!(
            load_manifest(&path),
            Err(ManifestError::NotAnObject(_))
        ));
    }
}
