use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::{InstallError, InstallReport, Installer};
use crate::schema::{SchemaError, Validator};

/// Manifest path used when none is given on the command line.
pub const DEFAULT_MANIFEST: &str = "gofile.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageEntry {
    pub url: String,
}

/// The packages listed in a gofile, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManifest {
    packages: Vec<PackageEntry>,
    debug: bool,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("yaml: {0}")]
    Syntax(#[source] serde_yaml::Error),
    #[error("yaml document has no json representation: {0}")]
    Conversion(#[source] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("decoding validated manifest: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("open {}: {source}", .path.display())]
    SourceNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("encoding manifest: {0}")]
    Encode(#[source] serde_yaml::Error),
}

impl PackageManifest {
    pub fn new(packages: Vec<PackageEntry>, debug: bool) -> Self {
        Self { packages, debug }
    }

    /// Decode a YAML manifest with the built-in package schema.
    pub fn decode(data: &[u8], debug: bool) -> Result<Self, ManifestError> {
        Self::decode_with(&Validator::default(), data, debug)
    }

    /// Decode a YAML manifest in three stages: YAML into a generic document,
    /// schema validation of that document, then the typed entry list.
    ///
    /// Only the first document of a multi-document stream is read; an empty
    /// stream is treated as a null document.
    pub fn decode_with(
        validator: &Validator,
        data: &[u8],
        debug: bool,
    ) -> Result<Self, ManifestError> {
        let yaml = match serde_yaml::Deserializer::from_slice(data).next() {
            Some(document) => {
                serde_yaml::Value::deserialize(document).map_err(ManifestError::Syntax)?
            }
            None => serde_yaml::Value::Null,
        };
        let document = serde_json::to_value(yaml).map_err(ManifestError::Conversion)?;

        validator.validate(&document)?;

        let packages: Vec<PackageEntry> =
            serde_json::from_value(document).map_err(ManifestError::Decode)?;
        tracing::debug!(count = packages.len(), "decoded manifest");

        Ok(Self { packages, debug })
    }

    pub fn decode_from_source(path: &Path, debug: bool) -> Result<Self, ManifestError> {
        let data = fs::read(path).map_err(|source| ManifestError::SourceNotFound {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "read manifest");
        Self::decode(&data, debug)
    }

    pub fn to_yaml(&self) -> Result<String, ManifestError> {
        serde_yaml::to_string(&self.packages).map_err(ManifestError::Encode)
    }

    pub fn packages(&self) -> &[PackageEntry] {
        &self.packages
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Install every package with `go get`, stopping at the first failure.
    pub fn install(&self) -> Result<InstallReport, InstallError> {
        Installer::for_manifest(self).install(self)
    }
}
