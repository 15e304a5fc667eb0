//! Known face encodings: the labeled gallery loaded once at startup.
//!
//! On disk this is a JSON document with two parallel arrays:
//!
//! ```json
//! { "encodings": [[0.01, -0.2, ...], ...], "names": ["alice", ...] }
//! ```

use crate::types::Embedding;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KnownFacesError {
    #[error("cannot read encodings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid encodings file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("encodings file has {encodings} encodings but {names} names")]
    LengthMismatch { encodings: usize, names: usize },
    #[error("encoding {index} has {actual} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct EncodingsFile {
    encodings: Vec<Embedding>,
    names: Vec<String>,
}

/// Immutable list of `(encoding, name)` pairs, in file order.
#[derive(Debug, Clone, Default)]
pub struct KnownFaceSet {
    encodings: Vec<Embedding>,
    names: Vec<String>,
}

impl KnownFaceSet {
    /// Build a set from parallel vectors, checking lengths and dimensions.
    pub fn new(encodings: Vec<Embedding>, names: Vec<String>) -> Result<Self, KnownFacesError> {
        if encodings.len() != names.len() {
            return Err(KnownFacesError::LengthMismatch {
                encodings: encodings.len(),
                names: names.len(),
            });
        }
        if let Some(first) = encodings.first() {
            let expected = first.dim();
            if let Some((index, bad)) = encodings.iter().enumerate().find(|(_, e)| e.dim() != expected) {
                return Err(KnownFacesError::DimensionMismatch {
                    index,
                    expected,
                    actual: bad.dim(),
                });
            }
        }
        Ok(Self { encodings, names })
    }

    pub fn load(path: &Path) -> Result<Self, KnownFacesError> {
        let path_display = path.display().to_string();
        let raw = fs::read(path).map_err(|source| KnownFacesError::Io {
            path: path_display.clone(),
            source,
        })?;
        let file: EncodingsFile = serde_json::from_slice(&raw).map_err(|source| KnownFacesError::Parse {
            path: path_display.clone(),
            source,
        })?;
        let set = Self::new(file.encodings, file.names)?;

        tracing::info!(
            path = %path_display,
            entries = set.len(),
            identities = set.identity_counts().len(),
            dim = set.dim().unwrap_or(0),
            "loaded known face encodings"
        );
        Ok(set)
    }

    pub fn save(&self, path: &Path) -> Result<(), KnownFacesError> {
        let display = path.display().to_string();
        let file = EncodingsFile {
            encodings: self.encodings.clone(),
            names: self.names.clone(),
        };
        let json = serde_json::to_vec(&file).map_err(|source| KnownFacesError::Parse {
            path: display.clone(),
            source,
        })?;
        fs::write(path, json).map_err(|source| KnownFacesError::Io { path: display, source })
    }

    pub fn encodings(&self) -> &[Embedding] {
        &self.encodings
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.encodings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encodings.is_empty()
    }

    /// Embedding dimension, or `None` for an empty set.
    pub fn dim(&self) -> Option<usize> {
        self.encodings.first().map(Embedding::dim)
    }

    /// Number of encodings per name, sorted by name.
    pub fn identity_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for name in &self.names {
            *counts.entry(name.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Accumulates `(encoding, name)` pairs for [`KnownFaceSet`] generation.
#[derive(Debug, Default)]
pub struct KnownFaceSetBuilder {
    encodings: Vec<Embedding>,
    names: Vec<String>,
}

impl KnownFaceSetBuilder {
    pub fn push(&mut self, encoding: Embedding, name: impl Into<String>) {
        self.encodings.push(encoding);
        self.names.push(name.into());
    }

    pub fn build(self) -> Result<KnownFaceSet, KnownFacesError> {
        KnownFaceSet::new(self.encodings, self.names)
    }
}
