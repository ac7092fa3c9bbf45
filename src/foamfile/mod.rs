//! The dictionary document: one solver input file as an ordered key/value
//! structure layered over an immutable default template.

mod writer;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{FoamError, Result};
use crate::parsing::{parse_foam_text, ParsedFoamFile};
use crate::types::foam_value::{FoamDict, FoamValue};

use writer::{write_foam_file, HeaderFields};

/// What `save` did with the target file.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// The file already existed and overwriting was not requested.
    Skipped,
}

/// Layers `overrides` over `defaults`.
///
/// A non-empty override wins; empty overrides fall back to the default.
/// Template keys come first in template order, followed by override-only
/// keys in insertion order.
pub fn merge_values(defaults: &FoamDict, overrides: &FoamDict) -> FoamDict {
    let mut merged = FoamDict::with_capacity(defaults.len() + overrides.len());
    for (key, default) in defaults {
        let value = match overrides.get(key) {
            Some(value) if !value.is_empty() => value.clone(),
            _ => default.clone(),
        };
        merged.insert(key.clone(), value);
    }
    for (key, value) in overrides {
        if !defaults.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

#[derive(Debug, Clone)]
pub struct FoamFile {
    name: String,
    class: String,
    location: String,
    default_values: Arc<FoamDict>,
    values: FoamDict,
}

impl FoamFile {
    pub fn new(
        name: impl Into<String>,
        class: impl Into<String>,
        location: impl Into<String>,
        default_values: Arc<FoamDict>,
        values: FoamDict,
    ) -> Self {
        FoamFile {
            name: name.into(),
            class: class.into(),
            location: location.into(),
            default_values,
            values,
        }
    }

    /// A document with no template, typically one read from disk.
    pub fn without_defaults(
        name: impl Into<String>,
        class: impl Into<String>,
        location: impl Into<String>,
        values: FoamDict,
    ) -> Self {
        Self::new(name, class, location, Arc::new(FoamDict::new()), values)
    }

    /// Reads any dictionary file. The header is required since it names the document.
    pub fn from_file(path: &Path) -> Result<Self> {
        let parsed = read_parsed(path)?;
        Self::from_parsed(path, parsed, None, Arc::new(FoamDict::new()))
    }

    /// Reads a dictionary that must declare `expected_class`, layering it over `default_values`.
    pub fn from_file_as(
        path: &Path,
        expected_class: &str,
        default_values: Arc<FoamDict>,
    ) -> Result<Self> {
        let parsed = read_parsed(path)?;
        Self::from_parsed(path, parsed, Some(expected_class), default_values)
    }

    fn from_parsed(
        path: &Path,
        parsed: ParsedFoamFile,
        expected_class: Option<&str>,
        default_values: Arc<FoamDict>,
    ) -> Result<Self> {
        let source_name = path.display().to_string();
        let header = parsed.header.ok_or_else(|| FoamError::Parse {
            source_name: source_name.clone(),
            line: 1,
            message: "missing FoamFile header".to_string(),
        })?;
        if let Some(expected) = expected_class {
            if header.class != expected {
                return Err(FoamError::Parse {
                    source_name,
                    line: 1,
                    message: format!("expected class {}, found {}", expected, header.class),
                });
            }
        }
        let location = header.location.unwrap_or_else(|| {
            path.parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let name = if header.object.is_empty() {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        } else {
            header.object
        };
        Ok(FoamFile::new(name, header.class, location, default_values, parsed.values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn default_values(&self) -> &FoamDict {
        &self.default_values
    }

    /// Caller-supplied overrides only.
    pub fn values(&self) -> &FoamDict {
        &self.values
    }

    pub fn effective_value(&self, key: &str) -> Option<&FoamValue> {
        match self.values.get(key) {
            Some(value) if !value.is_empty() => Some(value),
            _ => self.default_values.get(key).or_else(|| self.values.get(key)),
        }
    }

    pub fn require(&self, key: &str) -> Result<&FoamValue> {
        self.effective_value(key).ok_or_else(|| FoamError::KeyNotFound {
            file: self.name.clone(),
            key: key.to_string(),
        })
    }

    pub fn effective_values(&self) -> FoamDict {
        merge_values(&self.default_values, &self.values)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FoamValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Edits a sub-dictionary, starting from its current effective content.
    pub fn update_block(&mut self, key: &str, edit: impl FnOnce(&mut FoamDict)) {
        let mut block = self
            .effective_value(key)
            .and_then(|v| v.as_dict())
            .cloned()
            .unwrap_or_default();
        edit(&mut block);
        self.values.insert(key.to_string(), FoamValue::Dict(block));
    }

    /// Canonical text form of the document.
    pub fn to_foam_string(&self) -> String {
        write_foam_file(
            &HeaderFields {
                class: &self.class,
                location: &self.location,
                object: &self.name,
            },
            &self.effective_values(),
        )
    }

    pub fn file_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.location).join(&self.name)
    }

    /// Writes the document to `<project_dir>/<location>/<name>`.
    ///
    /// An existing file is left alone unless `overwrite` is set, in which case
    /// it is always rewritten.
    pub fn save(&self, project_dir: &Path, overwrite: bool) -> Result<SaveOutcome> {
        let path = self.file_path(project_dir);
        if path.exists() && !overwrite {
            debug!(path = %path.display(), "file exists, not overwriting");
            return Ok(SaveOutcome::Skipped);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FoamError::io(parent, e))?;
        }
        fs::write(&path, self.to_foam_string()).map_err(|e| FoamError::io(&path, e))?;
        info!(path = %path.display(), "wrote {}", self.name);
        Ok(SaveOutcome::Written)
    }
}

fn read_parsed(path: &Path) -> Result<ParsedFoamFile> {
    let content = fs::read_to_string(path).map_err(|e| FoamError::io(path, e))?;
    parse_foam_text(&path.display().to_string(), &content)
}

impl PartialEq for FoamFile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.class == other.class
            && self.location == other.location
            && self.effective_values() == other.effective_values()
    }
}

impl fmt::Display for FoamFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_foam_string())
    }
}
