//! On-disk resource folders: SVG graphics, scripts, generated documents
//! and bundled examples.

use std::path::{Path, PathBuf};

use serde::Serialize;
use smol_str::SmolStr;
use tracing::debug;

use crate::config::IdeConfig;
use crate::error::TwinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Svg,
    Script,
}

impl ResourceKind {
    pub fn parse(text: &str) -> Result<Self, TwinError> {
        match text {
            "svg" => Ok(Self::Svg),
            "script" => Ok(Self::Script),
            _ => Err(TwinError::InvalidResourceType(text.into())),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Script => "script",
        }
    }

    fn folder(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Script => "scripts",
        }
    }

    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Script => "js",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceListing {
    pub svg_files: Vec<String>,
    pub script_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ResourceStore {
    resources: PathBuf,
    output: PathBuf,
    examples: PathBuf,
}

fn has_extension(name: &str, extension: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// A plain file name: no separators, no parent references, no hidden files.
pub fn validate_name(name: &str, extension: Option<&str>) -> Result<(), TwinError> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0'])
        || name.contains("..");
    if invalid {
        return Err(TwinError::InvalidFileName(name.into()));
    }
    if let Some(extension) = extension {
        if !has_extension(name, extension) {
            return Err(TwinError::InvalidFileName(name.into()));
        }
    }
    Ok(())
}

/// Canonical path of `name` inside `dir`; fails if it escapes `dir` or is missing.
fn existing_inside(dir: &Path, name: &str) -> Result<PathBuf, TwinError> {
    let dir = dir
        .canonicalize()
        .map_err(|_| TwinError::NotFound(SmolStr::new(name)))?;
    let requested = dir
        .join(name)
        .canonicalize()
        .map_err(|_| TwinError::NotFound(SmolStr::new(name)))?;
    if !requested.starts_with(&dir) || !requested.is_file() {
        return Err(TwinError::NotFound(SmolStr::new(name)));
    }
    Ok(requested)
}

fn list_dir(dir: &Path, extension: &str) -> Vec<String> {
    let mut list = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return list;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|v| v.to_str()) {
            if has_extension(name, extension) && !name.starts_with('.') {
                list.push(name.to_string());
            }
        }
    }
    list.sort();
    list
}

impl ResourceStore {
    pub fn new(resources: impl Into<PathBuf>, output: impl Into<PathBuf>, examples: impl Into<PathBuf>) -> Self {
        Self {
            resources: resources.into(),
            output: output.into(),
            examples: examples.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &IdeConfig) -> Self {
        Self::new(&config.resources, &config.output, &config.examples)
    }

    /// Create the resource and output folders if they do not exist.
    pub fn ensure_dirs(&self) -> Result<(), TwinError> {
        for dir in [
            self.dir(ResourceKind::Svg),
            self.dir(ResourceKind::Script),
            self.output.clone(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn dir(&self, kind: ResourceKind) -> PathBuf {
        self.resources.join(kind.folder())
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    #[must_use]
    pub fn list(&self, kind: ResourceKind) -> Vec<String> {
        list_dir(&self.dir(kind), kind.extension())
    }

    #[must_use]
    pub fn listing(&self) -> ResourceListing {
        ResourceListing {
            svg_files: self.list(ResourceKind::Svg),
            script_files: self.list(ResourceKind::Script),
        }
    }

    pub fn read(&self, kind: ResourceKind, name: &str) -> Result<String, TwinError> {
        validate_name(name, None)?;
        let path = existing_inside(&self.dir(kind), name)?;
        Ok(std::fs::read_to_string(path)?)
    }

    /// Store a new resource, replacing any file of the same name.
    pub fn upload(&self, kind: ResourceKind, name: &str, content: &str) -> Result<PathBuf, TwinError> {
        validate_name(name, Some(kind.extension()))?;
        let dir = self.dir(kind);
        std::fs::create_dir_all(&dir)?;
        let path = dir.canonicalize()?.join(name);
        std::fs::write(&path, content)?;
        debug!(kind = kind.as_str(), name, "resource stored");
        Ok(path)
    }

    /// Overwrite an existing resource.
    pub fn save(&self, kind: ResourceKind, name: &str, content: &str) -> Result<PathBuf, TwinError> {
        validate_name(name, Some(kind.extension()))?;
        let path = existing_inside(&self.dir(kind), name)?;
        std::fs::write(&path, content)?;
        debug!(kind = kind.as_str(), name, "resource saved");
        Ok(path)
    }

    pub fn write_output(&self, name: &str, content: &str) -> Result<PathBuf, TwinError> {
        validate_name(name, Some("html"))?;
        std::fs::create_dir_all(&self.output)?;
        let path = self.output.canonicalize()?.join(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn read_output(&self, name: &str) -> Result<String, TwinError> {
        validate_name(name, None)?;
        let path = existing_inside(&self.output, name)?;
        Ok(std::fs::read_to_string(path)?)
    }

    pub fn read_example(&self, name: &str) -> Result<String, TwinError> {
        validate_name(name, None)?;
        let path = existing_inside(&self.examples, name)?;
        Ok(std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_must_be_plain() {
        assert!(validate_name("tank.svg", Some("svg")).is_ok());
        assert!(validate_name("Tank.SVG", Some("svg")).is_ok());
        for bad in ["", "../x.svg", "a/b.svg", "a\\b.svg", ".hidden.svg", "x..svg"] {
            assert_eq!(
                validate_name(bad, Some("svg")),
                Err(TwinError::InvalidFileName(bad.into())),
                "{bad}"
            );
        }
        assert!(validate_name("tank.js", Some("svg")).is_err());
    }

    #[test]
    fn resource_types() {
        assert_eq!(ResourceKind::parse("svg"), Ok(ResourceKind::Svg));
        assert_eq!(ResourceKind::parse("script"), Ok(ResourceKind::Script));
        assert_eq!(
            ResourceKind::parse("image"),
            Err(TwinError::InvalidResourceType("image".into()))
        );
    }
}
