//! Runtime errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by configuration, resource, generation and session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TwinError {
    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// Resource type outside `svg` / `script`.
    #[error("invalid resource type '{0}'")]
    InvalidResourceType(SmolStr),

    /// File name that is empty, has the wrong extension or escapes its directory.
    #[error("invalid file name '{0}'")]
    InvalidFileName(SmolStr),

    /// Requested file does not exist.
    #[error("file not found '{0}'")]
    NotFound(SmolStr),

    /// Filesystem failure.
    #[error("i/o error '{0}'")]
    Io(SmolStr),

    /// SVG markup could not be loaded.
    #[error("svg error in '{file}': {message}")]
    Svg { file: SmolStr, message: SmolStr },

    /// Generation requested without any SVG file.
    #[error("no SVG files selected")]
    NoSvgSelected,

    /// File already part of the editing session.
    #[error("{kind} file {name} is already selected")]
    AlreadySelected { kind: SmolStr, name: SmolStr },

    /// Editing operation requires a selected element.
    #[error("no element selected")]
    NoElementSelected,

    /// Element id not present on the canvas.
    #[error("unknown element '{0}'")]
    UnknownElement(SmolStr),

    /// Metadata JSON could not be applied.
    #[error("invalid metadata '{0}'")]
    InvalidMetadata(SmolStr),

    /// Binding is missing its script or event.
    #[error("invalid binding '{0}'")]
    InvalidBinding(SmolStr),

    /// Sensor component not present in the plant.
    #[error("component {0} not found")]
    UnknownComponent(SmolStr),

    /// Control update value has the wrong shape.
    #[error("invalid control for {component}: {message}")]
    InvalidControl { component: SmolStr, message: SmolStr },

    /// HTTP server could not start.
    #[error("server error '{0}'")]
    Server(SmolStr),
}

impl From<std::io::Error> for TwinError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string().into())
    }
}
