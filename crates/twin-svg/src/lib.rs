//! `twin-svg` - Owned, mutable SVG document tree.
//!
//! SVG assets are parsed once with `roxmltree` and copied into an arena of
//! nodes that can be queried and mutated in place, then serialized back to
//! markup:
//!
//! - **Document**: arena of element, text and comment nodes addressed by [`NodeId`]
//! - **Parsing**: namespace declarations are kept as plain `xmlns*` attributes
//! - **Serialization**: lossless for elements, attributes, text and comments
//!
//! # Example
//!
//! ```
//! use twin_svg::Document;
//!
//! let mut doc = Document::parse(r#"<svg id="tank"><rect id="body"/></svg>"#).unwrap();
//! let body = doc.find_by_id("body").unwrap();
//! doc.set_attribute(body, "fill", "#2196F3");
//! assert_eq!(
//!     doc.to_string(),
//!     r##"<svg id="tank"><rect id="body" fill="#2196F3"/></svg>"##
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod document;
mod parse;
mod serialize;

pub use document::{Ancestors, Descendants, Document, ElementData, NodeId, NodeKind};

use thiserror::Error;

/// The SVG namespace URI.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Errors raised while loading SVG markup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SvgError {
    /// The markup is not well-formed XML.
    #[error("malformed svg: {0}")]
    Parse(String),

    /// The markup parsed but contains no `<svg>` element.
    #[error("no <svg> element found")]
    MissingSvgRoot,
}
