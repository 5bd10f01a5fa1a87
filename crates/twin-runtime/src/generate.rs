//! Standalone interactive HTML document generation.
//!
//! Selected SVGs are embedded inline with their bindings and metadata
//! applied, followed by the selected scripts and the browser coordinator
//! that runs the binding protocol at view time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use time::OffsetDateTime;
use tracing::{info, warn};
use twin_svg::Document;

use crate::binding;
use crate::changes::ChangeQueue;
use crate::datetime::file_stamp;
use crate::error::TwinError;
use crate::metadata::{self, MetadataRecord, WriteMode};
use crate::resources::{ResourceKind, ResourceStore};

const COORDINATOR_JS: &str = include_str!("generate/coordinator.js");
const DEFAULT_TITLE: &str = "Interactive Digital Twin";
const DEFAULT_INTERVAL_MS: u64 = 3000;

/// Script binding requested for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSpec {
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateRequest {
    pub svg_files: Vec<String>,
    pub script_files: Vec<String>,
    pub title: Option<String>,
    /// Element id to script binding.
    pub bindings: IndexMap<String, BindingSpec>,
    /// Element id to metadata merged into the element before embedding.
    pub metadata: IndexMap<String, MetadataRecord>,
    pub simulation: bool,
    /// Feed polling interval of the generated document.
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub file: String,
    pub download_url: String,
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape every `</script` (any case) so a script body cannot close its tag.
fn escape_script(text: &str) -> String {
    const CLOSE: &str = "</script";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest
        .as_bytes()
        .windows(CLOSE.len())
        .position(|window| window.eq_ignore_ascii_case(CLOSE.as_bytes()))
    {
        out.push_str(&rest[..index]);
        out.push_str("<\\/");
        out.push_str(&rest[index + 2..index + CLOSE.len()]);
        rest = &rest[index + CLOSE.len()..];
    }
    out.push_str(rest);
    out
}

fn canvas_id(file: &str) -> String {
    let stem = match file.len().checked_sub(4) {
        Some(split) if file.is_char_boundary(split) && file[split..].eq_ignore_ascii_case(".svg") => {
            &file[..split]
        }
        _ => file,
    };
    format!("canvas-{stem}")
}

/// Apply requested bindings and metadata to the elements `doc` contains.
fn prepare_svg(doc: &mut Document, request: &GenerateRequest) {
    let mut changes = ChangeQueue::new();
    for (id, spec) in &request.bindings {
        if spec.script.trim().is_empty() {
            continue;
        }
        if let Some(element) = doc.find_by_id(id) {
            binding::bind(doc, element, spec.event.as_deref(), spec.script.trim());
        }
    }
    for (id, record) in &request.metadata {
        if record.is_empty() {
            continue;
        }
        if let Some(element) = doc.find_by_id(id) {
            metadata::write(doc, &mut changes, element, record, WriteMode::Merge);
        }
    }
}

fn render_svg(store: &ResourceStore, file: &str, request: &GenerateRequest) -> Result<Option<String>, TwinError> {
    let text = match store.read(ResourceKind::Svg, file) {
        Ok(text) => text,
        Err(TwinError::NotFound(_)) => {
            warn!(file, "svg file missing, skipped");
            return Ok(None);
        }
        Err(err) => return Err(err),
    };
    let mut doc = Document::parse(&text).map_err(|err| TwinError::Svg {
        file: SmolStr::new(file),
        message: err.to_string().into(),
    })?;
    prepare_svg(&mut doc, request);
    Ok(Some(format!(
        "    <div class=\"svg-canvas\" id=\"{}\">\n{}\n    </div>\n",
        escape_html(&canvas_id(file)),
        doc
    )))
}

fn render_script(store: &ResourceStore, file: &str) -> Result<Option<String>, TwinError> {
    match store.read(ResourceKind::Script, file) {
        Ok(text) => Ok(Some(format!(
            "  <script>\n// {}\n{}\n  </script>\n",
            escape_script(file),
            escape_script(&text)
        ))),
        Err(TwinError::NotFound(_)) => {
            warn!(file, "script file missing, skipped");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Render the complete standalone document.
pub fn render_document(store: &ResourceStore, request: &GenerateRequest) -> Result<String, TwinError> {
    if request.svg_files.is_empty() {
        return Err(TwinError::NoSvgSelected);
    }
    let title = request
        .title
        .as_deref()
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .unwrap_or(DEFAULT_TITLE);

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("  <meta charset=\"UTF-8\">\n");
    html.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str(&format!("  <title>{}</title>\n", escape_html(title)));
    html.push_str("  <style>\n");
    html.push_str("    body { font-family: sans-serif; margin: 0; padding: 20px; }\n");
    html.push_str("    .svg-container { display: flex; flex-wrap: wrap; gap: 20px; }\n");
    html.push_str("    .svg-canvas { border: 1px solid #ccc; padding: 10px; }\n");
    html.push_str("    [data-script] { cursor: pointer; }\n");
    html.push_str("  </style>\n</head>\n<body>\n");
    html.push_str(&format!("  <h1>{}</h1>\n", escape_html(title)));
    if request.simulation {
        html.push_str("  <button id=\"simulation-toggle\" type=\"button\">Start simulation</button>\n");
    }
    html.push_str("  <div class=\"svg-container\">\n");
    for file in &request.svg_files {
        if let Some(svg) = render_svg(store, file, request)? {
            html.push_str(&svg);
        }
    }
    html.push_str("  </div>\n");
    for file in &request.script_files {
        if let Some(script) = render_script(store, file)? {
            html.push_str(&script);
        }
    }
    if request.simulation {
        let interval = request
            .interval_ms
            .filter(|interval| *interval > 0)
            .unwrap_or(DEFAULT_INTERVAL_MS);
        html.push_str(&format!(
            "  <script>\nwindow.TWIN_SIMULATION = {{ enabled: true, interval: {interval} }};\n  </script>\n"
        ));
    }
    html.push_str("  <script>\n");
    html.push_str(COORDINATOR_JS);
    html.push_str("  </script>\n</body>\n</html>\n");
    Ok(html)
}

/// Render and store the document as `interactive-<timestamp>.html`.
pub fn write_document(store: &ResourceStore, request: &GenerateRequest) -> Result<GenerateResponse, TwinError> {
    let html = render_document(store, request)?;
    let file = format!("interactive-{}.html", file_stamp(OffsetDateTime::now_utc()));
    store.write_output(&file, &html)?;
    info!(%file, svgs = request.svg_files.len(), scripts = request.script_files.len(), "document generated");
    Ok(GenerateResponse {
        success: true,
        download_url: format!("/download/{file}"),
        file,
    })
}
