//! `twin-ide inspect`.

use std::path::Path;

use anyhow::Context;
use twin_runtime::binding::collect_bindings;
use twin_runtime::component::component_tag;
use twin_runtime::metadata::{self, METADATA_TAG};
use twin_runtime::Canvas;
use twin_svg::{Document, NodeId};

use crate::style;

fn describe(doc: &Document, element: NodeId) -> String {
    let name = doc.local_name(element).unwrap_or("?");
    match doc.attribute(element, "id") {
        Some(id) => format!("<{name}#{id}>"),
        None => format!("<{name}>"),
    }
}

pub fn run_inspect(file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("input.svg");
    let mut canvas = Canvas::default();
    let roots = canvas.load_svg(name, &text)?;
    let doc = canvas.document();

    for root in roots {
        println!("{} {}", style::accent("root"), describe(doc, root));

        println!("  {}", style::accent("components"));
        for element in doc.descendants(root) {
            let explicit = doc.has_attribute(element, "data-component");
            if element != root && !explicit {
                continue;
            }
            let tag = component_tag(doc, element);
            println!(
                "    {} {}",
                describe(doc, element),
                tag.as_deref().unwrap_or("(anonymous)")
            );
        }

        println!("  {}", style::accent("metadata"));
        for node in doc.descendants(root) {
            if doc.local_name(node) != Some(METADATA_TAG) {
                continue;
            }
            let owner = doc.parent(node).unwrap_or(root);
            let record = metadata::decode(doc, node);
            if record.is_empty() {
                println!("    {} {}", describe(doc, owner), style::dim("(empty)"));
                continue;
            }
            println!("    {}", describe(doc, owner));
            for (key, value) in record.iter() {
                println!("      {key} = {value}");
            }
        }

        println!("  {}", style::accent("bindings"));
        for (element, binding) in collect_bindings(doc, root) {
            println!(
                "    {} {} on {}",
                describe(doc, element),
                binding.script,
                binding.event
            );
        }
    }
    Ok(())
}
