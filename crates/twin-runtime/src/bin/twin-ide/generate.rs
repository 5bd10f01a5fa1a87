//! `twin-ide generate`.

use anyhow::Context;
use twin_runtime::config::TwinConfig;
use twin_runtime::generate::write_document;
use twin_runtime::resources::ResourceStore;
use twin_runtime::session::EditorSession;
use twin_runtime::TwinError;

use crate::style;

pub struct GenerateArgs {
    pub svg: Vec<String>,
    pub script: Vec<String>,
    pub title: Option<String>,
    pub bind: Vec<String>,
    pub meta: Vec<String>,
    pub simulation: bool,
}

/// `<id>=<script>[:<event>]`
fn parse_bind(text: &str) -> Result<(&str, &str, Option<&str>), TwinError> {
    let (id, target) = text
        .split_once('=')
        .ok_or_else(|| TwinError::InvalidBinding(text.into()))?;
    let (script, event) = match target.rsplit_once(':') {
        Some((script, event)) => (script, Some(event)),
        None => (target, None),
    };
    if id.trim().is_empty() || script.trim().is_empty() {
        return Err(TwinError::InvalidBinding(text.into()));
    }
    Ok((id.trim(), script.trim(), event))
}

/// `<id>.<key>=<value>`
fn parse_meta(text: &str) -> Result<(&str, &str, &str), TwinError> {
    let invalid = || TwinError::InvalidMetadata(text.into());
    let (target, value) = text.split_once('=').ok_or_else(invalid)?;
    let (id, key) = target.split_once('.').ok_or_else(invalid)?;
    if id.trim().is_empty() || key.trim().is_empty() {
        return Err(invalid());
    }
    Ok((id.trim(), key.trim(), value))
}

pub fn run_generate(config: &TwinConfig, args: &GenerateArgs) -> anyhow::Result<()> {
    let store = ResourceStore::from_config(&config.ide);
    let mut session = EditorSession::new();
    for file in &args.svg {
        session
            .add_svg(&store, file)
            .with_context(|| format!("loading {file}"))?;
    }
    for file in &args.script {
        session
            .add_script(&store, file)
            .with_context(|| format!("loading {file}"))?;
    }
    for text in &args.bind {
        let (id, script, event) = parse_bind(text)?;
        session.select_element(id)?;
        session.apply_binding(script, event)?;
    }
    for text in &args.meta {
        let (id, key, value) = parse_meta(text)?;
        session.select_element(id)?;
        session.set_metadata_field(key, value)?;
    }
    let mut request = session.generate_request(args.title.as_deref());
    request.simulation = args.simulation || config.simulation.enabled;
    request.interval_ms = u64::try_from(config.simulation.interval.as_millis()).ok();
    let response = write_document(&store, &request)?;
    let path = store.output_dir().join(&response.file);
    println!(
        "{}",
        style::success(format!("Generated {}", crate::display_path(&path)))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_arguments() {
        assert_eq!(parse_bind("tank=tank.js"), Ok(("tank", "tank.js", None)));
        assert_eq!(
            parse_bind("pump=scripts/pump.js:dblclick"),
            Ok(("pump", "scripts/pump.js", Some("dblclick")))
        );
        assert!(parse_bind("tank").is_err());
        assert!(parse_bind("=tank.js").is_err());
    }

    #[test]
    fn meta_arguments() {
        assert_eq!(parse_meta("pump.state=on"), Ok(("pump", "state", "on")));
        assert_eq!(parse_meta("tank.note=a=b"), Ok(("tank", "note", "a=b")));
        assert!(parse_meta("pump=on").is_err());
    }
}
