//! `twin-ide serve`.

use std::path::PathBuf;

use twin_runtime::resources::ResourceStore;
use twin_runtime::web::start_web_server;

use crate::style;

pub fn run_serve(
    config: Option<PathBuf>,
    listen: Option<String>,
    root: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = crate::load_config(config, root)?;
    crate::init_logging(&config.ide.log_level, verbose);
    let listen = listen.unwrap_or_else(|| config.ide.listen.to_string());
    let store = ResourceStore::from_config(&config.ide);
    let server = start_web_server(&listen, store)?;
    println!("{}", style::success(format!("IDE ready at {}", server.url)));
    println!(
        "{}",
        style::dim(format!(
            "resources: {}  output: {}",
            crate::display_path(&config.ide.resources),
            crate::display_path(&config.ide.output)
        ))
    );
    server.wait();
    Ok(())
}
