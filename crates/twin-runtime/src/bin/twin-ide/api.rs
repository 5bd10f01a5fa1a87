//! `twin-ide api`.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use twin_runtime::api::start_api_server;
use twin_runtime::sensors::{SensorPlant, COMPONENTS};

use crate::style;

pub fn run_api(
    config: Option<PathBuf>,
    listen: Option<String>,
    root: Option<PathBuf>,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = crate::load_config(config, root)?;
    crate::init_logging(&config.ide.log_level, verbose);
    let listen = listen.unwrap_or_else(|| config.api.listen.to_string());
    let plant = Arc::new(Mutex::new(SensorPlant::new()));
    let server = start_api_server(&listen, plant)?;
    println!("{}", style::success(format!("Sensor API ready at {}", server.url)));
    println!(
        "{}",
        style::dim(format!("components: {}", COMPONENTS.join(", ")))
    );
    server.wait();
    Ok(())
}
