//! `twin-ide simulate`.

use std::path::Path;

use anyhow::Context;
use tracing::info;
use twin_runtime::feed::{CycleOutcome, HttpSource, MockSource, SimulationFeed, SnapshotSource};
use twin_runtime::Canvas;

pub fn run_simulate(file: &Path, ticks: u32, api: Option<&str>, seed: Option<u64>) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let name = file
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("input.svg");
    let mut canvas = Canvas::with_builtin();
    canvas.load_svg(name, &text)?;

    let mut source: Box<dyn SnapshotSource> = match (api, seed) {
        (Some(url), _) => Box::new(HttpSource::new(url)),
        (None, Some(seed)) => Box::new(MockSource::with_seed(seed)),
        (None, None) => Box::new(MockSource::new()),
    };
    let mut feed = SimulationFeed::new();
    for tick in 0..ticks {
        let outcome = if tick == 0 {
            feed.start(&mut canvas, source.as_mut())
        } else {
            feed.run_cycle(&mut canvas, source.as_mut())
        };
        match outcome {
            CycleOutcome::Applied { roots } => info!(tick, roots, "snapshot applied"),
            other => info!(tick, ?other, "snapshot not applied"),
        }
    }
    feed.stop();
    println!("{}", canvas.to_markup());
    Ok(())
}
