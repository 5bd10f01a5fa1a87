//! CLI definitions for twin-ide.

use clap::{ArgAction, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "twin-ide",
    version,
    about = "Digital twin interactions IDE",
    infer_subcommands = true,
    after_help = "Examples:\n  twin-ide serve                          # editor at http://127.0.0.1:6000\n  twin-ide api                            # mock sensor API\n  twin-ide generate --svg tank.svg --script tank.js --bind tank=tank.js\n  twin-ide simulate tank.svg --ticks 5"
)]
pub struct Cli {
    /// Show debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the editor and the resource folders.
    Serve {
        /// Configuration file (defaults to <root>/twin.toml).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Listen address override (host:port).
        #[arg(long)]
        listen: Option<String>,
        /// Project root holding twin.toml and the resource folders.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Serve the mock sensor API.
    Api {
        /// Configuration file (defaults to <root>/twin.toml).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Listen address override (host:port).
        #[arg(long)]
        listen: Option<String>,
        /// Project root holding twin.toml.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Generate a standalone interactive document.
    #[command(
        after_help = "Examples:\n  twin-ide generate --svg tank.svg --script tank.js --bind tank=tank.js\n  twin-ide generate --svg pump.svg --bind pump=pump.js:dblclick --meta pump.state=on --simulation"
    )]
    Generate {
        /// SVG files to embed, in order.
        #[arg(long = "svg", required = true)]
        svg: Vec<String>,
        /// Script files to embed, in order.
        #[arg(long = "script")]
        script: Vec<String>,
        /// Document title.
        #[arg(long)]
        title: Option<String>,
        /// Bind an element: <id>=<script>[:<event>].
        #[arg(long = "bind")]
        bind: Vec<String>,
        /// Set element metadata: <id>.<key>=<value>.
        #[arg(long = "meta")]
        meta: Vec<String>,
        /// Include the simulation toggle.
        #[arg(long, action = ArgAction::SetTrue)]
        simulation: bool,
        /// Configuration file (defaults to <root>/twin.toml).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Project root holding twin.toml and the resource folders.
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Print the components, metadata and bindings of an SVG file.
    Inspect {
        /// SVG file path.
        file: PathBuf,
    },
    /// Run feed cycles against an SVG with the built-in components and print the result.
    Simulate {
        /// SVG file path.
        file: PathBuf,
        /// Number of feed cycles.
        #[arg(long, default_value = "1")]
        ticks: u32,
        /// Sensor API base URL (defaults to `simulation.api_url` in twin.toml, else the local mock generator).
        #[arg(long)]
        api: Option<String>,
        /// Seed for the mock generator.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}
