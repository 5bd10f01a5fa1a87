//! CLI entrypoint for the digital twin IDE.

#[path = "twin-ide/api.rs"]
mod api;
#[path = "twin-ide/cli.rs"]
mod cli;
#[path = "twin-ide/completions.rs"]
mod completions;
#[path = "twin-ide/generate.rs"]
mod generate;
#[path = "twin-ide/inspect.rs"]
mod inspect;
#[path = "twin-ide/serve.rs"]
mod serve;
#[path = "twin-ide/simulate.rs"]
mod simulate;
#[path = "twin-ide/style.rs"]
mod style;

use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::Parser;
use twin_runtime::config::{TwinConfig, CONFIG_FILE};

use cli::{Cli, Command};

fn main() {
    if let Err(err) = run() {
        let message = format_error_with_tip(&err);
        eprintln!("{}", style::error(format!("Error: {message}")));
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let raw_args: Vec<String> = std::env::args().collect();
    let cli = match Cli::try_parse_from(&raw_args) {
        Ok(cli) => cli,
        Err(err) => {
            if err.kind() == ErrorKind::InvalidSubcommand {
                if let Some(input) = raw_args.get(1) {
                    if let Some(suggestion) = suggest_subcommand(input) {
                        eprintln!("Did you mean: {suggestion}?");
                    }
                }
            }
            err.exit();
        }
    };
    match cli.command {
        Command::Serve {
            config,
            listen,
            root,
        } => serve::run_serve(config, listen, root, cli.verbose),
        Command::Api {
            config,
            listen,
            root,
        } => api::run_api(config, listen, root, cli.verbose),
        Command::Generate {
            svg,
            script,
            title,
            bind,
            meta,
            simulation,
            config,
            root,
        } => {
            let config = load_config(config, root)?;
            init_logging(&config.ide.log_level, cli.verbose);
            generate::run_generate(
                &config,
                &generate::GenerateArgs {
                    svg,
                    script,
                    title,
                    bind,
                    meta,
                    simulation,
                },
            )
        }
        Command::Inspect { file } => {
            init_logging("warn", cli.verbose);
            inspect::run_inspect(&file)
        }
        Command::Simulate {
            file,
            ticks,
            api,
            seed,
        } => {
            let config = load_config(None, None)?;
            init_logging("info", cli.verbose);
            let api = api.or_else(|| config.simulation.api_url.as_ref().map(ToString::to_string));
            simulate::run_simulate(&file, ticks, api.as_deref(), seed)
        }
        Command::Completions { shell } => completions::run_completions(shell),
    }
}

/// `--config` wins; otherwise `<root>/twin.toml`, falling back to defaults
/// resolved against `root`.
pub(crate) fn load_config(config: Option<PathBuf>, root: Option<PathBuf>) -> anyhow::Result<TwinConfig> {
    if let Some(path) = config {
        return Ok(TwinConfig::load(path)?);
    }
    let root = root.unwrap_or_else(|| PathBuf::from("."));
    Ok(TwinConfig::load_or_default(root.join(CONFIG_FILE))?)
}

pub(crate) fn init_logging(level: &str, verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        level.parse().unwrap_or(tracing::Level::INFO)
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn display_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

fn suggest_subcommand(input: &str) -> Option<&'static str> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let candidates = [
        "serve",
        "api",
        "generate",
        "inspect",
        "simulate",
        "completions",
    ];
    let mut best = None;
    let mut best_score = usize::MAX;
    for candidate in candidates {
        let score = levenshtein(input, candidate);
        if score < best_score {
            best_score = score;
            best = Some(candidate);
        }
    }
    if best_score <= 2 {
        best
    } else {
        None
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }
    prev[b.len()]
}

fn format_error_with_tip(err: &anyhow::Error) -> String {
    let message = err.to_string();
    let tip = if message.contains("invalid config") {
        Some("Tip: check twin.toml; every section and key is optional.")
    } else if message.contains("file not found") {
        Some("Tip: resources live in <root>/svg and <root>/scripts; see `twin-ide serve --help`.")
    } else if message.contains("Address already in use") {
        Some("Tip: pass --listen with a free port or change the listen address in twin.toml.")
    } else if message.contains("invalid binding") {
        Some("Tip: bindings are written as <id>=<script>[:<event>].")
    } else {
        None
    };
    match tip {
        Some(tip) => format!("{message}\n{tip}"),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_subcommands_are_suggested() {
        assert_eq!(suggest_subcommand("serv"), Some("serve"));
        assert_eq!(suggest_subcommand("genrate"), Some("generate"));
        assert_eq!(suggest_subcommand("xyzzy"), None);
    }
}
