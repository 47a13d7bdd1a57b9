mod layout;
mod simulate;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::PathBuf;

use kibo_core::KeyMap;

#[derive(Parser)]
#[command(name = "kibo-cli")]
#[command(about = "Host tools for the Kibo split keyboard")]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render both halves and every layer of the keymap as HTML/SVG
    Layout {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run both halves against a script of switch presses and print the
    /// HID reports the host would receive
    Simulate {
        /// Script file: `hold <left|right> <switch> <frames>`, `idle <frames>`
        script: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        Command::Layout { output } => {
            let html = layout::generate_html(&KeyMap::DEFAULT);
            match output {
                Some(path) => {
                    fs::write(&path, html)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!("layout written to {}", path.display());
                }
                None => print!("{html}"),
            }
        }
        Command::Simulate { script } => {
            let contents = fs::read_to_string(&script)
                .with_context(|| format!("reading {}", script.display()))?;
            let steps = simulate::parse_script(&contents)
                .with_context(|| format!("parsing {}", script.display()))?;

            let mut sim = simulate::Simulation::new(&KeyMap::DEFAULT);
            sim.run(&steps);

            for recorded in sim.reports() {
                println!("{recorded}");
            }
            info!(
                "{} reports over {} frames",
                sim.reports().len(),
                sim.frame_count()
            );
        }
    }

    Ok(())
}
