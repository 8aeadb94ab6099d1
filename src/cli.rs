use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::{parse_log_level, parse_position, parse_viewport, Options};

/// Deskmate - headless desktop assistant driver
#[derive(Parser, Debug, Default)]
#[command(name = "deskmate")]
#[command(version)]
#[command(about = "Runs a desktop assistant agent on a simulated clock and prints its state", long_about = None)]
pub struct Cli {
    /// Bundled agent name (Bonzi, Clippy, F1, Genie, Genius, Links, Merlin, Peedy, Rocky, Rover)
    #[arg(short, long, value_name = "NAME")]
    pub agent: Option<String>,

    /// Directory holding <Name>/agent.json and <Name>/map.png
    #[arg(short = 'd', long, value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Load an agent.json directly instead of a bundled agent
    #[arg(long, value_name = "FILE")]
    pub agent_file: Option<PathBuf>,

    /// JSON options file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Command script file
    #[arg(short, long, value_name = "FILE")]
    pub script: Option<PathBuf>,

    /// Inline commands, e.g. "show; speak Hello there; play Wave"
    #[arg(short = 'e', long = "exec", value_name = "COMMANDS")]
    pub exec: Option<String>,

    /// Viewport size (e.g., 1024x768)
    #[arg(short, long, value_name = "WIDTHxHEIGHT")]
    pub viewport: Option<String>,

    /// Initial agent position (e.g., 100,200)
    #[arg(short, long, value_name = "X,Y")]
    pub position: Option<String>,

    /// Random seed for branch and idle selection
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Simulated run length in milliseconds
    #[arg(short = 't', long = "duration", value_name = "MS")]
    pub duration: Option<u64>,

    /// Simulated display refresh rate
    #[arg(short, long, value_name = "HZ")]
    pub refresh: Option<u32>,

    /// Log level (nothing, user, error, warning, info, debug, all)
    #[arg(short, long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Do not print state snapshots
    #[arg(short, long)]
    pub quiet: bool,

    /// Play sounds through the default audio device
    #[arg(long)]
    pub sound: bool,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref agent) = self.agent {
            opts.agent = agent.clone();
        }

        if let Some(ref assets) = self.assets {
            opts.assets_dir = assets.clone();
        }

        if let Some(ref agent_file) = self.agent_file {
            opts.agent_file = Some(agent_file.clone());
        }

        if let Some(ref script) = self.script {
            opts.script = Some(script.clone());
        }

        if let Some(ref exec) = self.exec {
            opts.commands = Some(exec.clone());
        }

        if let Some(ref viewport) = self.viewport {
            opts.viewport = parse_viewport(viewport).context("Invalid viewport format")?;
        }

        if let Some(ref position) = self.position {
            opts.position = Some(parse_position(position).context("Invalid position format")?);
        }

        if self.seed.is_some() {
            opts.seed = self.seed;
        }

        if let Some(duration) = self.duration {
            opts.duration_ms = duration;
        }

        if let Some(refresh) = self.refresh {
            if refresh == 0 {
                anyhow::bail!("Refresh rate must be positive");
            }
            opts.refresh_hz = refresh;
        }

        if let Some(ref level) = self.log_level {
            opts.log_level = parse_log_level(level)?;
        }

        if self.quiet {
            opts.print_states = false;
        }

        if self.sound {
            opts.sound = true;
        }

        Ok(opts)
    }
}
