use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use deskmate::assets::{resolve, DirectoryAssets};
use deskmate::config::{self, Options};
use deskmate::engine::{Agent, AgentConfig, AgentState};
use deskmate::script::{parse_script, run_script, Command};
use deskmate::{log_debug, log_info, log_warning, logging, Cli};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Options file first, then CLI overrides
    let options = config::load_config(cli.config.as_deref())?;
    let options = cli.merge_into_options(options)?;

    logging::init(options.log_level).context("Failed to install logger")?;
    log_info!("deskmate {} starting", env!("CARGO_PKG_VERSION"));
    log_debug!("Options: {:?}", options);

    let (agent_config, sounds) = load_agent(&options)?;
    let commands = load_commands(&options)?;
    log_info!(
        "Agent: {} animations, {}x{} frames, {} commands",
        agent_config.animation_count(),
        agent_config.framesize()[0],
        agent_config.framesize()[1],
        commands.len()
    );

    let mut agent = Agent::new(agent_config, options.agent_options());
    if options.print_states {
        agent = agent.on_state_change(print_state);
    }
    agent = attach_sound(agent, &options);

    let loaded = agent.load_sounds(sounds);
    log_debug!("Loaded {} sounds", loaded);

    let frame = Duration::from_secs(1) / options.refresh_hz;
    let until = Duration::from_millis(options.duration_ms);
    run_script(&mut agent, &commands, frame, until);

    log_info!("Finished at {:?}", agent.now());
    agent.destroy();
    Ok(())
}

fn load_agent(options: &Options) -> Result<(Arc<AgentConfig>, Vec<(String, Vec<u8>)>)> {
    if let Some(path) = &options.agent_file {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent file {}", path.display()))?;
        let config = AgentConfig::from_json(&text)
            .with_context(|| format!("Invalid agent file {}", path.display()))?;
        return Ok((Arc::new(config), Vec::new()));
    }

    let source = DirectoryAssets::new(&options.assets_dir);
    let assets = resolve(&source, &options.agent)
        .with_context(|| format!("Failed to load agent '{}'", options.agent))?;
    Ok((Arc::clone(&assets.config), assets.sounds.clone()))
}

fn load_commands(options: &Options) -> Result<Vec<Command>> {
    let mut commands = Vec::new();

    if let Some(path) = &options.script {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        commands.extend(
            parse_script(&text).with_context(|| format!("Invalid script {}", path.display()))?,
        );
    }
    if let Some(inline) = &options.commands {
        commands.extend(parse_script(inline).context("Invalid inline commands")?);
    }

    if commands.is_empty() {
        commands.push(Command::Show { fast: false });
    }
    Ok(commands)
}

fn print_state(state: &AgentState) {
    match serde_json::to_string(state) {
        Ok(line) => {
            if let Err(e) = writeln!(io::stdout().lock(), "{}", line) {
                log_warning!("Failed to write state: {}", e);
            }
        }
        Err(e) => log_warning!("Failed to serialize state: {}", e),
    }
}

#[cfg(feature = "audio")]
fn attach_sound(agent: Agent, options: &Options) -> Agent {
    if !options.sound {
        return agent;
    }
    match deskmate::sound::RodioSoundPlayer::new() {
        Ok(player) => agent.with_sound_player(player),
        Err(e) => {
            log_warning!("Sound disabled: {}", e);
            agent
        }
    }
}

#[cfg(not(feature = "audio"))]
fn attach_sound(agent: Agent, options: &Options) -> Agent {
    if options.sound {
        log_warning!("Built without the `audio` feature; sounds stay silent");
    }
    agent
}
