//! Deskmate: animated desktop assistant engine
//!
//! The [`engine`] sequences sprite animation, speech balloons and movement
//! for a character; [`assets`] and [`sound`] are the collaborators that feed
//! it config and play its sounds. The remaining modules back the headless
//! `deskmate` driver.

pub mod assets;
pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod script;
pub mod sound;

pub use cli::Cli;
pub use config::Options;
pub use engine::{Agent, AgentConfig, AgentOptions, AgentState};
pub use logging::LogLevel;
