use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::{AgentOptions, Viewport};
use crate::logging::LogLevel;

/// Driver options that can be set via CLI or an options file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Bundled agent to load from `assets_dir`
    pub agent: String,
    pub assets_dir: PathBuf,
    /// Load this agent.json instead of a bundled agent
    pub agent_file: Option<PathBuf>,
    /// Command script file
    pub script: Option<PathBuf>,
    /// Inline command script, run after `script`
    pub commands: Option<String>,

    pub viewport: Viewport,
    pub position: Option<(f64, f64)>,
    pub seed: Option<u64>,

    /// Simulated run length in milliseconds
    pub duration_ms: u64,
    /// Simulated display refresh rate
    pub refresh_hz: u32,

    pub log_level: LogLevel,
    /// Print every snapshot as a JSON line
    pub print_states: bool,
    /// Play sounds through the audio device (feature `audio`)
    pub sound: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            agent: "Clippy".to_string(),
            assets_dir: PathBuf::from("agents"),
            agent_file: None,
            script: None,
            commands: None,
            viewport: Viewport::default(),
            position: None,
            seed: None,
            duration_ms: 10_000,
            refresh_hz: 60,
            log_level: LogLevel::default(),
            print_states: true,
            sound: false,
        }
    }
}

impl Options {
    /// Engine options derived from these driver options
    pub fn agent_options(&self) -> AgentOptions {
        AgentOptions {
            viewport: self.viewport,
            position: self.position,
            seed: self.seed,
        }
    }
}

/// Load options from a JSON file; no path means defaults
pub fn load_config(path: Option<&Path>) -> Result<Options> {
    let Some(path) = path else {
        return Ok(Options::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file {}", path.display()))?;
    let options: Options = serde_json::from_str(&text)
        .with_context(|| format!("Invalid options file {}", path.display()))?;

    if options.refresh_hz == 0 {
        anyhow::bail!("refresh_hz must be positive");
    }
    Ok(options)
}

/// Parse a viewport string in the format "WIDTHxHEIGHT"
pub fn parse_viewport(s: &str) -> Result<Viewport> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        anyhow::bail!("Viewport must be in WIDTHxHEIGHT format");
    }

    let width: u32 = parts[0].trim().parse().context("Invalid width value")?;
    let height: u32 = parts[1].trim().parse().context("Invalid height value")?;

    if width == 0 || height == 0 {
        anyhow::bail!("Viewport values must be positive");
    }

    Ok(Viewport::new(width, height))
}

/// Parse a position string in the format "X,Y"
pub fn parse_position(s: &str) -> Result<(f64, f64)> {
    let (x, y) = s
        .split_once(',')
        .context("Position must be in X,Y format")?;

    let x: f64 = x.trim().parse().context("Invalid x value")?;
    let y: f64 = y.trim().parse().context("Invalid y value")?;

    if !x.is_finite() || !y.is_finite() {
        anyhow::bail!("Position values must be finite");
    }

    Ok((x, y))
}

/// Parse a log level name or number
pub fn parse_log_level(s: &str) -> Result<LogLevel> {
    s.parse::<LogLevel>()
        .context("Valid levels: nothing, user, error, warning, info, debug, all (or 0-6)")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_viewport_valid() {
        let vp = parse_viewport("800x600").unwrap();
        assert_eq!(vp.width, 800);
        assert_eq!(vp.height, 600);
    }

    #[test]
    fn test_parse_viewport_invalid_format() {
        assert!(parse_viewport("800-600").is_err());
        assert!(parse_viewport("800x600x32").is_err());
    }

    #[test]
    fn test_parse_viewport_invalid_values() {
        assert!(parse_viewport("0x600").is_err());
        assert!(parse_viewport("800x0").is_err());
        assert!(parse_viewport("abcxdef").is_err());
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("10,20").unwrap(), (10.0, 20.0));
        assert_eq!(parse_position(" -5.5 , 3 ").unwrap(), (-5.5, 3.0));
        assert!(parse_position("10").is_err());
        assert!(parse_position("a,b").is_err());
        assert!(parse_position("inf,0").is_err());
    }

    #[test]
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("info").unwrap(), LogLevel::Info);
        assert!(parse_log_level("chatty").is_err());
    }

    #[test]
    fn test_options_default() {
        let opts = Options::default();
        assert_eq!(opts.viewport, Viewport::new(1024, 768));
        assert_eq!(opts.agent, "Clippy");
        assert!(opts.position.is_none());
        assert_eq!(opts.refresh_hz, 60);
    }

    #[test]
    fn test_load_config_missing_path_is_default() {
        assert_eq!(load_config(None).unwrap(), Options::default());
    }

    #[test]
    fn test_load_config_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"agent": "Merlin", "viewport": {{"width": 640, "height": 480}}, "position": [1, 2], "log_level": "debug"}}"#
        )
        .unwrap();

        let opts = load_config(Some(file.path())).unwrap();
        assert_eq!(opts.agent, "Merlin");
        assert_eq!(opts.viewport, Viewport::new(640, 480));
        assert_eq!(opts.position, Some((1.0, 2.0)));
        assert_eq!(opts.log_level, LogLevel::Debug);
        // Unspecified fields keep their defaults
        assert_eq!(opts.duration_ms, 10_000);
    }

    #[test]
    fn test_load_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.json"))).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(load_config(Some(file.path())).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"refresh_hz": 0}}"#).unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_agent_options() {
        let opts = Options {
            position: Some((3.0, 4.0)),
            seed: Some(9),
            ..Default::default()
        };
        let agent_opts = opts.agent_options();
        assert_eq!(agent_opts.position, Some((3.0, 4.0)));
        assert_eq!(agent_opts.seed, Some(9));
        assert_eq!(agent_opts.viewport, Viewport::default());
    }
}
