//! Agent asset resolution
//!
//! Maps one of the bundled agent names to its config, sprite sheet and
//! sound clips. The on-disk layout is:
//!
//! ```text
//! <root>/<Name>/agent.json      agent config
//! <root>/<Name>/map.png         sprite sheet
//! <root>/<Name>/sounds/<id>.*   optional sound clips, keyed by file stem
//! ```
//!
//! Loaded assets are cached per name, so repeated lookups share one parsed
//! config.
//!
//! # Example
//! ```no_run
//! use deskmate::assets::{resolve, DirectoryAssets};
//!
//! let assets = DirectoryAssets::new("agents");
//! let clippy = resolve(&assets, "Clippy").unwrap();
//! println!("{} animations", clippy.config.animation_count());
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::RwLock;

use crate::engine::{AgentConfig, ModelError};

/// The bundled characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AgentName {
    Bonzi,
    Clippy,
    F1,
    Genie,
    Genius,
    Links,
    Merlin,
    Peedy,
    Rocky,
    Rover,
}

impl AgentName {
    pub const ALL: [AgentName; 10] = [
        AgentName::Bonzi,
        AgentName::Clippy,
        AgentName::F1,
        AgentName::Genie,
        AgentName::Genius,
        AgentName::Links,
        AgentName::Merlin,
        AgentName::Peedy,
        AgentName::Rocky,
        AgentName::Rover,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AgentName::Bonzi => "Bonzi",
            AgentName::Clippy => "Clippy",
            AgentName::F1 => "F1",
            AgentName::Genie => "Genie",
            AgentName::Genius => "Genius",
            AgentName::Links => "Links",
            AgentName::Merlin => "Merlin",
            AgentName::Peedy => "Peedy",
            AgentName::Rocky => "Rocky",
            AgentName::Rover => "Rover",
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AssetError::UnknownAgent(s.to_string()))
    }
}

/// Asset resolution failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Invalid config for {name}: {source}")]
    Config {
        name: String,
        #[source]
        source: ModelError,
    },
}

/// Everything needed to put an agent on screen
#[derive(Debug, Clone)]
pub struct AgentAssets {
    pub name: AgentName,
    pub config: Arc<AgentConfig>,
    /// Sprite sheet location; rendering hosts load it themselves
    pub sprite_sheet: PathBuf,
    /// `(sound id, encoded clip)` pairs
    pub sounds: Vec<(String, Vec<u8>)>,
}

/// Resolves agent names to assets
pub trait AssetSource {
    fn load(&self, name: AgentName) -> Result<Arc<AgentAssets>, AssetError>;
}

/// Resolve a name given as text; unrecognized names are an error
pub fn resolve(source: &dyn AssetSource, name: &str) -> Result<Arc<AgentAssets>, AssetError> {
    let name: AgentName = name.parse()?;
    source.load(name)
}

/// Assets laid out on disk, one directory per agent
#[derive(Debug)]
pub struct DirectoryAssets {
    root: PathBuf,
    cache: RwLock<HashMap<AgentName, Arc<AgentAssets>>>,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of a single agent
    pub fn agent_dir(&self, name: AgentName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Names that have been loaded so far
    pub fn cached(&self) -> Vec<AgentName> {
        let mut names: Vec<AgentName> = self.cache.read().keys().copied().collect();
        names.sort();
        names
    }

    fn load_uncached(&self, name: AgentName) -> Result<AgentAssets, AssetError> {
        let dir = self.agent_dir(name);
        let config_path = dir.join("agent.json");
        debug!("assets: loading {} from {}", name, config_path.display());

        let text = fs::read_to_string(&config_path).map_err(|e| AssetError::Io {
            path: config_path.clone(),
            reason: e.to_string(),
        })?;
        let config = AgentConfig::from_json(&text).map_err(|source| AssetError::Config {
            name: name.to_string(),
            source,
        })?;

        let sprite_sheet = dir.join("map.png");
        if !sprite_sheet.is_file() {
            warn!("assets: {} has no sprite sheet at {}", name, sprite_sheet.display());
        }

        let sounds = read_sounds(&dir.join("sounds"))?;

        Ok(AgentAssets {
            name,
            config: Arc::new(config),
            sprite_sheet,
            sounds,
        })
    }
}

impl AssetSource for DirectoryAssets {
    fn load(&self, name: AgentName) -> Result<Arc<AgentAssets>, AssetError> {
        if let Some(assets) = self.cache.read().get(&name) {
            return Ok(Arc::clone(assets));
        }

        let assets = Arc::new(self.load_uncached(name)?);
        let mut cache = self.cache.write();
        // Another caller may have loaded it meanwhile; keep the first copy
        let entry = cache.entry(name).or_insert(assets);
        Ok(Arc::clone(entry))
    }
}

/// Read every file in `dir` as a sound clip named by its stem
///
/// A missing directory means the agent has no sounds.
fn read_sounds(dir: &Path) -> Result<Vec<(String, Vec<u8>)>, AssetError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let io_err = |path: &Path, e: std::io::Error| AssetError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut sounds = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let data = fs::read(&path).map_err(|e| io_err(&path, e))?;
        sounds.push((id.to_string(), data));
    }
    sounds.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sounds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "overlayCount": 1,
        "framesize": [124, 93],
        "sounds": ["1"],
        "animations": {"Show": {"frames": [{"duration": 100, "images": [[0, 0]]}]}}
    }"#;

    fn write_agent(root: &Path, name: &str, config: &str) {
        let dir = root.join(name);
        fs::create_dir_all(dir.join("sounds")).unwrap();
        fs::write(dir.join("agent.json"), config).unwrap();
        fs::write(dir.join("map.png"), [0u8; 4]).unwrap();
        fs::write(dir.join("sounds").join("1.mp3"), [1u8, 2, 3]).unwrap();
    }

    #[test]
    fn test_agent_name_parse() {
        assert_eq!("Clippy".parse::<AgentName>().unwrap(), AgentName::Clippy);
        assert_eq!("f1".parse::<AgentName>().unwrap(), AgentName::F1);
        assert_eq!(
            "Cortana".parse::<AgentName>(),
            Err(AssetError::UnknownAgent("Cortana".to_string()))
        );
        for name in AgentName::ALL {
            assert_eq!(name.to_string().parse::<AgentName>().unwrap(), name);
        }
    }

    #[test]
    fn test_load_from_directory() {
        let root = tempfile::tempdir().unwrap();
        write_agent(root.path(), "Clippy", CONFIG);

        let assets = DirectoryAssets::new(root.path());
        let clippy = resolve(&assets, "Clippy").unwrap();
        assert_eq!(clippy.name, AgentName::Clippy);
        assert_eq!(clippy.config.framesize(), [124, 93]);
        assert!(clippy.config.has_animation("Show"));
        assert_eq!(clippy.sprite_sheet, root.path().join("Clippy").join("map.png"));
        assert_eq!(clippy.sounds, vec![("1".to_string(), vec![1u8, 2, 3])]);
    }

    #[test]
    fn test_load_is_cached() {
        let root = tempfile::tempdir().unwrap();
        write_agent(root.path(), "Merlin", CONFIG);

        let assets = DirectoryAssets::new(root.path());
        let first = assets.load(AgentName::Merlin).unwrap();
        // Removing the files does not matter once cached
        fs::remove_dir_all(root.path().join("Merlin")).unwrap();
        let second = assets.load(AgentName::Merlin).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(assets.cached(), vec![AgentName::Merlin]);
    }

    #[test]
    fn test_unknown_agent_name() {
        let root = tempfile::tempdir().unwrap();
        let assets = DirectoryAssets::new(root.path());
        assert!(matches!(
            resolve(&assets, "Nobody"),
            Err(AssetError::UnknownAgent(_))
        ));
    }

    #[test]
    fn test_missing_files() {
        let root = tempfile::tempdir().unwrap();
        let assets = DirectoryAssets::new(root.path());
        assert!(matches!(
            assets.load(AgentName::Rover),
            Err(AssetError::Io { .. })
        ));
        assert!(assets.cached().is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let root = tempfile::tempdir().unwrap();
        write_agent(root.path(), "Genie", r#"{"overlayCount": 0, "framesize": [1, 1], "animations": {}}"#);

        let assets = DirectoryAssets::new(root.path());
        match assets.load(AgentName::Genie) {
            Err(AssetError::Config { name, source }) => {
                assert_eq!(name, "Genie");
                assert_eq!(source, ModelError::NoOverlays);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_no_sounds_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("Rocky");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("agent.json"), CONFIG).unwrap();

        let assets = DirectoryAssets::new(root.path());
        let rocky = assets.load(AgentName::Rocky).unwrap();
        assert!(rocky.sounds.is_empty());
    }
}
