//! Sound playback
//!
//! The engine only ever asks for a sound by id when a frame that carries one
//! is drawn. Resolving ids to audio data and getting them to a speaker is the
//! job of a [`SoundPlayer`]:
//!
//! - [`NullSoundPlayer`] keeps the clips and records what was asked for, for
//!   headless hosts and tests
//! - `RodioSoundPlayer` (feature `audio`) decodes and plays clips on a
//!   dedicated audio thread
//!
//! Playback is best effort. Callers log and drop [`SoundError`]s; a missing
//! or broken clip never interrupts animation.

pub mod null;
#[cfg(feature = "audio")]
pub mod rodio_audio;

use std::collections::HashMap;
use std::sync::Arc;

pub use null::NullSoundPlayer;
#[cfg(feature = "audio")]
pub use rodio_audio::RodioSoundPlayer;

/// Sound playback failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SoundError {
    #[error("Unknown sound: {0}")]
    UnknownSound(String),

    #[error("Sound '{0}' has no data")]
    EmptyClip(String),

    #[error("Failed to decode sound '{id}': {reason}")]
    Decode { id: String, reason: String },

    #[error("Audio output unavailable: {0}")]
    Backend(String),
}

/// Audio-playback collaborator
pub trait SoundPlayer {
    /// Register encoded audio under `id`, replacing any previous clip
    fn load(&mut self, id: &str, data: Vec<u8>) -> Result<(), SoundError>;

    /// Start playing `id` from the beginning
    fn play(&mut self, id: &str) -> Result<(), SoundError>;

    /// Stop playback and forget every clip
    fn clear(&mut self);
}

/// Encoded clips keyed by sound id
#[derive(Debug, Clone, Default)]
pub struct SoundBank {
    clips: HashMap<String, Arc<[u8]>>,
}

impl SoundBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a clip; empty data is rejected
    pub fn insert(&mut self, id: &str, data: Vec<u8>) -> Result<(), SoundError> {
        if data.is_empty() {
            return Err(SoundError::EmptyClip(id.to_string()));
        }
        self.clips.insert(id.to_string(), Arc::from(data));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<[u8]>, SoundError> {
        self.clips
            .get(id)
            .cloned()
            .ok_or_else(|| SoundError::UnknownSound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clips.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn clear(&mut self) {
        self.clips.clear();
    }
}
