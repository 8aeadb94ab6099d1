//! Silent sound player
//!
//! Stores clips like a real backend would and records every successful
//! `play`, so hosts without audio output (and tests) can still see which
//! sounds an animation asked for.

use log::trace;

use super::{SoundBank, SoundError, SoundPlayer};

#[derive(Debug, Default)]
pub struct NullSoundPlayer {
    bank: SoundBank,
    played: Vec<String>,
}

impl NullSoundPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids played so far, in order
    pub fn played(&self) -> &[String] {
        &self.played
    }

    pub fn bank(&self) -> &SoundBank {
        &self.bank
    }
}

impl SoundPlayer for NullSoundPlayer {
    fn load(&mut self, id: &str, data: Vec<u8>) -> Result<(), SoundError> {
        self.bank.insert(id, data)
    }

    fn play(&mut self, id: &str) -> Result<(), SoundError> {
        self.bank.get(id)?;
        trace!("sound: (silent) {}", id);
        self.played.push(id.to_string());
        Ok(())
    }

    fn clear(&mut self) {
        self.bank.clear();
    }
}
