//! Rodio-backed sound player
//!
//! rodio's `OutputStream` is not `Send`, so the stream lives on a dedicated
//! audio thread and the player talks to it over a command channel. Clips are
//! decoded on that thread; decode failures are logged there and dropped.

use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use rodio::{OutputStream, OutputStreamHandle, Sink};

use super::{SoundBank, SoundError, SoundPlayer};

/// Commands sent to the audio thread
enum AudioCommand {
    /// Decode and play a clip
    Play(String, Arc<[u8]>),
    /// Stop everything that is playing
    StopAll,
    /// Stop playback and exit the thread
    Shutdown,
}

/// Sound player that outputs through the default audio device
pub struct RodioSoundPlayer {
    bank: SoundBank,
    sender: Sender<AudioCommand>,
    thread: Option<JoinHandle<()>>,
}

impl RodioSoundPlayer {
    /// Spawn the audio thread
    ///
    /// Fails only if the thread cannot be started; a missing output device
    /// is reported by the thread itself and turns playback into a no-op.
    pub fn new() -> Result<Self, SoundError> {
        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name("deskmate-audio".to_string())
            .spawn(move || audio_thread_main(receiver))
            .map_err(|e| SoundError::Backend(e.to_string()))?;

        Ok(Self {
            bank: SoundBank::new(),
            sender,
            thread: Some(thread),
        })
    }

    fn send(&self, cmd: AudioCommand) -> Result<(), SoundError> {
        self.sender
            .send(cmd)
            .map_err(|_| SoundError::Backend("audio thread has exited".to_string()))
    }
}

impl SoundPlayer for RodioSoundPlayer {
    fn load(&mut self, id: &str, data: Vec<u8>) -> Result<(), SoundError> {
        self.bank.insert(id, data)
    }

    fn play(&mut self, id: &str) -> Result<(), SoundError> {
        let clip = self.bank.get(id)?;
        self.send(AudioCommand::Play(id.to_string(), clip))
    }

    fn clear(&mut self) {
        self.bank.clear();
        let _ = self.send(AudioCommand::StopAll);
    }
}

impl Drop for RodioSoundPlayer {
    fn drop(&mut self) {
        let _ = self.send(AudioCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn audio_thread_main(rx: Receiver<AudioCommand>) {
    debug!("audio: thread starting");

    let (_stream, handle) = match OutputStream::try_default() {
        Ok(s) => s,
        Err(e) => {
            warn!("audio: failed to open output - {}", e);
            // Keep draining so senders never block on a dead thread
            while let Ok(cmd) = rx.recv() {
                if matches!(cmd, AudioCommand::Shutdown) {
                    break;
                }
            }
            return;
        }
    };

    let mut sinks: Vec<Sink> = Vec::new();

    while let Ok(cmd) = rx.recv() {
        match cmd {
            AudioCommand::Play(id, clip) => {
                sinks.retain(|sink| !sink.empty());
                if let Some(sink) = play_clip(&handle, &id, clip) {
                    sinks.push(sink);
                }
            }
            AudioCommand::StopAll => {
                for sink in sinks.drain(..) {
                    sink.stop();
                }
            }
            AudioCommand::Shutdown => break,
        }
    }

    for sink in sinks.drain(..) {
        sink.stop();
    }
    debug!("audio: thread exited");
}

fn play_clip(handle: &OutputStreamHandle, id: &str, clip: Arc<[u8]>) -> Option<Sink> {
    let source = match rodio::Decoder::new(Cursor::new(clip)) {
        Ok(s) => s,
        Err(e) => {
            debug!("audio: decode error for '{}' - {}", id, e);
            return None;
        }
    };

    let sink = match Sink::try_new(handle) {
        Ok(s) => s,
        Err(e) => {
            debug!("audio: sink error for '{}' - {}", id, e);
            return None;
        }
    };

    sink.append(source);
    Some(sink)
}
