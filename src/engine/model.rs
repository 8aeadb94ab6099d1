//! Agent config model
//!
//! The config is the read-only description of a character: how many sprite
//! layers make up a frame, the frame size, the known sound ids and the
//! animation table. It is parsed from the JSON agent format and validated
//! once; after that it is shared behind an `Arc` and never mutated.
//!
//! Animation order is significant (the first frame of the first animation is
//! the neutral pose), so the table keeps insertion order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Sprite sheet coordinate `[x, y]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SpriteCoord(pub u32, pub u32);

impl SpriteCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self(x, y)
    }

    pub const fn x(self) -> u32 {
        self.0
    }

    pub const fn y(self) -> u32 {
        self.1
    }

    /// CSS `background-position` for a tile at this offset
    pub fn background_position(self) -> String {
        format!("{}px {}px", -i64::from(self.0), -i64::from(self.1))
    }
}

/// A weighted alternative next frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    /// Target frame index
    pub frame_index: usize,
    /// Weight as a percentage (0-100)
    pub weight: f64,
}

impl Branch {
    pub const fn new(frame_index: usize, weight: f64) -> Self {
        Self {
            frame_index,
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Branching {
    pub branches: Vec<Branch>,
}

/// A single frame of animation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Display time in milliseconds
    pub duration: u32,
    /// Sprite coordinates, one per overlay layer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<SpriteCoord>,
    /// Sound to trigger when the frame is shown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound: Option<String>,
    /// Frame to jump to when an early exit was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_branch: Option<usize>,
    /// Probabilistic next-frame selection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branching: Option<Branching>,
}

impl Frame {
    /// Create a frame with a duration and no layers
    pub fn new(duration: u32) -> Self {
        Self {
            duration,
            ..Default::default()
        }
    }

    pub fn with_images(mut self, images: Vec<SpriteCoord>) -> Self {
        self.images = images;
        self
    }

    pub fn with_sound(mut self, sound: &str) -> Self {
        self.sound = Some(sound.to_string());
        self
    }

    pub fn with_exit_branch(mut self, index: usize) -> Self {
        self.exit_branch = Some(index);
        self
    }

    pub fn with_branches(mut self, branches: Vec<Branch>) -> Self {
        self.branching = Some(Branching { branches });
        self
    }

    /// Weighted branches, empty when the frame does not branch
    pub fn branches(&self) -> &[Branch] {
        self.branching
            .as_ref()
            .map(|b| b.branches.as_slice())
            .unwrap_or(&[])
    }
}

/// A named animation sequence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animation {
    pub frames: Vec<Frame>,
    #[serde(default)]
    pub use_exit_branching: bool,
}

impl Animation {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            use_exit_branching: false,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// Errors found while validating a config
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Config must declare at least one overlay layer")]
    NoOverlays,

    #[error("Frame size must be positive (got {0}x{1})")]
    InvalidFrameSize(u32, u32),

    #[error("Animation '{0}' has no frames")]
    EmptyAnimation(String),

    #[error("Duplicate animation name: {0}")]
    DuplicateAnimation(String),

    #[error("Malformed agent config: {0}")]
    Parse(String),
}

/// Raw JSON shape; animations stay ordered thanks to `preserve_order`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    overlay_count: usize,
    framesize: [u32; 2],
    #[serde(default)]
    sounds: Vec<String>,
    animations: serde_json::Map<String, serde_json::Value>,
}

/// Validated, read-only agent configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    overlay_count: usize,
    framesize: [u32; 2],
    sounds: Vec<String>,
    animations: Vec<(String, Animation)>,
    by_name: HashMap<String, usize>,
}

impl AgentConfig {
    /// Validate and build a config from its parts
    ///
    /// `animations` order is kept; the first entry supplies the neutral pose.
    pub fn new(
        overlay_count: usize,
        framesize: [u32; 2],
        sounds: Vec<String>,
        animations: Vec<(String, Animation)>,
    ) -> Result<Self, ModelError> {
        if overlay_count == 0 {
            return Err(ModelError::NoOverlays);
        }
        if framesize[0] == 0 || framesize[1] == 0 {
            return Err(ModelError::InvalidFrameSize(framesize[0], framesize[1]));
        }

        let mut by_name = HashMap::with_capacity(animations.len());
        for (i, (name, anim)) in animations.iter().enumerate() {
            if anim.frames.is_empty() {
                return Err(ModelError::EmptyAnimation(name.clone()));
            }
            if by_name.insert(name.clone(), i).is_some() {
                return Err(ModelError::DuplicateAnimation(name.clone()));
            }
        }

        Ok(Self {
            overlay_count,
            framesize,
            sounds,
            animations,
            by_name,
        })
    }

    /// Parse the JSON agent format
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let raw: RawConfig =
            serde_json::from_str(text).map_err(|e| ModelError::Parse(e.to_string()))?;

        let mut animations = Vec::with_capacity(raw.animations.len());
        for (name, value) in raw.animations {
            let anim: Animation = serde_json::from_value(value)
                .map_err(|e| ModelError::Parse(format!("animation '{}': {}", name, e)))?;
            animations.push((name, anim));
        }

        Self::new(raw.overlay_count, raw.framesize, raw.sounds, animations)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlay_count
    }

    /// Frame size `[width, height]` in pixels
    pub fn framesize(&self) -> [u32; 2] {
        self.framesize
    }

    pub fn sounds(&self) -> &[String] {
        &self.sounds
    }

    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.by_name.get(name).map(|&i| &self.animations[i].1)
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Animation names in config order
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.iter().map(|(name, _)| name.as_str())
    }

    pub fn animation_count(&self) -> usize {
        self.animations.len()
    }

    /// Per-layer sprite offsets for a frame; layers past the frame's images
    /// are hidden
    pub fn layer_offsets(&self, frame: &Frame) -> Vec<Option<SpriteCoord>> {
        (0..self.overlay_count)
            .map(|i| frame.images.get(i).copied())
            .collect()
    }

    /// Neutral pose: the first frame of the first animation, or all layers
    /// hidden when there is nothing to derive it from
    pub fn neutral_offsets(&self) -> Vec<Option<SpriteCoord>> {
        match self.animations.first().and_then(|(_, a)| a.frames.first()) {
            Some(frame) => self.layer_offsets(frame),
            None => vec![None; self.overlay_count],
        }
    }
}
