//! Observable agent state

use serde::{Deserialize, Serialize};

use super::balloon::BalloonState;
use super::model::SpriteCoord;

/// Host viewport, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

/// Snapshot handed to the state observer after every change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentState {
    pub x: f64,
    pub y: f64,
    pub visible: bool,
    /// One entry per overlay layer; `None` hides the layer
    pub overlays: Vec<Option<SpriteCoord>>,
    pub dragging: bool,
    pub balloon: BalloonState,
    pub width: u32,
    pub height: u32,
    pub current_animation: Option<String>,
}

impl AgentState {
    /// Overlays as CSS `background-position` values
    pub fn background_positions(&self) -> Vec<Option<String>> {
        self.overlays
            .iter()
            .map(|o| o.map(SpriteCoord::background_position))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_default() {
        assert_eq!(Viewport::default(), Viewport::new(1024, 768));
    }

    #[test]
    fn test_background_positions() {
        let state = AgentState {
            x: 0.0,
            y: 0.0,
            visible: true,
            overlays: vec![Some(SpriteCoord(124, 93)), None, Some(SpriteCoord(0, 0))],
            dragging: false,
            balloon: BalloonState::default(),
            width: 124,
            height: 93,
            current_animation: None,
        };
        assert_eq!(
            state.background_positions(),
            vec![Some("-124px -93px".to_string()), None, Some("0px 0px".to_string())]
        );
    }

    #[test]
    fn test_snapshot_json_shape() {
        let state = AgentState {
            x: 1.5,
            y: 2.0,
            visible: false,
            overlays: vec![Some(SpriteCoord(1, 2)), None],
            dragging: true,
            balloon: BalloonState::default(),
            width: 10,
            height: 20,
            current_animation: Some("Wave".to_string()),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["overlays"], serde_json::json!([[1, 2], null]));
        assert_eq!(json["currentAnimation"], "Wave");
        assert_eq!(json["balloon"]["side"], "top-right");
        assert_eq!(json["balloon"]["displayedText"], "");
    }
}
