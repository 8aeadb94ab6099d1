//! Core types and fixed constants for the agent engine

use std::time::Duration;

/// Estimated balloon width in pixels
pub const BALLOON_WIDTH: f64 = 200.0;

/// Estimated balloon height in pixels
pub const BALLOON_HEIGHT_EST: f64 = 80.0;

/// Margin kept around the balloon
pub const BALLOON_MARGIN: f64 = 15.0;

/// Horizontal inset of the balloon anchor from the agent's center
pub const BALLOON_ANCHOR_INSET: f64 = 20.0;

/// Gap between the agent's top edge and a top-side balloon
pub const BALLOON_TOP_GAP: f64 = 5.0;

/// Gap between the agent's bottom edge and a bottom-side balloon
pub const BALLOON_BOTTOM_GAP: f64 = 8.0;

/// Interval between revealed words
pub const WORD_DELAY: Duration = Duration::from_millis(200);

/// Delay before a non-hold balloon closes itself
pub const CLOSE_DELAY: Duration = Duration::from_millis(2000);

/// Default duration of `move_to`
pub const DEFAULT_MOVE_DURATION: Duration = Duration::from_millis(1000);

/// Distance from the viewport's bottom-right corner for the default position
pub const DEFAULT_EDGE_OFFSET: f64 = 40.0;

/// Shortest delay between two frames; keeps the event loop moving
pub const MIN_FRAME_DURATION: Duration = Duration::from_millis(1);

/// Well-known animation names
pub mod names {
    pub const SHOW: &str = "Show";
    pub const HIDE: &str = "Hide";
    pub const IDLE_PREFIX: &str = "Idle";
    pub const MOVE_PREFIX: &str = "Move";
    pub const GESTURE_PREFIX: &str = "Gesture";
    pub const LOOK_PREFIX: &str = "Look";
}
