//! Speech balloon
//!
//! Reveals text one word at a time, then either closes itself after
//! [`CLOSE_DELAY`] or, in hold mode, waits for an explicit close. A new
//! `speak` or `close` cancels whatever reveal/close deadline the previous
//! call left behind.
//!
//! The balloon is placed on the first side (top-right, top-left,
//! bottom-right, bottom-left) whose estimated box fits inside the viewport.

use std::time::Duration;

use log::debug;
use serde::Serialize;

use super::state::Viewport;
use super::types::{
    BALLOON_ANCHOR_INSET, BALLOON_BOTTOM_GAP, BALLOON_HEIGHT_EST, BALLOON_TOP_GAP, BALLOON_WIDTH,
    CLOSE_DELAY, WORD_DELAY,
};

/// Side of the agent the balloon sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalloonSide {
    #[default]
    TopRight,
    TopLeft,
    BottomRight,
    BottomLeft,
}

impl BalloonSide {
    /// Preference order used when placing the balloon
    pub const PREFERENCE: [BalloonSide; 4] = [
        BalloonSide::TopRight,
        BalloonSide::TopLeft,
        BalloonSide::BottomRight,
        BalloonSide::BottomLeft,
    ];
}

/// Agent geometry the balloon is positioned against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub viewport: Viewport,
}

/// Top-left corner of the balloon when placed on `side`
pub fn balloon_position(side: BalloonSide, anchor: &Anchor) -> (f64, f64) {
    let center_x = anchor.x + anchor.width / 2.0;
    let right_x = center_x - BALLOON_ANCHOR_INSET;
    let left_x = center_x - BALLOON_WIDTH + BALLOON_ANCHOR_INSET;
    let top_y = anchor.y - BALLOON_HEIGHT_EST - BALLOON_TOP_GAP;
    let bottom_y = anchor.y + anchor.height + BALLOON_BOTTOM_GAP;

    match side {
        BalloonSide::TopRight => (right_x, top_y),
        BalloonSide::TopLeft => (left_x, top_y),
        BalloonSide::BottomRight => (right_x, bottom_y),
        BalloonSide::BottomLeft => (left_x, bottom_y),
    }
}

/// First side whose balloon box fits in the viewport, top-right otherwise
pub fn best_side(anchor: &Anchor) -> BalloonSide {
    let vw = f64::from(anchor.viewport.width);
    let vh = f64::from(anchor.viewport.height);

    BalloonSide::PREFERENCE
        .into_iter()
        .find(|&side| {
            let (x, y) = balloon_position(side, anchor);
            x >= 0.0 && y >= 0.0 && x + BALLOON_WIDTH <= vw && y + BALLOON_HEIGHT_EST <= vh
        })
        .unwrap_or_default()
}

/// Observable balloon state
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalloonState {
    pub visible: bool,
    pub text: String,
    pub displayed_text: String,
    pub side: BalloonSide,
    pub x: f64,
    pub y: f64,
    pub hold: bool,
}

/// Result of [`Balloon::on_timer`]
#[derive(Debug, PartialEq)]
pub enum BalloonTick<C> {
    /// Nothing was due
    Idle,
    /// Another word was revealed (or the reveal just completed)
    Revealed,
    /// The auto-close fired
    Closed(Option<C>),
}

/// Word-by-word speech balloon
#[derive(Debug)]
pub struct Balloon<C> {
    state: BalloonState,
    words: Vec<String>,
    word_index: usize,
    word_due: Option<Duration>,
    close_due: Option<Duration>,
    on_complete: Option<C>,
}

impl<C> Default for Balloon<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Balloon<C> {
    pub fn new() -> Self {
        Self {
            state: BalloonState::default(),
            words: Vec::new(),
            word_index: 0,
            word_due: None,
            close_due: None,
            on_complete: None,
        }
    }

    pub fn state(&self) -> &BalloonState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    /// Start revealing `text`
    ///
    /// Closes any current speech first; the completion token of that speech
    /// is returned.
    pub fn speak(
        &mut self,
        now: Duration,
        text: &str,
        hold: bool,
        anchor: &Anchor,
        on_complete: Option<C>,
    ) -> Option<C> {
        let previous = self.close();

        let side = best_side(anchor);
        let (x, y) = balloon_position(side, anchor);
        debug!("balloon: speaking {} chars on {:?} (hold={})", text.len(), side, hold);

        self.state = BalloonState {
            visible: true,
            text: text.to_string(),
            displayed_text: String::new(),
            side,
            x,
            y,
            hold,
        };
        self.on_complete = on_complete;
        self.words = text.split_whitespace().map(String::from).collect();
        self.word_index = 0;
        self.show_next_word(now);

        previous
    }

    /// Hide the balloon and hand back its completion token
    pub fn close(&mut self) -> Option<C> {
        self.word_due = None;
        self.close_due = None;
        self.words.clear();
        self.word_index = 0;
        if self.state.visible {
            debug!("balloon: closed");
        }

        self.state.visible = false;
        self.state.text.clear();
        self.state.displayed_text.clear();
        self.on_complete.take()
    }

    /// Re-place a visible balloon; returns whether anything changed
    pub fn reposition(&mut self, anchor: &Anchor) -> bool {
        if !self.state.visible {
            return false;
        }
        let side = best_side(anchor);
        let (x, y) = balloon_position(side, anchor);
        self.state.side = side;
        self.state.x = x;
        self.state.y = y;
        true
    }

    /// Earliest pending reveal/close deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.word_due, self.close_due) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Handle a reveal or close deadline that has passed
    pub fn on_timer(&mut self, now: Duration) -> BalloonTick<C> {
        if self.word_due.is_some_and(|due| due <= now) {
            self.word_due = None;
            self.show_next_word(now);
            return BalloonTick::Revealed;
        }
        if self.close_due.is_some_and(|due| due <= now) {
            return BalloonTick::Closed(self.close());
        }
        BalloonTick::Idle
    }

    fn show_next_word(&mut self, now: Duration) {
        let Some(word) = self.words.get(self.word_index) else {
            if !self.state.hold {
                self.close_due = Some(now + CLOSE_DELAY);
            }
            return;
        };

        if self.word_index > 0 {
            self.state.displayed_text.push(' ');
        }
        self.state.displayed_text.push_str(word);
        self.word_index += 1;
        self.word_due = Some(now + WORD_DELAY);
    }
}
