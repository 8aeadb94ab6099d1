//! Agent orchestrator
//!
//! Public face of the engine. High-level intents (show, speak, move,
//! gesture) become [`Action`]s on a single-consumer queue; the step in
//! flight drives the animator and/or the balloon and finishes by handing
//! its [`Ticket`] back. When the queue drains, a random `Idle*` animation is
//! queued, so a character with idle animations never stands still.
//!
//! Time only moves through [`Agent::advance`]. Each call processes every
//! deadline that falls inside the elapsed window in order (animator first,
//! then balloon, then the orchestrator's own timers on ties) and finally
//! samples movement once, as a display refresh would.
//!
//! After every change the full [`AgentState`] is handed to the observer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};

use super::animation::{Animator, AnimatorEvent};
use super::balloon::{Anchor, Balloon, BalloonTick};
use super::model::{AgentConfig, SpriteCoord};
use super::queue::{ActionQueue, Advance, Enqueued, Ticket};
use super::random::{RandomSource, StdRandom};
use super::state::{AgentState, Viewport};
use super::timer::{TimerId, TimerQueue};
use super::types::{names, DEFAULT_EDGE_OFFSET};
use crate::sound::{NullSoundPlayer, SoundPlayer};

/// One-shot completion callback
pub type Callback = Box<dyn FnOnce()>;

/// Receives a snapshot after every state change
pub type StateObserver = Box<dyn FnMut(&AgentState)>;

/// Screen direction used to pick `Move*`, `Gesture*` and `Look*` animations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Right,
    Left,
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Right => "Right",
            Direction::Left => "Left",
            Direction::Up => "Up",
            Direction::Down => "Down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction from `from` to `to`; ties go to the vertical axis
pub fn direction(from: (f64, f64), to: (f64, f64)) -> Direction {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;

    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy > 0.0 {
        Direction::Down
    } else {
        Direction::Up
    }
}

/// Symmetric quadratic ease-in/ease-out over `t` in `[0, 1]`
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Construction options for [`Agent`]
#[derive(Debug, Clone, Default)]
pub struct AgentOptions {
    pub viewport: Viewport,
    /// Initial top-left position; defaults to the bottom-right corner
    pub position: Option<(f64, f64)>,
    /// Seed for branch and idle selection; random when absent
    pub seed: Option<u64>,
}

/// A queued unit of work
enum Action {
    Show,
    Hide(Option<Callback>),
    Play {
        name: String,
        timeout: Option<Duration>,
        callback: Option<Callback>,
    },
    Idle(String),
    Speak {
        text: String,
        hold: bool,
    },
    Move {
        x: f64,
        y: f64,
        duration: Duration,
    },
    Delay(Duration),
}

/// Everything needed to finish the step in flight
struct StepDone {
    ticket: Ticket,
    timeout: Option<TimerId>,
    /// Runs before the queue moves on
    callback: Option<Callback>,
    /// Runs after the queue has moved on
    then: Option<Callback>,
    hides: bool,
}

impl StepDone {
    fn new(ticket: Ticket) -> Self {
        Self {
            ticket,
            timeout: None,
            callback: None,
            then: None,
            hides: false,
        }
    }
}

enum AgentTimer {
    Delay(StepDone),
    ForceExit,
}

struct Movement {
    from: (f64, f64),
    to: (f64, f64),
    started: Duration,
    duration: Duration,
    done: StepDone,
}

/// An on-screen character
pub struct Agent {
    config: Arc<AgentConfig>,
    animator: Animator<StepDone>,
    balloon: Balloon<StepDone>,
    queue: ActionQueue<Action>,
    timers: TimerQueue<AgentTimer>,
    movement: Option<Movement>,
    random: Box<dyn RandomSource>,
    sound: Box<dyn SoundPlayer>,
    observer: Option<StateObserver>,
    viewport: Viewport,
    now: Duration,
    x: f64,
    y: f64,
    visible: bool,
    dragging: bool,
    drag_offset: (f64, f64),
    current_animation: Option<String>,
    overlays: Vec<Option<SpriteCoord>>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("now", &self.now)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("visible", &self.visible)
            .field("dragging", &self.dragging)
            .field("current_animation", &self.current_animation)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new(config: Arc<AgentConfig>, options: AgentOptions) -> Self {
        let [w, h] = config.framesize();
        let (x, y) = options.position.unwrap_or((
            f64::from(options.viewport.width) - f64::from(w) - DEFAULT_EDGE_OFFSET,
            f64::from(options.viewport.height) - f64::from(h) - DEFAULT_EDGE_OFFSET,
        ));
        let random = options
            .seed
            .map(StdRandom::seeded)
            .unwrap_or_default();

        Self {
            animator: Animator::new(Arc::clone(&config)),
            config,
            balloon: Balloon::new(),
            queue: ActionQueue::new(),
            timers: TimerQueue::new(),
            movement: None,
            random: Box::new(random),
            sound: Box::new(NullSoundPlayer::new()),
            observer: None,
            viewport: options.viewport,
            now: Duration::ZERO,
            x,
            y,
            visible: false,
            dragging: false,
            drag_offset: (0.0, 0.0),
            current_animation: None,
            overlays: Vec::new(),
        }
    }

    /// Replace the random source used for branches and idle/animate picks
    pub fn with_random(mut self, random: impl RandomSource + 'static) -> Self {
        self.random = Box::new(random);
        self
    }

    pub fn with_sound_player(mut self, player: impl SoundPlayer + 'static) -> Self {
        self.sound = Box::new(player);
        self
    }

    /// Register the state observer
    pub fn on_state_change(mut self, observer: impl FnMut(&AgentState) + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Whether a queued step is in flight
    pub fn is_busy(&self) -> bool {
        self.queue.is_active()
    }

    /// Steps waiting behind the one in flight
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.current_animation.as_deref()
    }

    /// Full snapshot of the observable state
    pub fn state(&self) -> AgentState {
        let [width, height] = self.config.framesize();
        let overlays = if self.overlays.is_empty() {
            self.config.neutral_offsets()
        } else {
            self.overlays.clone()
        };

        AgentState {
            x: self.x,
            y: self.y,
            visible: self.visible,
            overlays,
            dragging: self.dragging,
            balloon: self.balloon.state().clone(),
            width,
            height,
            current_animation: self.current_animation.clone(),
        }
    }

    // ---- intents ----

    /// Make the agent visible and play its entrance
    ///
    /// `fast` skips the queue: "Show" starts at once and takes over the
    /// queue slot of whatever step is in flight. That step is abandoned:
    /// its callback never fires and it will not hide the agent.
    pub fn show(&mut self, fast: bool) {
        self.visible = true;
        self.emit();

        if fast {
            if self.animator.has_animation(names::SHOW) {
                let in_flight = self.animator.abandon().map(|done| self.take_over(done));
                let unplayed = self.play_step(names::SHOW, in_flight);
                self.flush();
                if let Some(done) = unplayed {
                    self.complete_step(done);
                }
            }
            return;
        }
        self.enqueue(Action::Show);
    }

    /// Play the exit animation (if any) and hide
    pub fn hide(&mut self, fast: bool, callback: Option<Callback>) {
        if fast {
            self.visible = false;
            self.emit();
            if let Some(cb) = callback {
                cb();
            }
            return;
        }
        self.enqueue(Action::Hide(callback));
    }

    /// Queue a named animation
    ///
    /// `timeout` requests an early exit once it elapses; the animation still
    /// finishes through its exit branch. Unknown names complete immediately.
    pub fn play(&mut self, name: &str, timeout: Option<Duration>, callback: Option<Callback>) {
        self.enqueue(Action::Play {
            name: name.to_string(),
            timeout,
            callback,
        });
    }

    /// Queue a random animation that is not an idle, "Show" or "Hide"
    pub fn animate(&mut self) {
        let candidates: Vec<&str> = self
            .config
            .animation_names()
            .filter(|name| {
                !name.starts_with(names::IDLE_PREFIX) && *name != names::SHOW && *name != names::HIDE
            })
            .collect();
        if candidates.is_empty() {
            return;
        }
        let name = candidates[self.random.index(candidates.len())].to_string();
        self.play(&name, None, None);
    }

    /// Queue speech
    ///
    /// Without `hold` the step ends as soon as the balloon opens and the
    /// balloon closes itself later; with `hold` the queue waits for
    /// [`Agent::close_balloon`].
    pub fn speak(&mut self, text: &str, hold: bool) {
        self.enqueue(Action::Speak {
            text: text.to_string(),
            hold,
        });
    }

    pub fn close_balloon(&mut self) {
        let held = self.balloon.close();
        self.emit();
        if let Some(done) = held {
            self.complete_step(done);
        }
    }

    /// Queue an eased move of the top-left corner to `(x, y)`
    pub fn move_to(&mut self, x: f64, y: f64, duration: Duration) {
        self.enqueue(Action::Move { x, y, duration });
    }

    /// Point or look toward `(x, y)` if the character can
    pub fn gesture_at(&mut self, x: f64, y: f64) {
        let dir = direction(self.center(), (x, y));
        let gesture = format!("{}{}", names::GESTURE_PREFIX, dir);
        let look = format!("{}{}", names::LOOK_PREFIX, dir);

        if self.animator.has_animation(&gesture) {
            self.play(&gesture, None, None);
        } else if self.animator.has_animation(&look) {
            self.play(&look, None, None);
        } else {
            trace!("agent: no gesture or look animation toward {}", dir);
        }
    }

    /// Drop everything: pending steps, the step in flight, speech, timers
    ///
    /// Abandoned steps never run their callbacks.
    pub fn stop(&mut self) {
        debug!("agent: stop ({} pending dropped)", self.queue.len());
        self.queue.clear();
        self.timers.clear();
        self.movement = None;
        self.animator.stop();
        self.current_animation = None;
        // Held speech is abandoned with its step
        let _ = self.balloon.close();
        self.emit();
    }

    /// Ask the current animation to exit early; the queue is untouched
    pub fn stop_current(&mut self) {
        self.animator.exit();
    }

    /// Queue a pause
    pub fn delay(&mut self, duration: Duration) {
        self.enqueue(Action::Delay(duration));
    }

    /// Animation names in config order
    pub fn animations(&self) -> Vec<String> {
        self.animator.animations()
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.animator.has_animation(name)
    }

    pub fn pause(&mut self) {
        self.animator.pause();
    }

    pub fn resume(&mut self) {
        self.animator.resume(self.now);
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.emit();
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// Frame size `(width, height)`
    pub fn size(&self) -> (u32, u32) {
        let [w, h] = self.config.framesize();
        (w, h)
    }

    // ---- pointer drag ----

    pub fn start_drag(&mut self, pointer_x: f64, pointer_y: f64) {
        self.dragging = true;
        self.drag_offset = (pointer_x - self.x, pointer_y - self.y);
        self.animator.pause();
        self.emit();
    }

    pub fn update_drag(&mut self, pointer_x: f64, pointer_y: f64) {
        if !self.dragging {
            return;
        }
        self.x = pointer_x - self.drag_offset.0;
        self.y = pointer_y - self.drag_offset.1;
        let anchor = self.anchor();
        self.balloon.reposition(&anchor);
        self.emit();
    }

    pub fn end_drag(&mut self) {
        if !self.dragging {
            return;
        }
        self.dragging = false;
        self.animator.resume(self.now);
        self.emit();
    }

    // ---- sounds & lifecycle ----

    /// Register sound clips; clips that fail to load are skipped
    ///
    /// Returns how many were loaded.
    pub fn load_sounds<I>(&mut self, sounds: I) -> usize
    where
        I: IntoIterator<Item = (String, Vec<u8>)>,
    {
        let mut loaded = 0;
        for (id, data) in sounds {
            match self.sound.load(&id, data) {
                Ok(()) => loaded += 1,
                Err(e) => debug!("agent: skipping sound '{}': {}", id, e),
            }
        }
        loaded
    }

    /// Stop everything and release sounds
    pub fn destroy(&mut self) {
        self.stop();
        self.sound.clear();
    }

    // ---- clock ----

    /// Earliest pending deadline, if any
    pub fn next_deadline(&self) -> Option<Duration> {
        [
            self.animator.next_deadline(),
            self.balloon.next_deadline(),
            self.timers.next_due(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Move the clock forward by `elapsed`
    pub fn advance(&mut self, elapsed: Duration) {
        let target = self.now + elapsed;

        while let Some(due) = self.next_deadline().filter(|&due| due <= target) {
            self.now = self.now.max(due);
            self.dispatch_due();
        }

        self.now = target;
        self.sample_movement();
    }

    fn dispatch_due(&mut self) {
        let now = self.now;

        if self.animator.next_deadline().is_some_and(|due| due <= now) {
            self.animator.on_timer(now, self.random.as_mut());
            self.flush();
        } else if self.balloon.next_deadline().is_some_and(|due| due <= now) {
            match self.balloon.on_timer(now) {
                BalloonTick::Idle => {}
                BalloonTick::Revealed => self.emit(),
                BalloonTick::Closed(held) => {
                    self.emit();
                    if let Some(done) = held {
                        self.complete_step(done);
                    }
                }
            }
        } else if let Some((_, _, timer)) = self.timers.pop_due(now) {
            match timer {
                AgentTimer::Delay(done) => self.complete_step(done),
                AgentTimer::ForceExit => {
                    trace!("agent: play timeout, exiting '{:?}'", self.current_animation);
                    self.animator.exit();
                }
            }
        }
    }

    fn sample_movement(&mut self) {
        let Some(movement) = self.movement.as_ref() else {
            return;
        };

        let t = if movement.duration.is_zero() {
            1.0
        } else {
            let elapsed = self.now.saturating_sub(movement.started);
            (elapsed.as_secs_f64() / movement.duration.as_secs_f64()).min(1.0)
        };
        let ease = ease_in_out(t);
        let (from, to) = (movement.from, movement.to);

        self.x = from.0 + (to.0 - from.0) * ease;
        self.y = from.1 + (to.1 - from.1) * ease;
        self.emit();

        if t >= 1.0 {
            if let Some(movement) = self.movement.take() {
                self.animator.exit();
                self.complete_step(movement.done);
            }
        }
    }

    // ---- queue plumbing ----

    fn enqueue(&mut self, action: Action) {
        match self.queue.enqueue(action) {
            Enqueued::Started(action, ticket) => self.start(action, ticket),
            Enqueued::Queued => {}
        }
    }

    /// Run `action`, then every step that completes synchronously after it
    ///
    /// Deferred callbacks run once the queue has moved past their step,
    /// latest step first.
    fn start(&mut self, action: Action, ticket: Ticket) {
        let mut next = Some((action, ticket));
        let mut callbacks = Vec::new();
        while let Some((action, ticket)) = next.take() {
            let finished = self.run(action, ticket);
            self.flush();
            if let Some(done) = finished {
                let (following, callback) = self.finish_step(done);
                next = following;
                callbacks.extend(callback);
            }
        }
        for cb in callbacks.into_iter().rev() {
            cb();
        }
    }

    fn complete_step(&mut self, done: StepDone) {
        let (next, callback) = self.finish_step(done);
        if let Some((action, ticket)) = next {
            self.start(action, ticket);
        }
        if let Some(cb) = callback {
            cb();
        }
    }

    /// Close out a step and pull the next action off the queue
    ///
    /// A deferred `then` callback is handed back for the caller to run after
    /// the next action has started.
    fn finish_step(&mut self, done: StepDone) -> (Option<(Action, Ticket)>, Option<Callback>) {
        let StepDone {
            ticket,
            timeout,
            callback,
            then,
            hides,
        } = done;

        if let Some(id) = timeout {
            self.timers.cancel(id);
        }
        if hides {
            self.visible = false;
            self.emit();
        }
        if let Some(cb) = callback {
            cb();
        }

        let next = match self.queue.complete(ticket) {
            Advance::Next(action, ticket) => Some((action, ticket)),
            Advance::Drained => self.idle_action(),
            Advance::Stale => None,
        };
        (next, then)
    }

    /// Strip an abandoned step down to its queue slot
    fn take_over(&mut self, done: StepDone) -> StepDone {
        if let Some(id) = done.timeout {
            self.timers.cancel(id);
        }
        if done.callback.is_some() || done.then.is_some() {
            trace!("agent: dropping callback of abandoned step");
        }
        StepDone::new(done.ticket)
    }

    fn idle_action(&mut self) -> Option<(Action, Ticket)> {
        let idles: Vec<&str> = self
            .config
            .animation_names()
            .filter(|name| name.starts_with(names::IDLE_PREFIX))
            .collect();
        if idles.is_empty() {
            return None;
        }
        let name = idles[self.random.index(idles.len())].to_string();
        trace!("agent: idling with '{}'", name);

        match self.queue.enqueue(Action::Idle(name)) {
            Enqueued::Started(action, ticket) => Some((action, ticket)),
            Enqueued::Queued => None,
        }
    }

    /// Start a step; returns its completion when it finished synchronously
    fn run(&mut self, action: Action, ticket: Ticket) -> Option<StepDone> {
        match action {
            Action::Show => self.play_step(names::SHOW, Some(StepDone::new(ticket))),
            Action::Hide(callback) => {
                let done = StepDone {
                    then: callback,
                    hides: true,
                    ..StepDone::new(ticket)
                };
                self.play_step(names::HIDE, Some(done))
            }
            Action::Play {
                name,
                timeout,
                callback,
            } => {
                // A zero timeout means none
                let timeout = timeout
                    .filter(|t| !t.is_zero())
                    .map(|t| self.timers.schedule_at(self.now + t, AgentTimer::ForceExit));
                let done = StepDone {
                    timeout,
                    callback,
                    ..StepDone::new(ticket)
                };
                self.play_step(&name, Some(done))
            }
            Action::Idle(name) => self.play_step(&name, Some(StepDone::new(ticket))),
            Action::Speak { text, hold } => {
                let anchor = self.anchor();
                let (held, immediate) = if hold {
                    (Some(StepDone::new(ticket)), None)
                } else {
                    (None, Some(StepDone::new(ticket)))
                };
                if self.balloon.speak(self.now, &text, hold, &anchor, held).is_some() {
                    trace!("agent: dropped stale held speech");
                }
                self.emit();
                immediate
            }
            Action::Move { x, y, duration } => {
                let dir = direction(self.center(), (x, y));
                let name = format!("{}{}", names::MOVE_PREFIX, dir);
                if self.animator.has_animation(&name) {
                    self.play_step(&name, None);
                }
                debug!("agent: moving to ({}, {}) over {:?}", x, y, duration);
                self.movement = Some(Movement {
                    from: (self.x, self.y),
                    to: (x, y),
                    started: self.now,
                    duration,
                    done: StepDone::new(ticket),
                });
                None
            }
            Action::Delay(duration) => {
                self.timers
                    .schedule_at(self.now + duration, AgentTimer::Delay(StepDone::new(ticket)));
                None
            }
        }
    }

    /// Start an animation; hands the completion back if it cannot play
    fn play_step(&mut self, name: &str, done: Option<StepDone>) -> Option<StepDone> {
        match self.animator.play(self.now, name, done) {
            Ok(()) => None,
            Err(unplayable) => {
                debug!("agent: cannot play '{}', completing step", unplayable.name);
                unplayable.on_complete
            }
        }
    }

    // ---- output ----

    /// Apply animator output
    fn flush(&mut self) {
        loop {
            let events = self.animator.take_events();
            if events.is_empty() {
                break;
            }
            for event in events {
                match event {
                    AnimatorEvent::Frame {
                        animation,
                        overlays,
                        ..
                    } => {
                        self.current_animation = Some(animation);
                        self.overlays = overlays;
                        self.emit();
                    }
                    AnimatorEvent::Sound(id) => self.play_sound(&id),
                    AnimatorEvent::Finished {
                        overlays,
                        on_complete,
                        ..
                    } => {
                        self.current_animation = None;
                        self.overlays = overlays;
                        self.emit();
                        if let Some(done) = on_complete {
                            self.complete_step(done);
                        }
                    }
                }
            }
        }
    }

    fn play_sound(&mut self, id: &str) {
        if let Err(e) = self.sound.play(id) {
            debug!("agent: sound '{}' not played: {}", id, e);
        }
    }

    fn emit(&mut self) {
        if self.observer.is_none() {
            return;
        }
        let state = self.state();
        if let Some(observer) = self.observer.as_mut() {
            observer(&state);
        }
    }

    fn center(&self) -> (f64, f64) {
        let [w, h] = self.config.framesize();
        (self.x + f64::from(w) / 2.0, self.y + f64::from(h) / 2.0)
    }

    fn anchor(&self) -> Anchor {
        let [w, h] = self.config.framesize();
        Anchor {
            x: self.x,
            y: self.y,
            width: f64::from(w),
            height: f64::from(h),
            viewport: self.viewport,
        }
    }
}
