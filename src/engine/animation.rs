//! Frame animator
//!
//! Plays one animation at a time from the agent config. Each step draws the
//! current frame (per-layer sprite offsets plus an optional sound) and arms a
//! deadline for the frame's duration; when the deadline passes the animator
//! decides the next frame:
//!
//! 1. an exit was requested and the frame has an exit branch: take it
//! 2. the frame has weighted branches: draw and resolve
//! 3. otherwise advance by one
//!
//! Running past the last frame finishes the animation. Output is collected
//! as [`AnimatorEvent`]s that the owner drains with
//! [`Animator::take_events`]. The completion token `C` is opaque to the
//! animator and handed back exactly once, in [`AnimatorEvent::Finished`].

use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};

use super::model::{AgentConfig, Branch, SpriteCoord};
use super::random::RandomSource;
use super::types::MIN_FRAME_DURATION;

/// Resolve a weighted branch set against a draw in `[0, 100]`
///
/// Weights accumulate in order; the first branch whose running total reaches
/// the draw wins. `None` means no branch matched and playback advances
/// linearly.
pub fn resolve_branch(branches: &[Branch], draw: f64) -> Option<usize> {
    let mut total = 0.0;
    for branch in branches {
        total += branch.weight;
        if draw <= total {
            return Some(branch.frame_index);
        }
    }
    None
}

/// Animator playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Output of the animator
#[derive(Debug, Clone, PartialEq)]
pub enum AnimatorEvent<C> {
    /// A frame was drawn
    Frame {
        animation: String,
        index: usize,
        overlays: Vec<Option<SpriteCoord>>,
    },
    /// The drawn frame asks for a sound
    Sound(String),
    /// Playback ran off the end; overlays are back at the neutral pose
    Finished {
        animation: String,
        overlays: Vec<Option<SpriteCoord>>,
        on_complete: Option<C>,
    },
}

/// Returned by [`Animator::play`] for names missing from the config
#[derive(Debug, PartialEq)]
pub struct Unplayable<C> {
    pub name: String,
    pub on_complete: Option<C>,
}

#[derive(Debug)]
struct Playback<C> {
    name: String,
    index: usize,
    exiting: bool,
    due: Option<Duration>,
    on_complete: Option<C>,
}

/// Single-animation frame stepper
#[derive(Debug)]
pub struct Animator<C> {
    config: Arc<AgentConfig>,
    playback: Option<Playback<C>>,
    paused: bool,
    events: Vec<AnimatorEvent<C>>,
}

impl<C> Animator<C> {
    pub fn new(config: Arc<AgentConfig>) -> Self {
        Self {
            config,
            playback: None,
            paused: false,
            events: Vec::new(),
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn animations(&self) -> Vec<String> {
        self.config.animation_names().map(String::from).collect()
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.config.has_animation(name)
    }

    /// Start `name` from its first frame, superseding whatever was playing
    ///
    /// The superseded animation's completion token is dropped, never fired.
    pub fn play(
        &mut self,
        now: Duration,
        name: &str,
        on_complete: Option<C>,
    ) -> Result<(), Unplayable<C>> {
        if !self.config.has_animation(name) {
            debug!("animator: unknown animation '{}'", name);
            return Err(Unplayable {
                name: name.to_string(),
                on_complete,
            });
        }

        self.stop();
        debug!("animator: playing '{}'", name);
        self.playback = Some(Playback {
            name: name.to_string(),
            index: 0,
            exiting: false,
            due: None,
            on_complete,
        });
        self.step(now);
        Ok(())
    }

    /// Abandon the current animation without completing it
    pub fn stop(&mut self) {
        if let Some(pb) = self.playback.take() {
            trace!("animator: stopped '{}' at frame {}", pb.name, pb.index);
        }
        self.paused = false;
    }

    /// Abandon the current animation, handing back its completion token
    pub fn abandon(&mut self) -> Option<C> {
        let pb = self.playback.take()?;
        trace!("animator: abandoned '{}' at frame {}", pb.name, pb.index);
        self.paused = false;
        pb.on_complete
    }

    /// Request an early exit; consulted at the next frame advance
    pub fn exit(&mut self) {
        if let Some(pb) = self.playback.as_mut() {
            pb.exiting = true;
        }
    }

    /// Suspend stepping, keeping the frame position
    pub fn pause(&mut self) {
        self.paused = true;
        if let Some(pb) = self.playback.as_mut() {
            pb.due = None;
        }
    }

    /// Re-arm stepping on the current frame with its full duration
    pub fn resume(&mut self, now: Duration) {
        if !self.paused {
            return;
        }
        self.paused = false;
        let config = Arc::clone(&self.config);
        if let Some(pb) = self.playback.as_mut() {
            if let Some(frame) = config
                .animation(&pb.name)
                .and_then(|anim| anim.frames.get(pb.index))
            {
                pb.due = Some(now + frame_duration(frame.duration));
            }
        }
    }

    pub fn state(&self) -> AnimState {
        match (&self.playback, self.paused) {
            (None, _) => AnimState::Idle,
            (Some(_), true) => AnimState::Paused,
            (Some(_), false) => AnimState::Playing,
        }
    }

    pub fn current_animation(&self) -> Option<&str> {
        self.playback.as_ref().map(|pb| pb.name.as_str())
    }

    pub fn current_frame(&self) -> Option<usize> {
        self.playback.as_ref().map(|pb| pb.index)
    }

    pub fn is_exiting(&self) -> bool {
        self.playback.as_ref().is_some_and(|pb| pb.exiting)
    }

    /// When the current frame ends, if stepping is armed
    pub fn next_deadline(&self) -> Option<Duration> {
        if self.paused {
            return None;
        }
        self.playback.as_ref().and_then(|pb| pb.due)
    }

    /// Handle the frame deadline if it has passed
    pub fn on_timer(&mut self, now: Duration, rng: &mut dyn RandomSource) {
        match self.next_deadline() {
            Some(due) if due <= now => {}
            _ => return,
        }

        let config = Arc::clone(&self.config);
        let Some(pb) = self.playback.as_mut() else {
            return;
        };
        pb.due = None;

        let Some(anim) = config.animation(&pb.name) else {
            self.finish();
            return;
        };
        let Some(frame) = anim.frames.get(pb.index) else {
            self.finish();
            return;
        };

        let mut next = None;
        if pb.exiting {
            next = frame.exit_branch;
        }
        if next.is_none() {
            if let Some(branching) = &frame.branching {
                next = resolve_branch(&branching.branches, rng.percent());
            }
        }
        let next = next.unwrap_or(pb.index + 1);

        if next >= anim.frames.len() {
            self.finish();
            return;
        }

        pb.index = next;
        self.step(now);
    }

    /// Drain collected output
    pub fn take_events(&mut self) -> Vec<AnimatorEvent<C>> {
        std::mem::take(&mut self.events)
    }

    fn step(&mut self, now: Duration) {
        if self.paused {
            return;
        }
        let config = Arc::clone(&self.config);
        let Some(pb) = self.playback.as_mut() else {
            return;
        };
        let Some(frame) = config
            .animation(&pb.name)
            .and_then(|anim| anim.frames.get(pb.index))
        else {
            self.finish();
            return;
        };

        trace!("animator: '{}' frame {}", pb.name, pb.index);
        self.events.push(AnimatorEvent::Frame {
            animation: pb.name.clone(),
            index: pb.index,
            overlays: config.layer_offsets(frame),
        });
        if let Some(sound) = &frame.sound {
            self.events.push(AnimatorEvent::Sound(sound.clone()));
        }
        pb.due = Some(now + frame_duration(frame.duration));
    }

    fn finish(&mut self) {
        let Some(pb) = self.playback.take() else {
            return;
        };
        debug!("animator: finished '{}'", pb.name);
        self.events.push(AnimatorEvent::Finished {
            animation: pb.name,
            overlays: self.config.neutral_offsets(),
            on_complete: pb.on_complete,
        });
    }
}

fn frame_duration(ms: u32) -> Duration {
    Duration::from_millis(u64::from(ms)).max(MIN_FRAME_DURATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::model::{Animation, Frame};
    use crate::engine::random::SequenceRandom;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn linear(n: usize) -> Animation {
        Animation::new(
            (0..n)
                .map(|i| Frame::new(100).with_images(vec![SpriteCoord(i as u32 * 10, 0)]))
                .collect(),
        )
    }

    fn config(anims: Vec<(&str, Animation)>) -> Arc<AgentConfig> {
        Arc::new(
            AgentConfig::new(
                2,
                [100, 100],
                Vec::new(),
                anims.into_iter().map(|(n, a)| (n.to_string(), a)).collect(),
            )
            .unwrap(),
        )
    }

    /// Run the animator until it goes idle, returning visited frames
    fn run_to_end(
        animator: &mut Animator<u32>,
        rng: &mut dyn RandomSource,
    ) -> (Vec<usize>, Vec<Option<u32>>) {
        let mut frames = Vec::new();
        let mut done = Vec::new();
        for _ in 0..1000 {
            for event in animator.take_events() {
                match event {
                    AnimatorEvent::Frame { index, .. } => frames.push(index),
                    AnimatorEvent::Finished { on_complete, .. } => done.push(on_complete),
                    AnimatorEvent::Sound(_) => {}
                }
            }
            match animator.next_deadline() {
                Some(due) => animator.on_timer(due, rng),
                None => break,
            }
        }
        (frames, done)
    }

    #[test]
    fn test_resolve_branch() {
        let branches = [Branch::new(2, 30.0), Branch::new(5, 70.0)];
        assert_eq!(resolve_branch(&branches, 25.0), Some(2));
        assert_eq!(resolve_branch(&branches, 30.0), Some(2));
        assert_eq!(resolve_branch(&branches, 50.0), Some(5));
        assert_eq!(resolve_branch(&branches, 100.0), Some(5));
    }

    #[test]
    fn test_resolve_branch_no_match() {
        let branches = [Branch::new(1, 10.0), Branch::new(3, 20.0)];
        assert_eq!(resolve_branch(&branches, 45.0), None);
        assert_eq!(resolve_branch(&[], 0.5), None);
    }

    #[test]
    fn test_play_unknown_returns_token() {
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", linear(2))]));
        let err = animator.play(ms(0), "Nope", Some(7)).unwrap_err();
        assert_eq!(err.name, "Nope");
        assert_eq!(err.on_complete, Some(7));
        assert_eq!(animator.state(), AnimState::Idle);
        assert!(animator.take_events().is_empty());
    }

    #[test]
    fn test_play_draws_first_frame_immediately() {
        let anims = vec![(
            "A",
            Animation::new(vec![Frame::new(100)
                .with_images(vec![SpriteCoord(1, 2)])
                .with_sound("boing")]),
        )];
        let mut animator: Animator<u32> = Animator::new(config(anims));
        animator.play(ms(50), "A", None).unwrap();

        assert_eq!(animator.state(), AnimState::Playing);
        assert_eq!(animator.current_animation(), Some("A"));
        assert_eq!(animator.next_deadline(), Some(ms(150)));
        assert_eq!(
            animator.take_events(),
            vec![
                AnimatorEvent::Frame {
                    animation: "A".to_string(),
                    index: 0,
                    overlays: vec![Some(SpriteCoord(1, 2)), None],
                },
                AnimatorEvent::Sound("boing".to_string()),
            ]
        );
    }

    #[test]
    fn test_linear_playback_completes_once() {
        let mut animator = Animator::new(config(vec![("A", linear(4))]));
        let mut rng = SequenceRandom::new();
        animator.play(ms(0), "A", Some(1)).unwrap();

        let (frames, done) = run_to_end(&mut animator, &mut rng);
        assert_eq!(frames, vec![0, 1, 2, 3]);
        assert_eq!(done, vec![Some(1)]);
        assert_eq!(animator.state(), AnimState::Idle);
        assert_eq!(animator.current_animation(), None);
    }

    #[test]
    fn test_finish_emits_neutral_pose() {
        let mut animator: Animator<u32> =
            Animator::new(config(vec![("First", linear(1)), ("B", linear(3))]));
        let mut rng = SequenceRandom::new();
        animator.play(ms(0), "B", None).unwrap();
        animator.take_events();
        for _ in 0..3 {
            let due = animator.next_deadline().unwrap();
            animator.on_timer(due, &mut rng);
        }
        let events = animator.take_events();
        assert_eq!(
            events.last(),
            Some(&AnimatorEvent::Finished {
                animation: "B".to_string(),
                overlays: vec![Some(SpriteCoord(0, 0)), None],
                on_complete: None,
            })
        );
    }

    #[test]
    fn test_timer_before_deadline_is_ignored() {
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", linear(3))]));
        let mut rng = SequenceRandom::new();
        animator.play(ms(0), "A", None).unwrap();
        animator.on_timer(ms(99), &mut rng);
        assert_eq!(animator.current_frame(), Some(0));
        animator.on_timer(ms(100), &mut rng);
        assert_eq!(animator.current_frame(), Some(1));
        assert_eq!(animator.next_deadline(), Some(ms(200)));
    }

    #[test]
    fn test_weighted_branching() {
        let mut frames: Vec<Frame> = (0..6).map(|_| Frame::new(10)).collect();
        frames[0] = Frame::new(10).with_branches(vec![Branch::new(2, 30.0), Branch::new(5, 70.0)]);
        let anims = vec![("A", Animation::new(frames))];

        let mut animator: Animator<u32> = Animator::new(config(anims.clone()));
        let mut rng = SequenceRandom::new().with_percents([25.0]);
        animator.play(ms(0), "A", None).unwrap();
        animator.on_timer(ms(10), &mut rng);
        assert_eq!(animator.current_frame(), Some(2));

        let mut animator: Animator<u32> = Animator::new(config(anims));
        let mut rng = SequenceRandom::new().with_percents([50.0]);
        animator.play(ms(0), "A", None).unwrap();
        animator.on_timer(ms(10), &mut rng);
        assert_eq!(animator.current_frame(), Some(5));
    }

    #[test]
    fn test_unmatched_branch_advances_linearly() {
        let frames = vec![
            Frame::new(10).with_branches(vec![Branch::new(2, 10.0)]),
            Frame::new(10),
            Frame::new(10),
        ];
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", Animation::new(frames))]));
        let mut rng = SequenceRandom::new().with_percents([90.0]);
        animator.play(ms(0), "A", None).unwrap();
        animator.on_timer(ms(10), &mut rng);
        assert_eq!(animator.current_frame(), Some(1));
    }

    #[test]
    fn test_exit_branch_overrides_weighted_branches() {
        let mut frames: Vec<Frame> = (0..6).map(|_| Frame::new(10)).collect();
        frames[1] = Frame::new(10)
            .with_exit_branch(4)
            .with_branches(vec![Branch::new(0, 100.0)]);
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", Animation::new(frames))]));
        let mut rng = SequenceRandom::new().with_percents([1.0, 1.0]);

        animator.play(ms(0), "A", None).unwrap();
        animator.on_timer(ms(10), &mut rng);
        assert_eq!(animator.current_frame(), Some(1));

        animator.exit();
        assert!(animator.is_exiting());
        animator.on_timer(ms(20), &mut rng);
        assert_eq!(animator.current_frame(), Some(4));
    }

    #[test]
    fn test_exit_without_exit_branch_uses_normal_rules() {
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", linear(3))]));
        let mut rng = SequenceRandom::new();
        animator.play(ms(0), "A", None).unwrap();
        animator.exit();
        animator.on_timer(ms(100), &mut rng);
        assert_eq!(animator.current_frame(), Some(1));
    }

    #[test]
    fn test_exit_branch_past_end_finishes() {
        let frames = vec![Frame::new(10).with_exit_branch(9), Frame::new(10)];
        let mut animator = Animator::new(config(vec![("A", Animation::new(frames))]));
        let mut rng = SequenceRandom::new();
        animator.play(ms(0), "A", Some(3)).unwrap();
        animator.exit();
        animator.on_timer(ms(10), &mut rng);
        assert_eq!(animator.state(), AnimState::Idle);
        assert!(animator
            .take_events()
            .iter()
            .any(|e| matches!(e, AnimatorEvent::Finished { on_complete: Some(3), .. })));
    }

    #[test]
    fn test_play_supersedes_without_completing() {
        let mut animator = Animator::new(config(vec![("A", linear(3)), ("B", linear(1))]));
        let mut rng = SequenceRandom::new();
        animator.play(ms(0), "A", Some(1)).unwrap();
        animator.exit();
        animator.play(ms(5), "B", Some(2)).unwrap();
        assert!(!animator.is_exiting());
        assert_eq!(animator.current_frame(), Some(0));

        let (_, done) = run_to_end(&mut animator, &mut rng);
        assert_eq!(done, vec![Some(2)]);
    }

    #[test]
    fn test_stop_abandons() {
        let mut animator = Animator::new(config(vec![("A", linear(3))]));
        animator.play(ms(0), "A", Some(1)).unwrap();
        animator.take_events();
        animator.pause();
        animator.stop();

        assert_eq!(animator.state(), AnimState::Idle);
        assert_eq!(animator.next_deadline(), None);
        assert!(animator.take_events().is_empty());
    }

    #[test]
    fn test_abandon_hands_back_token() {
        let mut animator = Animator::new(config(vec![("A", linear(3))]));
        animator.play(ms(0), "A", Some(7)).unwrap();
        animator.take_events();

        assert_eq!(animator.abandon(), Some(7));
        assert_eq!(animator.state(), AnimState::Idle);
        assert_eq!(animator.abandon(), None);
        assert!(animator.take_events().is_empty());
    }

    #[test]
    fn test_pause_resume_restarts_frame_duration() {
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", linear(3))]));
        let mut rng = SequenceRandom::new();
        animator.play(ms(0), "A", None).unwrap();
        animator.take_events();

        animator.pause();
        assert_eq!(animator.state(), AnimState::Paused);
        assert_eq!(animator.next_deadline(), None);
        animator.on_timer(ms(500), &mut rng);
        assert_eq!(animator.current_frame(), Some(0));

        animator.resume(ms(530));
        assert_eq!(animator.state(), AnimState::Playing);
        assert_eq!(animator.current_frame(), Some(0));
        assert_eq!(animator.next_deadline(), Some(ms(630)));
        assert!(animator.take_events().is_empty());
    }

    #[test]
    fn test_resume_without_pause_is_noop() {
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", linear(3))]));
        animator.play(ms(0), "A", None).unwrap();
        animator.resume(ms(40));
        assert_eq!(animator.next_deadline(), Some(ms(100)));
    }

    #[test]
    fn test_zero_duration_frames_still_advance_time() {
        let anims = vec![("A", Animation::new(vec![Frame::new(0), Frame::new(0)]))];
        let mut animator: Animator<u32> = Animator::new(config(anims));
        animator.play(ms(10), "A", None).unwrap();
        assert_eq!(animator.next_deadline(), Some(ms(11)));
    }

    #[test]
    fn test_branch_distribution_converges() {
        use crate::engine::random::StdRandom;

        let mut frames: Vec<Frame> = (0..6).map(|_| Frame::new(10)).collect();
        frames[0] = Frame::new(10).with_branches(vec![Branch::new(2, 30.0), Branch::new(5, 70.0)]);
        let mut animator: Animator<u32> = Animator::new(config(vec![("A", Animation::new(frames))]));
        let mut rng = StdRandom::seeded(1234);

        let trials = 10_000;
        let mut hits = 0;
        for _ in 0..trials {
            animator.play(ms(0), "A", None).unwrap();
            animator.on_timer(ms(10), &mut rng);
            if animator.current_frame() == Some(2) {
                hits += 1;
            }
        }
        let share = hits as f64 / trials as f64;
        assert!((share - 0.3).abs() < 0.03, "share was {}", share);
    }
}
