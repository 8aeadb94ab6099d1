//! Agent engine
//!
//! This module sequences everything a desktop character does: frame
//! animation with weighted branching, speech balloons, movement and the
//! action queue that keeps them from overlapping.
//!
//! # Architecture
//!
//! The engine consists of:
//! - Immutable agent config (animations, frames, overlay layers)
//! - Frame animator with exit and weighted branching
//! - Word-by-word speech balloon
//! - Single-consumer action queue
//! - The [`Agent`] orchestrator that ties them together
//!
//! # Threading
//!
//! Everything is single-threaded and driven by a virtual clock through
//! [`Agent::advance`]. Components never touch each other's state; they
//! report output to their owner, which applies it.

pub mod agent;
pub mod animation;
pub mod balloon;
pub mod model;
pub mod queue;
pub mod random;
pub mod state;
pub mod timer;
pub mod types;

pub use agent::{direction, ease_in_out, Agent, AgentOptions, Callback, Direction, StateObserver};
pub use animation::{resolve_branch, AnimState, Animator, AnimatorEvent, Unplayable};
pub use balloon::{Anchor, Balloon, BalloonSide, BalloonState, BalloonTick};
pub use model::{AgentConfig, Animation, Branch, Branching, Frame, ModelError, SpriteCoord};
pub use queue::{ActionQueue, Advance, Enqueued, Ticket};
pub use random::{RandomSource, SequenceRandom, StdRandom};
pub use state::{AgentState, Viewport};
pub use timer::{TimerId, TimerQueue};
