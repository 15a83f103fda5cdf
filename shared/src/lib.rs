//! Types and logic shared by the authority and every observer.
//!
//! The crate holds the wire protocol, the replicated [`EntityState`] record
//! and the pure action validator. Authority, observer prediction and the AI
//! layer all call the exact same validation code with the same tuning
//! constants, which is what makes optimistic prediction line up with
//! authoritative results.

pub mod anim;
pub mod state;
pub mod validator;
pub mod wire;

pub use anim::{clip_for, AnimationSink, LogAnimationSink, NullAnimationSink};
pub use state::{EntityState, Vec2, Vec3};
pub use validator::{advance, validate, ActionTuning, ValidationContext};
pub use wire::{ActionKind, ActionRequest, ActionResult, Packet};

pub const PROTOCOL_VERSION: u32 = 1;

pub const MAX_STAMINA: f32 = 100.0;
pub const STAMINA_RECOVERY_RATE: f32 = 20.0;
pub const SPRINT_DRAIN_RATE: f32 = 15.0;
pub const JUMP_STAMINA_COST: f32 = 30.0;
pub const ROLL_STAMINA_COST: f32 = 25.0;
pub const JUMP_DURATION: f32 = 0.3;
pub const ROLL_DURATION: f32 = 0.75;

pub const ATTACK_RANGE: f32 = 1.0;
pub const SIGHT_RANGE: f32 = 12.0;
pub const SCAN_FREQUENCY: f32 = 1.0;
pub const ANGULAR_SPEED: f32 = 300.0;
