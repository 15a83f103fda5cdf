//! Fire-and-forget bridge to the animation/visual layer. Triggers are side
//! effects only; nothing here feeds back into the state-consistency
//! contract.

use log::debug;

use crate::state::EntityState;
use crate::wire::ActionKind;

pub trait AnimationSink: Send {
    fn play_clip(&self, actor_id: u32, clip: &str);
    fn set_locomotion_speed(&self, actor_id: u32, speed: f32);
}

/// Logs triggers at debug level; the default sink for headless processes.
pub struct LogAnimationSink;

impl AnimationSink for LogAnimationSink {
    fn play_clip(&self, actor_id: u32, clip: &str) {
        debug!("actor {} -> clip {}", actor_id, clip);
    }

    fn set_locomotion_speed(&self, actor_id: u32, speed: f32) {
        debug!("actor {} -> locomotion speed {:.2}", actor_id, speed);
    }
}

/// Swallows everything; used in tests.
pub struct NullAnimationSink;

impl AnimationSink for NullAnimationSink {
    fn play_clip(&self, _actor_id: u32, _clip: &str) {}
    fn set_locomotion_speed(&self, _actor_id: u32, _speed: f32) {}
}

/// Clip triggered by an accepted action, if any. Jump picks the moving
/// variant when there is movement intent.
pub fn clip_for(kind: ActionKind, state: &EntityState) -> Option<&'static str> {
    match kind {
        ActionKind::Jump => {
            if state.input.magnitude_squared() < 0.1 {
                Some("Jump")
            } else {
                Some("JumpMove")
            }
        }
        ActionKind::Roll => Some("Roll"),
        ActionKind::Attack => Some("Attack"),
        ActionKind::Sprint(_) | ActionKind::Crouch | ActionKind::Strafe => None,
    }
}
