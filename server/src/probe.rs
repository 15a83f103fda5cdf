//! Crouch-clearance boundary. The physics engine that would run the actual
//! vertical capsule cast lives outside this core; only its boolean result is
//! consumed here.

use shared::EntityState;

pub trait ClearanceProbe: Send {
    /// True when something above the actor's base blocks standing up.
    fn headroom_blocked(&self, state: &EntityState) -> bool;
}

/// Default probe for worlds without ceiling geometry: never obstructed.
pub struct OpenHeadroom;

impl ClearanceProbe for OpenHeadroom {
    fn headroom_blocked(&self, _state: &EntityState) -> bool {
        false
    }
}

/// Fixed-answer probe for tests and scripted scenes.
pub struct FixedHeadroom(pub bool);

impl ClearanceProbe for FixedHeadroom {
    fn headroom_blocked(&self, _state: &EntityState) -> bool {
        self.0
    }
}
