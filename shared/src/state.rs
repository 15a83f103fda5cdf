use serde::{Deserialize, Serialize};

use crate::{MAX_STAMINA, STAMINA_RECOVERY_RATE};

/// Movement intent in the character's local plane.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn magnitude_squared(&self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// World-space position / Euler rotation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared distance in the ground plane (y discarded). Range checks
    /// compare against a squared threshold so the hot path never takes a
    /// square root.
    pub fn flat_distance_squared(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dz = other.z - self.z;
        dx * dx + dz * dz
    }

    pub fn flat_distance(&self, other: &Vec3) -> f32 {
        self.flat_distance_squared(other).sqrt()
    }
}

/// The authoritative per-character record. The authority owns the canonical
/// copy; observers hold replicas that are only written from broadcasts or
/// their own optimistic prediction.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EntityState {
    pub id: u32,

    pub is_dead: bool,
    pub is_grounded: bool,
    pub is_crouching: bool,
    pub is_sprinting: bool,
    pub is_strafing: bool,
    pub is_jumping: bool,
    pub is_rolling: bool,

    /// True while an exclusive, non-interruptible action is playing.
    pub actions: bool,
    /// Exclusive scripted action outside the normal locomotion set.
    pub custom_action: bool,
    /// The one exclusive action a roll is allowed to cancel.
    pub quick_stop: bool,

    pub current_stamina: f32,
    pub stamina_recovery_delay: f32,

    /// Countdowns that clear the corresponding one-shot flags.
    pub jump_timer: f32,
    pub roll_timer: f32,

    pub input: Vec2,
    /// Current planar locomotion speed, fed by the movement layer.
    pub speed: f32,
    /// Lateral input component while strafing, in [-1, 1].
    pub direction: f32,

    pub position: Vec3,
    pub rotation: Vec3,
}

impl EntityState {
    pub fn new(id: u32, position: Vec3) -> Self {
        Self {
            id,
            is_dead: false,
            is_grounded: true,
            is_crouching: false,
            is_sprinting: false,
            is_strafing: false,
            is_jumping: false,
            is_rolling: false,
            actions: false,
            custom_action: false,
            quick_stop: false,
            current_stamina: MAX_STAMINA,
            stamina_recovery_delay: 0.0,
            jump_timer: 0.0,
            roll_timer: 0.0,
            input: Vec2::default(),
            speed: 0.0,
            direction: 0.0,
            position,
            rotation: Vec3::default(),
        }
    }

    /// True while some exclusive action holds the actor. At most one of
    /// {is_jumping, is_rolling, custom_action} may be set at a time.
    pub fn in_exclusive_action(&self) -> bool {
        self.is_jumping || self.is_rolling || self.custom_action
    }

    pub fn reduce_stamina(&mut self, amount: f32) {
        self.current_stamina = (self.current_stamina - amount).max(0.0);
    }

    /// Stamina regeneration, gated by the recovery delay. Called once per
    /// simulation tick by whoever owns the record.
    pub fn recover_stamina(&mut self, dt: f32) {
        if self.stamina_recovery_delay > 0.0 {
            self.stamina_recovery_delay = (self.stamina_recovery_delay - dt).max(0.0);
            return;
        }
        self.current_stamina = (self.current_stamina + STAMINA_RECOVERY_RATE * dt).min(MAX_STAMINA);
    }
}
