//! The authoritative entity store and the single entry point for
//! state-changing actions. Every request, human or AI, goes through
//! [`WorldAuthority::submit`], which validates against the shared rules,
//! mutates the canonical record on accept and hands back the result to
//! broadcast. Rejections return `None` and leave no trace beyond a debug
//! log.

use std::collections::HashMap;

use log::{debug, info};
use shared::{
    advance, clip_for, validate, ActionRequest, ActionResult, ActionTuning, AnimationSink,
    EntityState, ValidationContext, Vec2, Vec3,
};

use crate::probe::ClearanceProbe;

pub struct WorldAuthority {
    pub tick: u32,
    entities: HashMap<u32, EntityState>,
    tuning: ActionTuning,
    animation: Box<dyn AnimationSink>,
    clearance: Box<dyn ClearanceProbe>,
    reported_speeds: HashMap<u32, f32>,
}

impl WorldAuthority {
    pub fn new(
        tuning: ActionTuning,
        animation: Box<dyn AnimationSink>,
        clearance: Box<dyn ClearanceProbe>,
    ) -> Self {
        Self {
            tick: 0,
            entities: HashMap::new(),
            tuning,
            animation,
            clearance,
            reported_speeds: HashMap::new(),
        }
    }

    pub fn tuning(&self) -> &ActionTuning {
        &self.tuning
    }

    pub fn spawn(&mut self, actor_id: u32, position: Vec3) {
        let state = EntityState::new(actor_id, position);
        info!(
            "Spawned actor {} at ({:.1}, {:.1}, {:.1})",
            actor_id, position.x, position.y, position.z
        );
        self.entities.insert(actor_id, state);
    }

    pub fn despawn(&mut self, actor_id: &u32) {
        if self.entities.remove(actor_id).is_some() {
            self.reported_speeds.remove(actor_id);
            info!("Despawned actor {}", actor_id);
        }
    }

    pub fn entity(&self, actor_id: &u32) -> Option<&EntityState> {
        self.entities.get(actor_id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityState> {
        self.entities.values()
    }

    pub fn snapshot(&self) -> Vec<EntityState> {
        self.entities.values().cloned().collect()
    }

    pub fn positions(&self) -> HashMap<u32, Vec3> {
        self.entities
            .iter()
            .map(|(id, state)| (*id, state.position))
            .collect()
    }

    /// Movement intent is continuous state, applied directly without
    /// validation.
    pub fn set_input(&mut self, actor_id: u32, input: Vec2) {
        if let Some(state) = self.entities.get_mut(&actor_id) {
            state.input = input;
        }
    }

    /// Position writeback from the navigation collaborator.
    pub fn set_position(&mut self, actor_id: u32, position: Vec3) {
        if let Some(state) = self.entities.get_mut(&actor_id) {
            state.position = position;
        }
    }

    pub fn set_yaw(&mut self, actor_id: u32, yaw: f32) {
        if let Some(state) = self.entities.get_mut(&actor_id) {
            state.rotation.y = yaw;
        }
    }

    pub fn set_dead(&mut self, actor_id: u32) {
        if let Some(state) = self.entities.get_mut(&actor_id) {
            state.is_dead = true;
            state.is_sprinting = false;
            state.input = Vec2::default();
        }
    }

    /// Validates and applies one request. Exactly one authoritative
    /// application can happen per request because all submits for a tick run
    /// sequentially while this struct is held mutably.
    pub fn submit(&mut self, request: &ActionRequest) -> Option<ActionResult> {
        let state = self.entities.get(&request.actor_id)?;
        let ctx = ValidationContext {
            tuning: &self.tuning,
            crouch_blocked: self.clearance.headroom_blocked(state),
        };

        let Some(next) = validate(state, request.kind, request.consume_stamina, &ctx) else {
            debug!(
                "Rejected {:?} (seq {}) for actor {}",
                request.kind, request.sequence, request.actor_id
            );
            return None;
        };

        if let Some(clip) = clip_for(request.kind, &next) {
            self.animation.play_clip(request.actor_id, clip);
        }
        self.entities.insert(request.actor_id, next.clone());

        Some(ActionResult {
            actor_id: request.actor_id,
            kind: request.kind,
            accepted: true,
            sequence: request.sequence,
            state: next,
        })
    }

    /// One authoritative simulation step: timers, stamina, derived
    /// locomotion speed, with speed changes reported to the animation layer.
    pub fn tick(&mut self, dt: f32) {
        for state in self.entities.values_mut() {
            advance(state, dt, &self.tuning);

            let reported = self.reported_speeds.entry(state.id).or_insert(0.0);
            if (state.speed - *reported).abs() > 1e-3 {
                *reported = state.speed;
                self.animation.set_locomotion_speed(state.id, state.speed);
            }
        }
        self.tick = self.tick.wrapping_add(1);
    }
}
