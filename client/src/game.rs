//! Observer-side world model.
//!
//! The observer keeps two views: the confirmed view, written only by
//! authoritative packets, and a predicted copy of its own entity that it
//! updates optimistically when an action request goes out. Authoritative
//! data always wins: results and snapshots overwrite without comparing,
//! so applying the same result twice is the same as applying it once.

use log::debug;
use shared::{
    clip_for, validate, ActionKind, ActionResult, ActionTuning, AnimationSink, EntityState,
    ValidationContext, Vec2,
};
use std::collections::HashMap;

pub struct ObserverWorld {
    pub confirmed: HashMap<u32, EntityState>,
    pub predicted: Option<EntityState>,
    pub client_id: Option<u32>,
    pub last_tick: u32,
    pub last_timestamp: u64,
    tuning: ActionTuning,
    animation: Box<dyn AnimationSink>,
}

impl ObserverWorld {
    pub fn new(animation: Box<dyn AnimationSink>) -> Self {
        Self {
            confirmed: HashMap::new(),
            predicted: None,
            client_id: None,
            last_tick: 0,
            last_timestamp: 0,
            tuning: ActionTuning::default(),
            animation,
        }
    }

    pub fn set_client_id(&mut self, client_id: u32) {
        self.client_id = Some(client_id);
    }

    /// Optimistically applies an action to the local predicted copy. The
    /// same validator the authority runs decides whether the prediction
    /// fires at all; a locally-invalid action predicts nothing.
    pub fn predict(&mut self, kind: ActionKind, consume_stamina: bool) {
        let Some(client_id) = self.client_id else {
            return;
        };
        let base = self
            .predicted
            .clone()
            .or_else(|| self.confirmed.get(&client_id).cloned());
        let Some(base) = base else {
            return;
        };

        let ctx = ValidationContext {
            tuning: &self.tuning,
            crouch_blocked: false,
        };
        if let Some(next) = validate(&base, kind, consume_stamina, &ctx) {
            if let Some(clip) = clip_for(kind, &next) {
                self.animation.play_clip(client_id, clip);
            }
            self.predicted = Some(next);
        } else {
            debug!("Prediction declined locally: {:?}", kind);
        }
    }

    pub fn set_predicted_input(&mut self, input: Vec2) {
        if let Some(predicted) = self.predicted.as_mut() {
            predicted.input = input;
        }
    }

    /// Applies an authoritative result. No comparison with local state:
    /// the carried state replaces whatever the observer had, for its own
    /// entity as much as anyone else's.
    pub fn apply_action_result(&mut self, result: &ActionResult) {
        if result.accepted {
            if let Some(clip) = clip_for(result.kind, &result.state) {
                self.animation.play_clip(result.actor_id, clip);
            }
        }
        self.confirmed.insert(result.actor_id, result.state.clone());

        if self.client_id == Some(result.actor_id) {
            // Authoritative overwrite of the local prediction, accepted or
            // not. A rejected prediction heals here or on the snapshot.
            self.predicted = Some(result.state.clone());
        }
    }

    /// Replaces the confirmed view wholesale with a snapshot. Entities
    /// absent from the snapshot no longer exist.
    pub fn apply_snapshot(&mut self, tick: u32, timestamp: u64, entities: Vec<EntityState>) {
        self.confirmed.clear();
        for entity in entities {
            self.confirmed.insert(entity.id, entity);
        }
        self.last_tick = tick;
        self.last_timestamp = timestamp;

        if let Some(client_id) = self.client_id {
            match self.confirmed.get(&client_id) {
                Some(own) => self.predicted = Some(own.clone()),
                None => self.predicted = None,
            }
        }
    }

    /// Advances the predicted copy between authoritative packets so timers
    /// and stamina read plausibly while waiting for the next snapshot.
    pub fn step_prediction(&mut self, dt: f32) {
        if let Some(predicted) = self.predicted.as_mut() {
            shared::advance(predicted, dt, &self.tuning);
        }
    }

    /// View used for display: own entity from the predicted copy, everyone
    /// else from the confirmed view.
    pub fn visible_entities(&self) -> Vec<EntityState> {
        let mut entities = Vec::new();
        for (id, entity) in &self.confirmed {
            if self.client_id == Some(*id) {
                continue;
            }
            entities.push(entity.clone());
        }
        if let Some(own) = &self.predicted {
            entities.push(own.clone());
        }
        entities.sort_by_key(|e| e.id);
        entities
    }

    /// One-line readout of the local entity, in the order the status bar
    /// presents it: stamina, then the action and mode flags.
    pub fn hud_line(&self) -> String {
        let Some(state) = self.predicted.as_ref().or_else(|| {
            self.client_id
                .and_then(|id| self.confirmed.get(&id))
        }) else {
            return "no entity".to_string();
        };

        let mut flags = Vec::new();
        if state.is_jumping {
            flags.push("jumping");
        }
        if state.is_rolling {
            flags.push("rolling");
        }
        if state.is_sprinting {
            flags.push("sprinting");
        }
        if state.is_crouching {
            flags.push("crouching");
        }
        if state.is_strafing {
            flags.push("strafing");
        }
        if state.is_dead {
            flags.push("dead");
        }

        format!(
            "stamina {:>5.1}/{:.0} | {}",
            state.current_stamina,
            shared::MAX_STAMINA,
            if flags.is_empty() {
                "idle".to_string()
            } else {
                flags.join(" ")
            }
        )
    }
}
